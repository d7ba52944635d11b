use std::{collections::BTreeMap, fs, path::Path, process::Command, time::Duration};

use anyhow::{Context, Result};

use crate::{ext::CommandExt, program, stats::Counters};

/// Interpreter backend, passed through as `--backend=<backend>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
  Rust,
  Python,
}

impl Backend {
  pub fn as_str(self) -> &'static str {
    match self {
      Backend::Rust => "rust",
      Backend::Python => "python",
    }
  }
}

/// How to invoke the interpreter for every program.
#[derive(Clone, Debug)]
pub struct Runner<'a> {
  pub interpreter: &'a Path,
  pub backend: Backend,
  /// Number of runs to average over, at least 1.
  pub retries: u32,
  pub timeout: Option<Duration>,
}

impl Runner<'_> {
  /// Label written to result rows, identifying interpreter and backend.
  pub fn label(&self) -> String {
    let interpreter = self
      .interpreter
      .file_name()
      .unwrap_or(self.interpreter.as_os_str())
      .to_string_lossy();

    format!("{interpreter}-{}", self.backend.as_str())
  }

  /// Runs `program` `retries` times, feeding it its environment file, and
  /// returns the averaged counters.
  pub fn run(&self, program: &Path) -> Result<Counters> {
    let env_path = program::env_path(program);
    let env = fs::read_to_string(&env_path).with_context(|| format!("read {env_path:?}"))?;

    let mut sums = BTreeMap::new();
    for attempt in 0..self.retries {
      let stdout = self
        .run_once(program, &env)
        .with_context(|| format!("run {attempt} of {program:?}"))?;

      for (key, value) in parse_stdout(&stdout) {
        *sums.entry(key).or_insert(0.0) += value;
      }
    }

    Ok(Counters::average(sums, self.retries)?)
  }

  fn run_once(&self, program: &Path, env: &str) -> Result<String> {
    let mut command = Command::new(self.interpreter);
    command
      .arg(format!("--backend={}", self.backend.as_str()))
      .args(["-c", "--quiet", "--time"])
      .arg(program)
      .arg(env);

    command.capture_stdout(self.timeout)
  }
}

/// Parses `key: value` and `key=value` lines. The last line is the program's
/// result and is ignored, as are lines that don't parse.
pub fn parse_stdout(stdout: &str) -> Vec<(String, f64)> {
  let mut lines: Vec<&str> = stdout.trim_end_matches(['\r', '\n']).split('\n').collect();
  lines.pop();

  lines
    .into_iter()
    .map(|line| line.trim_end_matches('\r'))
    .filter(|line| !line.trim().is_empty())
    .filter_map(|line| match parse_line(line) {
      Some(pair) => Some(pair),
      None => {
        log::error!("ERROR parsing: {line}");
        None
      }
    })
    .collect()
}

fn parse_line(line: &str) -> Option<(String, f64)> {
  let (key, value) = line.split_once(':').or_else(|| line.split_once('='))?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }

  Some((key.to_string(), value.trim().parse().ok()?))
}
