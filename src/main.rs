use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use clvm_bench::{Backend, Bench, Runner};

/// Runs every benchmark program under a root directory and records the
/// interpreter's costs and timings.
#[derive(Parser, Debug)]
struct Args {
  /// Root folder of benchmark files, one subfolder per group.
  #[arg(short, long, default_value = "./test-programs")]
  root_dir: PathBuf,
  /// Regex applied to the start of benchmark file names.
  #[arg(short, long)]
  grep: Option<String>,
  /// Run even if a result file exists.
  #[arg(short, long)]
  force: bool,
  /// Interpreter backend.
  #[arg(short, long, value_enum, default_value_t = Backend::Rust)]
  backend: Backend,
  /// Replace existing result files instead of appending. Implies --force.
  #[arg(long)]
  overwrite: bool,
  /// Number of runs to average per program.
  #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
  retries: u32,
  /// Only run the heaviest program of every group.
  #[arg(long)]
  heaviest: bool,
  /// Interpreter binary.
  #[arg(long, default_value = "brun")]
  interpreter: PathBuf,
  /// Kill runs taking longer than this many seconds.
  #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
  timeout: Option<u64>,
  /// More logging; repeat for more.
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
  /// Only log warnings and errors.
  #[arg(short, long, conflicts_with = "verbose")]
  quiet: bool,
}

impl Args {
  fn log_level(&self) -> &'static str {
    match (self.quiet, self.verbose) {
      (true, _) => "warn",
      (false, 0) => "info",
      (false, 1) => "debug",
      (false, _) => "trace",
    }
  }
}

fn main() -> Result<()> {
  let args = Args::parse();

  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level())).init();

  if !args.root_dir.exists() {
    anyhow::bail!("{:?} does not exist", args.root_dir);
  }

  let bench = Bench {
    root_dir: args.root_dir.clone(),
    grep: args.grep.as_deref().map(Bench::grep).transpose()?,
    force: args.force || args.overwrite,
    overwrite: args.overwrite,
    heaviest: args.heaviest,
    runner: Runner {
      interpreter: &args.interpreter,
      backend: args.backend,
      retries: args.retries,
      timeout: args.timeout.map(Duration::from_secs),
    },
  };

  let programs = bench.bench().context("bench")?;
  log::info!("{programs} programs considered");

  Ok(())
}
