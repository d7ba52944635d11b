use std::{
  collections::BTreeSet,
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::Regex;

use crate::{
  plot,
  program::{self, ProgramName},
  results::{self, ResultFiles, Row},
  run::Runner,
};

pub struct Bench<'a> {
  /// Directory holding one subdirectory per benchmark group.
  pub root_dir: PathBuf,
  /// Only programs whose file name matches are run.
  pub grep: Option<Regex>,
  /// Run programs even if their group already has results.
  pub force: bool,
  /// Truncate result files instead of appending to them.
  pub overwrite: bool,
  /// Only run the heaviest program of every group.
  pub heaviest: bool,
  pub runner: Runner<'a>,
}

impl Bench<'_> {
  /// Compiles a file name filter, anchored at the start of the name.
  pub fn grep(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})")).with_context(|| format!("invalid pattern {pattern:?}"))
  }

  /// Benchmarks every group directory, returning how many programs passed
  /// the filters, skipped ones included.
  pub fn bench(&self) -> Result<usize> {
    let mut counter = 0;

    for dir in self.directories().context("directories")? {
      self
        .bench_dir(&dir, &mut counter)
        .with_context(|| format!("bench {dir:?}"))?;
    }

    Ok(counter)
  }

  fn bench_dir(&self, dir: &Path, counter: &mut usize) -> Result<()> {
    log::debug!("benchmarking {dir:?}");

    let existing = program::existing_results(dir).context("existing results")?;

    let mut programs = programs(dir).context("programs")?;
    if let Some(grep) = &self.grep {
      programs.retain(|program| {
        program
          .file_name()
          .is_some_and(|name| grep.is_match(&name.to_string_lossy()))
      });
    }
    if self.heaviest {
      programs = program::heaviest(dir, &programs).context("heaviest")?;
    }

    let mut result_files = ResultFiles::new(dir, self.overwrite);
    for program in &programs {
      self
        .bench_program(program, &existing, &mut result_files, counter)
        .with_context(|| format!("bench {program:?}"))?;
    }

    let written = result_files.finish().context("close results")?;
    plot::generate_and_run(dir, &written).context("plot")?;

    Ok(())
  }

  fn bench_program(
    &self,
    program: &Path,
    existing: &BTreeSet<String>,
    result_files: &mut ResultFiles,
    counter: &mut usize,
  ) -> Result<()> {
    let file_name = program.file_name().context("file name")?.to_string_lossy().into_owned();
    let parsed = ProgramName::parse(&file_name)?;

    let position = *counter;
    *counter += 1;

    if program::should_skip(&parsed, existing, self.force) {
      log::info!("SKIPPED {}", program.display());
      return Ok(());
    }

    log::info!("{position:04}: {}", program.display());

    let counters = self.runner.run(program)?;
    log::debug!("{counters:?}");

    let label = self.runner.label();
    result_files.write_row(
      &parsed.name,
      &Row {
        timestamp: results::timestamp(),
        label: &label,
        file: &file_name,
        counters: &counters,
        n: parsed.n,
        retries: self.runner.retries,
      },
    )
  }

  fn directories(&self) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    for entry in fs::read_dir(&self.root_dir).with_context(|| format!("read dir {:?}", self.root_dir))? {
      let path = entry?.path();
      if path.is_dir() {
        dirs.push(path);
      }
    }

    dirs.sort();
    Ok(dirs)
  }
}

/// Program files directly inside `dir`, sorted by path.
fn programs(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut programs = Vec::new();

  for entry in fs::read_dir(dir).context("read dir")? {
    let path = entry?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == program::PROGRAM_EXTENSION) {
      programs.push(path);
    }
  }

  programs.sort();
  Ok(programs)
}
