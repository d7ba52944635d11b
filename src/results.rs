use std::{
  collections::{btree_map::Entry, BTreeMap},
  fs::{File, OpenOptions},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{program, stats::Counters};

pub const HEADER: [&str; 9] = [
  "#timestamp",
  "label",
  "file",
  "cost",
  "assemble_from_ir",
  "to_sexp_f",
  "run_program",
  "n",
  "retries",
];

/// One line of a result file.
pub struct Row<'a> {
  pub timestamp: String,
  pub label: &'a str,
  pub file: &'a str,
  pub counters: &'a Counters,
  /// Iteration count taken from the program's filename.
  pub n: u64,
  pub retries: u32,
}

impl Row<'_> {
  fn record(&self) -> [String; 9] {
    [
      self.timestamp.clone(),
      self.label.to_string(),
      self.file.to_string(),
      self.counters.cost.to_string(),
      self.counters.assemble_from_ir.to_string(),
      self.counters.to_sexp_f.to_string(),
      self.counters.run_program.to_string(),
      self.n.to_string(),
      self.retries.to_string(),
    ]
  }
}

/// Current local time, as written to the first column.
pub fn timestamp() -> String {
  chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Result files written during the pass over one directory, keyed by group.
///
/// Files are opened on the first row written to them and closed by
/// [`ResultFiles::finish`] (or on drop).
pub struct ResultFiles {
  dir: PathBuf,
  overwrite: bool,
  files: BTreeMap<String, (PathBuf, csv::Writer<File>)>,
}

impl ResultFiles {
  pub fn new(dir: &Path, overwrite: bool) -> Self {
    Self {
      dir: dir.to_path_buf(),
      overwrite,
      files: BTreeMap::new(),
    }
  }

  pub fn write_row(&mut self, group: &str, row: &Row) -> Result<()> {
    let writer = self.writer(group)?;

    writer.write_record(row.record()).context("write row")?;
    writer.flush().context("flush")?;

    Ok(())
  }

  fn writer(&mut self, group: &str) -> Result<&mut csv::Writer<File>> {
    let (_, writer) = match self.files.entry(group.to_string()) {
      Entry::Occupied(entry) => entry.into_mut(),
      Entry::Vacant(entry) => {
        let path = self.dir.join(program::results_file_name(group));
        let writer = open(&path, self.overwrite).with_context(|| format!("open {path:?}"))?;

        entry.insert((path, writer))
      }
    };

    Ok(writer)
  }

  /// Flushes and closes every file, returning `(group, path)` for each in
  /// group order.
  pub fn finish(self) -> Result<Vec<(String, PathBuf)>> {
    self
      .files
      .into_iter()
      .map(|(group, (path, mut writer))| {
        writer.flush().with_context(|| format!("flush {path:?}"))?;

        Ok((group, path))
      })
      .collect()
  }
}

/// Opens a result file for appending, or truncates it when `overwrite` is set,
/// writing the header if the file ends up empty.
fn open(path: &Path, overwrite: bool) -> Result<csv::Writer<File>> {
  let file = if overwrite {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
  } else {
    OpenOptions::new().append(true).create(true).open(path)
  }
  .context("open")?;

  let is_new = file.metadata().context("metadata")?.len() == 0;

  let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
  if is_new {
    writer.write_record(HEADER).context("write header")?;
  }

  Ok(writer)
}

#[cfg(test)]
mod tests {
  use std::{collections::BTreeMap, fs};

  use super::*;

  fn counters(cost: f64) -> Counters {
    Counters {
      cost,
      assemble_from_ir: 0.25,
      to_sexp_f: 0.5,
      run_program: 1.5,
      extra: BTreeMap::new(),
    }
  }

  fn row<'a>(file: &'a str, counters: &'a Counters, n: u64) -> Row<'a> {
    Row {
      timestamp: "2024-01-01 00:00:00".to_string(),
      label: "brun-rust",
      file,
      counters,
      n,
      retries: 1,
    }
  }

  fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
  }

  #[test]
  fn header_is_written_once_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let counters = counters(10.0);

    let mut files = ResultFiles::new(dir.path(), false);
    files.write_row("foo", &row("foo-1-1.clvm", &counters, 1)).unwrap();
    files.write_row("foo", &row("foo-1-2.clvm", &counters, 2)).unwrap();
    let written = files.finish().unwrap();

    let path = dir.path().join("results-foo.csv");
    assert_eq!(written, vec![("foo".to_string(), path.clone())]);

    let lines = lines(&path);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER.join(","));
    assert!(lines[1..].iter().all(|line| !line.starts_with('#')));
  }

  #[test]
  fn rows_have_nine_fields_ending_in_a_number() {
    let dir = tempfile::tempdir().unwrap();
    let counters = counters(20.0);

    let mut files = ResultFiles::new(dir.path(), false);
    files.write_row("foo", &row("foo-100-5.clvm", &counters, 5)).unwrap();
    files.finish().unwrap();

    let lines = lines(&dir.path().join("results-foo.csv"));
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[2], "foo-100-5.clvm");
    assert_eq!(fields[3], "20");
    assert_eq!(fields[7], "5");
    assert!(fields[8].parse::<u32>().is_ok());
  }

  #[test]
  fn appends_to_existing_files_without_new_header() {
    let dir = tempfile::tempdir().unwrap();
    let counters = counters(1.0);

    for _ in 0..2 {
      let mut files = ResultFiles::new(dir.path(), false);
      files.write_row("foo", &row("foo-1-1.clvm", &counters, 1)).unwrap();
      files.finish().unwrap();
    }

    let lines = lines(&dir.path().join("results-foo.csv"));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines.iter().filter(|line| line.starts_with('#')).count(), 1);
  }

  #[test]
  fn overwrite_truncates_once_per_pass() {
    let dir = tempfile::tempdir().unwrap();
    let counters = counters(1.0);

    let mut files = ResultFiles::new(dir.path(), false);
    files.write_row("foo", &row("foo-1-1.clvm", &counters, 1)).unwrap();
    files.write_row("foo", &row("foo-1-1.clvm", &counters, 1)).unwrap();
    files.finish().unwrap();

    let mut files = ResultFiles::new(dir.path(), true);
    files.write_row("foo", &row("foo-1-7.clvm", &counters, 7)).unwrap();
    files.write_row("foo", &row("foo-1-8.clvm", &counters, 8)).unwrap();
    files.finish().unwrap();

    let lines = lines(&dir.path().join("results-foo.csv"));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER.join(","));
    assert!(lines[1].contains("foo-1-7.clvm"));
    assert!(lines[2].contains("foo-1-8.clvm"));
  }
}
