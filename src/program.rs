use std::{
  collections::{BTreeMap, BTreeSet},
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::error::BenchError;

pub const PROGRAM_EXTENSION: &str = "clvm";
pub const ENV_EXTENSION: &str = "env";

const RESULTS_PREFIX: &str = "results-";
const RESULTS_SUFFIX: &str = ".csv";

/// A directory with this name holds a single program, which is always its own
/// heaviest.
pub const SINGLE_FILE_GROUP_DIR: &str = "single";

/// A benchmark filename decoded from `<name>-<size>-<n>.clvm`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramName {
  /// Logical name, also the result group. May contain dashes.
  pub name: String,
  /// Parameter size.
  pub size: u64,
  /// Iteration count.
  pub n: u64,
}

impl ProgramName {
  pub fn parse(file_name: &str) -> Result<Self, BenchError> {
    let malformed = || BenchError::MalformedFilename(file_name.to_string());

    let stem = file_name
      .strip_suffix(PROGRAM_EXTENSION)
      .and_then(|stem| stem.strip_suffix('.'))
      .ok_or_else(malformed)?;

    let mut parts = stem.rsplitn(3, '-');
    let (Some(n), Some(size), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
      return Err(malformed());
    };

    if name.is_empty() {
      return Err(malformed());
    }

    Ok(Self {
      name: name.to_string(),
      size: size.parse().map_err(|_| malformed())?,
      n: n.parse().map_err(|_| malformed())?,
    })
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let file_name = path.file_name().context("file name")?.to_string_lossy();

    Ok(Self::parse(&file_name)?)
  }
}

/// Name of the result file holding rows for `group`.
pub fn results_file_name(group: &str) -> String {
  format!("{RESULTS_PREFIX}{group}{RESULTS_SUFFIX}")
}

/// Path of the environment file that goes with `program`.
pub fn env_path(program: &Path) -> PathBuf {
  program.with_extension(ENV_EXTENSION)
}

/// Logical names of all result files already present in `dir`.
pub fn existing_results(dir: &Path) -> Result<BTreeSet<String>> {
  let mut names = BTreeSet::new();

  for entry in fs::read_dir(dir).with_context(|| format!("read dir {dir:?}"))? {
    let file_name = entry?.file_name();
    let file_name = file_name.to_string_lossy();

    if let Some(group) = file_name
      .strip_prefix(RESULTS_PREFIX)
      .and_then(|rest| rest.strip_suffix(RESULTS_SUFFIX))
    {
      names.insert(group.to_string());
    }
  }

  Ok(names)
}

/// Whether `program` should be left alone because its group already has
/// results.
pub fn should_skip(program: &ProgramName, existing: &BTreeSet<String>, force: bool) -> bool {
  !force && existing.contains(&program.name)
}

/// Picks the heaviest program of every group in `dir`.
///
/// A candidate only replaces the current maximum of its group when it is at
/// least as large in both size and iteration count.
pub fn heaviest(dir: &Path, programs: &[PathBuf]) -> Result<Vec<PathBuf>> {
  if dir.file_name().is_some_and(|name| name == SINGLE_FILE_GROUP_DIR) {
    return Ok(programs.first().cloned().into_iter().collect());
  }

  let mut heaviest: BTreeMap<String, (ProgramName, &PathBuf)> = BTreeMap::new();

  for program in programs {
    let parsed = ProgramName::from_path(program)?;

    match heaviest.get_mut(&parsed.name) {
      Some((current, path)) => {
        if parsed.size >= current.size && parsed.n >= current.n {
          *current = parsed;
          *path = program;
        }
      }
      None => {
        heaviest.insert(parsed.name.clone(), (parsed, program));
      }
    }
  }

  Ok(heaviest.into_values().map(|(_, path)| path.clone()).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| Path::new("bench/group").join(name)).collect()
  }

  #[test]
  fn parses_program_names() {
    assert_eq!(
      ProgramName::parse("foo-100-5.clvm").unwrap(),
      ProgramName {
        name: "foo".to_string(),
        size: 100,
        n: 5
      }
    );

    let dashed = ProgramName::parse("sha-256-tree-32-1000.clvm").unwrap();
    assert_eq!(dashed.name, "sha-256-tree");
    assert_eq!((dashed.size, dashed.n), (32, 1000));
  }

  #[test]
  fn rejects_malformed_names() {
    for bad in ["foo-100.clvm", "foo-a-5.clvm", "foo-100-5.env", "-100-5.clvm", "foo-100-5clvm"] {
      assert!(
        matches!(ProgramName::parse(bad), Err(BenchError::MalformedFilename(_))),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn skips_only_groups_with_results_unless_forced() {
    let existing = BTreeSet::from(["foo".to_string()]);
    let foo = ProgramName::parse("foo-100-5.clvm").unwrap();
    let bar = ProgramName::parse("bar-100-5.clvm").unwrap();

    assert!(should_skip(&foo, &existing, false));
    assert!(!should_skip(&foo, &existing, true));
    assert!(!should_skip(&bar, &existing, false));
  }

  #[test]
  fn reads_existing_result_groups() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["results-foo.csv", "results-bar-baz.csv", "foo-1-1.clvm", "notes.csv"] {
      fs::write(dir.path().join(name), "").unwrap();
    }

    let existing = existing_results(dir.path()).unwrap();
    assert_eq!(existing, BTreeSet::from(["bar-baz".to_string(), "foo".to_string()]));
  }

  #[test]
  fn heaviest_requires_both_dimensions() {
    let programs = paths(&["foo-50-10.clvm", "foo-100-5.clvm"]);
    let selected = heaviest(Path::new("bench/group"), &programs).unwrap();

    assert_eq!(selected, paths(&["foo-50-10.clvm"]));
  }

  #[test]
  fn heaviest_per_group() {
    let programs = paths(&["foo-10-1.clvm", "bar-1-1.clvm", "foo-10-2.clvm", "bar-2-2.clvm", "foo-20-2.clvm"]);
    let selected = heaviest(Path::new("bench/group"), &programs).unwrap();

    assert_eq!(selected, paths(&["bar-2-2.clvm", "foo-20-2.clvm"]));
  }

  #[test]
  fn single_file_group_is_taken_as_is() {
    let dir = Path::new("bench").join(SINGLE_FILE_GROUP_DIR);
    let programs = vec![dir.join("whatever.clvm")];

    assert_eq!(heaviest(&dir, &programs).unwrap(), programs);
  }

  #[test]
  fn heaviest_rejects_malformed_names() {
    let programs = paths(&["foo.clvm"]);

    assert!(heaviest(Path::new("bench/group"), &programs).is_err());
  }
}
