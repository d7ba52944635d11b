use std::{
  fmt::Write as _,
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
  process::Command,
};

use anyhow::{Context, Result};

use crate::ext::ExitStatusExt;

const SCRIPT_NAME: &str = "render-timings.gnuplot";
const IMAGE_NAME: &str = "timings.png";
const GNUPLOT: &str = "gnuplot";

/// Converts a native path to the forward-slash form gnuplot accepts on every
/// host.
pub fn to_plot_path(path: &Path) -> String {
  let path = path.to_string_lossy();

  if cfg!(windows) {
    path.replace('\\', "/")
  } else {
    path.into_owned()
  }
}

/// Inverse of [`to_plot_path`].
pub fn from_plot_path(path: &str) -> PathBuf {
  if cfg!(windows) {
    PathBuf::from(path.replace('/', "\\"))
  } else {
    PathBuf::from(path)
  }
}

/// Renders the gnuplot script plotting iteration count against run time for
/// every `(group, results file)` in `series`.
pub fn script(dir: &Path, series: &[(String, PathBuf)]) -> Result<String> {
  let mut script = String::new();

  writeln!(script, "set output \"{}/{IMAGE_NAME}\"", to_plot_path(dir))?;
  writeln!(script, "set datafile separator \",\"")?;
  writeln!(script, "set term png size 1400,900 small")?;
  writeln!(script, "set termoption enhanced")?;
  writeln!(script, "set ylabel \"run-time (s)\"")?;
  writeln!(script, "set xlabel \"number of ops\"")?;
  writeln!(script, "set xrange [0:*]")?;
  writeln!(script, "set yrange [0:*]")?;

  write!(script, "plot ")?;
  for (color, (group, path)) in series.iter().enumerate() {
    let cont = if color + 1 == series.len() { "" } else { ", \\" };

    writeln!(
      script,
      "\"{}\" using 8:7 with points lc {color} title \"{group}\"{cont}",
      to_plot_path(path)
    )?;
  }

  Ok(script)
}

/// Writes the plot script for `dir` and renders it if gnuplot is installed.
pub fn generate_and_run(dir: &Path, series: &[(String, PathBuf)]) -> Result<()> {
  if series.is_empty() {
    log::debug!("no results written in {dir:?}, not plotting");
    return Ok(());
  }

  let script_path = format!("{}/{SCRIPT_NAME}", to_plot_path(dir));
  let script_file = from_plot_path(&script_path);
  fs::write(&script_file, script(dir, series).context("script")?).with_context(|| format!("write {script_file:?}"))?;

  try_run_gnuplot(&script_path);

  Ok(())
}

fn try_run_gnuplot(script_path: &str) {
  match Command::new(GNUPLOT).arg(script_path).status() {
    Ok(status) => {
      if let Err(err) = status.check_success() {
        log::warn!("{GNUPLOT} {script_path:?}: {err}");
      }
    }
    Err(err) if err.kind() == ErrorKind::NotFound => log::debug!("{GNUPLOT} not found, skipping render"),
    Err(err) => log::warn!("{GNUPLOT} {script_path:?}: {err}"),
  }
}
