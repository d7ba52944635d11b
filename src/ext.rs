use std::{
  io::{self, Read},
  process::{Child, Command, ExitStatus, Output, Stdio},
  thread::{self, JoinHandle},
  time::Duration,
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

use crate::error::BenchError;

#[extend::ext]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

#[extend::ext]
pub impl Output {
  /// Returns stdout, or an error carrying stderr if the exit status was
  /// non-zero.
  fn checked_stdout(self) -> Result<String> {
    let stderr = String::from_utf8_lossy(&self.stderr);
    self
      .status
      .check_success()
      .with_context(|| format!("stderr: {}", stderr.trim_end()))?;

    if !stderr.trim().is_empty() {
      log::debug!("stderr: {}", stderr.trim_end());
    }

    Ok(String::from_utf8_lossy(&self.stdout).into_owned())
  }
}

#[extend::ext]
pub impl Child {
  /// Waits for the child, killing it once `timeout` has passed. Returns
  /// `Ok(None)` if it had to be killed.
  fn wait_or_kill(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
    if let Some(status) = self.wait_timeout(timeout).context("wait")? {
      return Ok(Some(status));
    }

    self.kill().context("kill after timeout")?;
    self.wait().context("reap after kill")?;

    Ok(None)
  }
}

#[extend::ext]
pub impl Command {
  /// Runs the command to completion and returns its stdout, failing on a
  /// non-zero exit or, if given, once `timeout` has passed.
  fn capture_stdout(&mut self, timeout: Option<Duration>) -> Result<String> {
    let Some(timeout) = timeout else {
      return self.output().context("output")?.checked_stdout();
    };

    let mut child = self
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("spawn")?;

    // Drained while waiting, so a child with more output than the pipe holds
    // can still exit.
    let stdout = drain(child.stdout.take().context("stdout")?);
    let stderr = drain(child.stderr.take().context("stderr")?);

    let status = child.wait_or_kill(timeout)?.ok_or(BenchError::Timeout(timeout))?;

    Output {
      status,
      stdout: join(stdout).context("read stdout")?,
      stderr: join(stderr).context("read stderr")?,
    }
    .checked_stdout()
  }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
  thread::spawn(move || {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;

    Ok(buf)
  })
}

fn join(reader: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
  match reader.join() {
    Ok(read) => Ok(read?),
    Err(_) => anyhow::bail!("reader thread panicked"),
  }
}
