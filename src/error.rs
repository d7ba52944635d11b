use std::time::Duration;

use thiserror::Error;

/// Failures specific to benchmarking, as opposed to plain I/O errors.
#[derive(Debug, Error)]
pub enum BenchError {
  #[error("malformed benchmark filename {0:?}, expected `name-size-n.clvm`")]
  MalformedFilename(String),
  #[error("interpreter output is missing counter {0:?}")]
  MissingCounter(&'static str),
  #[error("interpreter timed out after {0:?}")]
  Timeout(Duration),
}
