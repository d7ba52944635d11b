use std::collections::BTreeMap;

use crate::error::BenchError;

/// Counters reported by the interpreter for a single program, averaged over
/// every run of it.
#[derive(Clone, Debug, PartialEq)]
pub struct Counters {
  pub cost: f64,
  pub assemble_from_ir: f64,
  pub to_sexp_f: f64,
  pub run_program: f64,
  /// Any other key the interpreter printed.
  pub extra: BTreeMap<String, f64>,
}

impl Counters {
  /// Builds counters out of the per-key sums of `runs` runs, checking that
  /// every required counter was reported.
  pub fn average(mut sums: BTreeMap<String, f64>, runs: u32) -> Result<Self, BenchError> {
    let runs = f64::from(runs);
    for value in sums.values_mut() {
      *value /= runs;
    }

    let mut take = |key: &'static str| sums.remove(key).ok_or(BenchError::MissingCounter(key));

    Ok(Self {
      cost: take("cost")?,
      assemble_from_ir: take("assemble_from_ir")?,
      to_sexp_f: take("to_sexp_f")?,
      run_program: take("run_program")?,
      extra: sums,
    })
  }
}
