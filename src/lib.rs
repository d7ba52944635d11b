//! Runs CLVM benchmark programs through an interpreter and collects the
//! reported costs and timings into per-group CSV files.

pub mod bench;
pub mod error;
pub mod ext;
pub mod plot;
pub mod program;
pub mod results;
pub mod run;
pub mod stats;

pub use self::{bench::Bench, error::BenchError, run::{Backend, Runner}};
