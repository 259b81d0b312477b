//! Case harness - run numbered test cases through a solver
//!
//! Reads a case count and case data from `<name>.in`, invokes a solver per
//! case and writes `Case #i:` framed answers to `<name>.out`. Each case is
//! supervised for stalls, profiled when it runs long, checked against
//! `<name>.correct` when present, and charted when it records points.

pub mod chart;
pub mod cli;
pub mod common;
pub mod harness;
pub mod io;
pub mod profiling;
pub mod reference;

pub use cli::run;
pub use common::{Error, Result};
pub use harness::Solver;
pub use io::{Input, Output};
