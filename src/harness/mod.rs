//! Test-case execution harness
//!
//! The session driver reads the case count and hands each case to the case
//! runner, which:
//! 1. Runs the solver on a blocking worker thread
//! 2. Supervises it against the stall-warning, profiling and heartbeat timers
//! 3. Tears the timers and any open profile down when the worker signals
//! 4. Emits the case's chart

mod runner;
mod session;
mod timers;

pub use runner::{CaseReport, CaseRunner, ProfileOutcome, Verdict};
pub use session::{Session, SessionSummary};
pub use timers::{TimerEvent, TimerSet};

use crate::io::{Input, Output};

/// User-supplied solver invoked once per case
///
/// Implemented for every `Fn(&mut Input, &mut Output)` closure.
pub trait Solver: Send + Sync + 'static {
    fn solve(&self, input: &mut Input, output: &mut Output);
}

impl<F> Solver for F
where
    F: Fn(&mut Input, &mut Output) + Send + Sync + 'static,
{
    fn solve(&self, input: &mut Input, output: &mut Output) {
        self(input, output)
    }
}
