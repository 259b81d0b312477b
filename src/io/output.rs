//! Per-case output context
//!
//! An `Output` collects one case's answer text and chart points while the
//! solver runs, then is flushed exactly once to the session's output file
//! with the `Case #i:` framing prepended.

use std::fmt::Display;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::logging::SOLVER_TARGET;
use crate::common::{Error, Result};

/// Heartbeat flag shared between the supervisor and the solver
///
/// The supervisor arms it on every heartbeat; the next `Output::periodic`
/// call consumes it. This bounds periodic output to one line per interval
/// no matter how tight the solver's loop is.
#[derive(Debug, Clone, Default)]
pub struct PeriodicGate(Arc<AtomicBool>);

impl PeriodicGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the flag, returning whether it was armed
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Output context for a single case
#[derive(Debug)]
pub struct Output {
    case: usize,
    text: String,
    points: Vec<(f64, f64)>,
    flushed: bool,
    periodic: PeriodicGate,
}

impl Output {
    pub fn new(case: usize, periodic: PeriodicGate) -> Self {
        Self {
            case,
            text: String::new(),
            points: Vec::new(),
            flushed: false,
            periodic,
        }
    }

    /// 1-based index of the case being solved
    pub fn case(&self) -> usize {
        self.case
    }

    /// Append a value to the current line, separated by a space
    pub fn print(&mut self, value: impl Display) {
        self.append(' ', value);
    }

    /// Append every value of an iterator to the current line
    pub fn print_all<I>(&mut self, values: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for value in values {
            self.print(value);
        }
    }

    /// Start a new line holding `value`
    pub fn line(&mut self, value: impl Display) {
        self.append('\n', value);
    }

    fn append(&mut self, separator: char, value: impl Display) {
        if self.flushed {
            tracing::warn!(case = self.case, "Write after flush ignored");
            return;
        }
        self.text.push(separator);
        self.text.push_str(&value.to_string());
    }

    /// Emit a diagnostic tagged with the case number
    pub fn debug(&self, message: impl Display) {
        tracing::info!(target: SOLVER_TARGET, case = self.case, "{}", message);
    }

    /// Emit a diagnostic at most once per heartbeat interval
    ///
    /// Calls between heartbeats are dropped, so this is safe to call from an
    /// inner loop.
    pub fn periodic(&self, message: impl Display) {
        if self.periodic.take() {
            self.debug(message);
        }
    }

    /// Record a point for this case's chart
    pub fn add_point(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Hand over the recorded points, leaving the sequence empty
    pub fn take_points(&mut self) -> Vec<(f64, f64)> {
        std::mem::take(&mut self.points)
    }

    /// Answer text written so far, without the case framing
    pub fn answer(&self) -> &str {
        &self.text
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Write the framed case text to `sink` and flush it
    pub fn flush_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<()> {
        if self.flushed {
            return Err(Error::AlreadyFlushed { case: self.case });
        }
        writeln!(sink, "Case #{}:{}", self.case, self.text)?;
        sink.flush()?;
        self.flushed = true;
        Ok(())
    }
}
