//! Common utilities shared by the harness and its collaborators

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

use std::time::Duration;

/// Format a duration with two decimals in the largest unit that keeps the
/// value at or above one (ns, us, ms, s); seconds are never scaled further.
pub fn format_duration(d: Duration) -> String {
    const UNITS: [&str; 4] = ["ns", "us", "ms", "s"];
    let mut value = d.as_nanos() as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}
