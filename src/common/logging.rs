//! Logging and tracing configuration
//!
//! Harness diagnostics (stall warnings, profile reports, mismatches) and
//! solver debug output all go through tracing to stderr, so the output file
//! only ever receives case answers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for diagnostics emitted by solver code
pub const SOLVER_TARGET: &str = "caseharness::solver";

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("caseharness=info,warn"));

    // A solver binary may be linked into a host that already installed a
    // subscriber; keep theirs in that case.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .compact(),
        )
        .try_init();
}
