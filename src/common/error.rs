//! Error types for the case harness
//!
//! Every variant is fatal for the run: errors propagate up to the entry
//! point, which prints them and exits non-zero. Non-fatal conditions are
//! reported as tracing diagnostics instead and never become an `Error`.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Invocation Errors ===
    #[error("You need to specify at least one input file")]
    NoInputFiles,

    // === File Errors ===
    #[error("Error opening input file '{path}': {source}")]
    InputOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Error creating output file '{path}': {source}")]
    OutputCreate {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Error opening correct file '{path}': {source}")]
    ReferenceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Error opening profile file '{path}': {source}")]
    ProfileCreate {
        path: String,
        #[source]
        source: io::Error,
    },

    // === Input Errors ===
    #[error("Malformed input: expected {expected}, found {found}")]
    MalformedInput { expected: String, found: String },

    #[error("Unexpected end of input while reading {0}")]
    UnexpectedEof(String),

    // === Case Errors ===
    #[error("Case #{case}: output does not match the reference answer")]
    Mismatch { case: usize },

    #[error("Case #{case}: solver panicked: {message}")]
    SolverPanicked { case: usize, message: String },

    #[error("Case #{case}: worker exited without signalling completion")]
    WorkerLost { case: usize },

    #[error("Case #{case}: output was already flushed")]
    AlreadyFlushed { case: usize },

    // === Profiling Errors ===
    #[error("Profiler error: {0}")]
    Profiler(String),

    #[error("Error running profile tool '{tool}': {reason}")]
    ProfileTool { tool: String, reason: String },

    // === Chart Errors ===
    #[error("Error rendering chart '{path}': {reason}")]
    ChartRender { path: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an input open error for a path
    pub fn input_open(path: &Path, source: io::Error) -> Self {
        Self::InputOpen {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create an output create error for a path
    pub fn output_create(path: &Path, source: io::Error) -> Self {
        Self::OutputCreate {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a reference open error for a path
    pub fn reference_open(path: &Path, source: io::Error) -> Self {
        Self::ReferenceOpen {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a profile create error for a path
    pub fn profile_create(path: &Path, source: io::Error) -> Self {
        Self::ProfileCreate {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a malformed input error
    pub fn malformed(expected: &str, found: &str) -> Self {
        Self::MalformedInput {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create a profile tool error
    pub fn profile_tool(tool: &str, reason: impl ToString) -> Self {
        Self::ProfileTool {
            tool: tool.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a chart render error
    pub fn chart_render(path: &Path, reason: impl ToString) -> Self {
        Self::ChartRender {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
