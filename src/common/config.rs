//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Timer delays used to supervise each case
    #[serde(default)]
    pub timers: Timers,

    /// CPU profiling window settings
    #[serde(default)]
    pub profiling: ProfilingConfig,

    /// Reference answer comparison
    #[serde(default)]
    pub comparison: ComparisonConfig,

    /// Chart output settings
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Timer settings in milliseconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timers {
    /// Delay before a "long calculation" warning
    #[serde(default = "default_warning")]
    pub warning_ms: u64,

    /// Delay before CPU sampling starts
    #[serde(default = "default_profile_start")]
    pub profile_start_ms: u64,

    /// Delay before CPU sampling stops
    #[serde(default = "default_profile_stop")]
    pub profile_stop_ms: u64,

    /// Interval between heartbeats
    #[serde(default = "default_heartbeat")]
    pub heartbeat_ms: u64,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            warning_ms: default_warning(),
            profile_start_ms: default_profile_start(),
            profile_stop_ms: default_profile_stop(),
            heartbeat_ms: default_heartbeat(),
        }
    }
}

impl Timers {
    pub fn warning(&self) -> Duration {
        Duration::from_millis(self.warning_ms)
    }

    pub fn profile_start(&self) -> Duration {
        Duration::from_millis(self.profile_start_ms)
    }

    pub fn profile_stop(&self) -> Duration {
        Duration::from_millis(self.profile_stop_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

fn default_warning() -> u64 {
    500
}
fn default_profile_start() -> u64 {
    1_000
}
fn default_profile_stop() -> u64 {
    10_000
}
fn default_heartbeat() -> u64 {
    1_000
}

/// CPU profiling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProfilingConfig {
    /// Whether long cases are profiled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sampling frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency: i32,

    /// External tool used to analyze a finished profile
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: default_frequency(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

fn default_frequency() -> i32 {
    100
}

/// Profile analysis tool
///
/// Arguments may contain `{binary}` (the running executable) and
/// `{profile}` (the profile file) placeholders.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    /// Whether the analysis tool is invoked after profiling stops
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tool executable, looked up on PATH
    #[serde(default = "default_analyzer_program")]
    pub program: String,

    /// Arguments producing the textual hot-path report
    #[serde(default = "default_report_args")]
    pub report_args: Vec<String>,

    /// Arguments producing the call-graph visualization
    #[serde(default = "default_visualize_args")]
    pub visualize_args: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_analyzer_program(),
            report_args: default_report_args(),
            visualize_args: default_visualize_args(),
        }
    }
}

fn default_analyzer_program() -> String {
    "pprof".to_string()
}

fn default_report_args() -> Vec<String> {
    ["-top", "{binary}", "{profile}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_visualize_args() -> Vec<String> {
    ["-web", "{binary}", "{profile}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Reference comparison configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ComparisonConfig {
    /// Abort the run on the first mismatching case
    #[serde(default)]
    pub fatal_on_mismatch: bool,
}

/// Chart configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    /// Whether charts are written for cases that recorded points
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Side length of the square image in pixels
    #[serde(default = "default_chart_size")]
    pub size_px: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size_px: default_chart_size(),
        }
    }
}

/// 4 inches at 96 dpi
fn default_chart_size() -> u32 {
    384
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from an explicit file, or from the default config
    /// file when none is given
    ///
    /// Returns default configuration if the default file doesn't exist
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Reject timer and chart settings the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.timers;
        if t.warning_ms == 0 || t.heartbeat_ms == 0 {
            return Err(Error::Config(
                "warning_ms and heartbeat_ms must be greater than zero".to_string(),
            ));
        }
        if self.profiling.enabled && t.profile_start_ms >= t.profile_stop_ms {
            return Err(Error::Config(format!(
                "profile_start_ms ({}) must be less than profile_stop_ms ({})",
                t.profile_start_ms, t.profile_stop_ms
            )));
        }
        if self.profiling.enabled && self.profiling.frequency <= 0 {
            return Err(Error::Config(format!(
                "profiling frequency must be greater than zero, got {}",
                self.profiling.frequency
            )));
        }
        if self.chart.size_px == 0 {
            return Err(Error::Config("chart size_px must be greater than zero".to_string()));
        }
        Ok(())
    }
}
