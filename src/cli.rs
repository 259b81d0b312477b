//! Command-line entry point for solver binaries
//!
//! A solver binary only needs:
//!
//! ```no_run
//! use caseharness::{Input, Output};
//!
//! fn main() {
//!     caseharness::run(|input: &mut Input, output: &mut Output| {
//!         let n = input.int();
//!         output.print(n * 2);
//!     });
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;

use crate::common::config::Config;
use crate::common::{format_duration, logging, Error, Result};
use crate::harness::{ProfileOutcome, Session, SessionSummary, Solver, Verdict};

/// Arguments accepted by every solver binary
#[derive(Parser, Debug, Default)]
#[command(about = "Run numbered test cases through a solver")]
#[command(version, long_about = None)]
pub struct HarnessArgs {
    /// Input files (`<name>.in`), processed in order
    pub inputs: Vec<PathBuf>,

    /// Configuration file (default: the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Abort on the first case that differs from its reference answer
    #[arg(long)]
    pub fatal_mismatch: bool,

    /// Never profile long cases
    #[arg(long)]
    pub no_profile: bool,

    /// Never write charts
    #[arg(long)]
    pub no_chart: bool,
}

impl HarnessArgs {
    /// Load the configuration and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if self.fatal_mismatch {
            config.comparison.fatal_on_mismatch = true;
        }
        if self.no_profile {
            config.profiling.enabled = false;
        }
        if self.no_chart {
            config.chart.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run every input file through `solver`, one session per file
pub async fn run_sessions(args: &HarnessArgs, solver: Arc<dyn Solver>) -> Result<Vec<SessionSummary>> {
    if args.inputs.is_empty() {
        return Err(Error::NoInputFiles);
    }
    let config = args.load_config()?;

    let mut summaries = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let session = Session::open(input, &config)?;
        let summary = session.run(Arc::clone(&solver)).await?;
        print_summary(&summary);
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Parse arguments, run all sessions and exit non-zero on any fatal error
pub fn run<S: Solver>(solver: S) {
    let args = HarnessArgs::parse();
    logging::init_cli();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::from)
        .and_then(|runtime| runtime.block_on(run_sessions(&args, Arc::new(solver))));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_summary(summary: &SessionSummary) {
    eprintln!("\n{} {}", "Input:".blue().bold(), summary.input.display());
    for report in &summary.reports {
        let verdict = match report.verdict {
            Verdict::Matched => "✓".green(),
            Verdict::Mismatched => "✗".red(),
            Verdict::Unchecked => "-".dimmed(),
        };
        let mut notes = Vec::new();
        if report.warned {
            notes.push("slow".yellow().to_string());
        }
        if report.profile != ProfileOutcome::NotStarted {
            notes.push("profiled".cyan().to_string());
        }
        if report.chart.is_some() {
            notes.push("chart".dimmed().to_string());
        }
        eprintln!(
            "  {} Case #{} {} {}",
            verdict,
            report.case,
            format_duration(report.elapsed),
            notes.join(" ")
        );
    }

    let mismatches = summary.mismatches();
    if mismatches > 0 {
        eprintln!("  {} {} mismatching case(s)", "✗".red(), mismatches);
    }
    eprintln!("{} {}", "Total time:".bold(), format_duration(summary.total));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = HarnessArgs::try_parse_from([
            "solver",
            "a.in",
            "b.in",
            "--fatal-mismatch",
            "--no-chart",
        ])
        .unwrap();
        assert_eq!(args.inputs, vec![PathBuf::from("a.in"), PathBuf::from("b.in")]);
        assert!(args.fatal_mismatch);
        assert!(args.no_chart);
        assert!(!args.no_profile);
    }

    #[test]
    fn test_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[chart]\nsize_px = 100\n").unwrap();

        let args = HarnessArgs {
            config: Some(config_path),
            fatal_mismatch: true,
            no_profile: true,
            ..HarnessArgs::default()
        };
        let config = args.load_config().unwrap();
        assert!(config.comparison.fatal_on_mismatch);
        assert!(!config.profiling.enabled);
        assert!(config.chart.enabled);
        assert_eq!(config.chart.size_px, 100);
    }

    #[tokio::test]
    async fn test_no_inputs_is_an_error() {
        let solver: Arc<dyn Solver> = Arc::new(|_: &mut crate::Input, _: &mut crate::Output| {});
        let result = run_sessions(&HarnessArgs::default(), solver).await;
        assert!(matches!(result, Err(Error::NoInputFiles)));
    }
}
