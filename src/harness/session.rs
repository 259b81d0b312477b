//! Session driver: one input file, cases 1..=N in order

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::common::config::Config;
use crate::common::paths::CasePaths;
use crate::common::{format_duration, Error, Result};
use crate::io::CaseIo;
use crate::profiling::Profiler;
use crate::reference::ReferenceAnswers;

use super::runner::{CaseReport, CaseRunner, Verdict};
use super::Solver;

/// Summary of a completed session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub input: PathBuf,
    pub reports: Vec<CaseReport>,
    /// Sum of the per-case elapsed times
    pub total: Duration,
}

impl SessionSummary {
    pub fn mismatches(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict == Verdict::Mismatched)
            .count()
    }
}

/// A run over one input file
pub struct Session {
    paths: CasePaths,
    cases: usize,
    io: Option<CaseIo>,
    runner: CaseRunner,
}

impl Session {
    /// Open the session files and read the case count
    pub fn open(input: &Path, config: &Config) -> Result<Self> {
        Self::open_with_profiler(input, config, Profiler::from_config(&config.profiling))
    }

    pub fn open_with_profiler(input: &Path, config: &Config, profiler: Profiler) -> Result<Self> {
        let paths = CasePaths::from_input(input);
        let mut io = CaseIo::open(paths.input(), &paths.output())?;
        let reference = ReferenceAnswers::load(&paths.reference())?;
        let cases = io.input.try_usize()?;

        tracing::debug!(
            input = %paths.input().display(),
            cases,
            references = reference.as_ref().map_or(0, ReferenceAnswers::len),
            "Opened session"
        );

        let runner = CaseRunner::new(paths.clone(), config, reference, profiler);
        Ok(Self {
            paths,
            cases,
            io: Some(io),
            runner,
        })
    }

    /// Number of cases announced by the input file
    pub fn cases(&self) -> usize {
        self.cases
    }

    /// Run every case in order, stopping at the first fatal error
    pub async fn run(mut self, solver: Arc<dyn Solver>) -> Result<SessionSummary> {
        let mut reports = Vec::with_capacity(self.cases);
        let mut total = Duration::ZERO;

        for case in 1..=self.cases {
            let io = self
                .io
                .take()
                .ok_or_else(|| Error::Internal("session I/O not returned by runner".to_string()))?;
            let (io, report) = self.runner.run_case(case, io, Arc::clone(&solver)).await?;
            self.io = Some(io);

            total += report.elapsed;
            self.runner.reap_visualizers().await?;
            reports.push(report);
        }
        self.runner.drain_visualizers().await?;

        tracing::debug!(total = %format_duration(total), "Session complete");
        Ok(SessionSummary {
            input: self.paths.input().to_path_buf(),
            reports,
            total,
        })
    }
}
