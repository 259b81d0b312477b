//! Case runner: executes one case and supervises it
//!
//! The solver runs on a blocking worker. After the solver returns, the
//! worker compares the answer with the reference, flushes the case to the
//! output file and sends the completion signal, in that order. The
//! supervisor reacts to timers until that signal arrives and never acts on
//! a timer afterwards, even one that fell due while the signal was pending.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::chart;
use crate::common::config::{ChartConfig, Config, Timers};
use crate::common::paths::CasePaths;
use crate::common::{Error, Result};
use crate::io::{CaseIo, Output, PeriodicGate};
use crate::profiling::Profiler;
use crate::reference::{self, ReferenceAnswers};

use super::timers::{TimerEvent, TimerSet};
use super::Solver;

/// Result of comparing a case with its reference answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No reference answer for this case
    Unchecked,
    Matched,
    Mismatched,
}

/// How the profiling window of a case ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// The case finished before the profile-start timer
    NotStarted,
    /// The profile-stop timer closed the window
    StoppedByTimer,
    /// The case finished inside the window and teardown closed it
    StoppedAtTeardown,
}

/// What happened while running one case
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub case: usize,
    pub elapsed: Duration,
    /// Whether the long-calculation warning fired
    pub warned: bool,
    pub heartbeats: u32,
    pub profile: ProfileOutcome,
    pub verdict: Verdict,
    /// Chart written for this case, if any
    pub chart: Option<PathBuf>,
}

impl CaseReport {
    fn new(case: usize) -> Self {
        Self {
            case,
            elapsed: Duration::ZERO,
            warned: false,
            heartbeats: 0,
            profile: ProfileOutcome::NotStarted,
            verdict: Verdict::Unchecked,
            chart: None,
        }
    }
}

/// Everything the worker hands back with the completion signal
struct Completion {
    io: CaseIo,
    output: Output,
    verdict: Verdict,
    result: Result<()>,
}

/// Worker side of a case
struct Worker {
    output: Output,
    reference: Option<Arc<ReferenceAnswers>>,
    fatal_on_mismatch: bool,
}

impl Worker {
    fn run(mut self, mut io: CaseIo, solver: Arc<dyn Solver>) -> Completion {
        let case = self.output.case();
        let solved = panic::catch_unwind(AssertUnwindSafe(|| {
            solver.solve(&mut io.input, &mut self.output)
        }));
        if let Err(payload) = solved {
            return Completion {
                io,
                output: self.output,
                verdict: Verdict::Unchecked,
                result: Err(Error::SolverPanicked {
                    case,
                    message: panic_message(payload.as_ref()),
                }),
            };
        }

        let verdict = self.compare();
        let result = if verdict == Verdict::Mismatched && self.fatal_on_mismatch {
            Err(Error::Mismatch { case })
        } else {
            self.output.flush_into(&mut io.sink)
        };

        Completion {
            io,
            output: self.output,
            verdict,
            result,
        }
    }

    fn compare(&self) -> Verdict {
        let case = self.output.case();
        let Some(answers) = &self.reference else {
            return Verdict::Unchecked;
        };
        match answers.check(case, self.output.answer()) {
            None => Verdict::Unchecked,
            Some(true) => Verdict::Matched,
            Some(false) => {
                let expected = answers.reference(case).unwrap_or_default();
                tracing::error!(
                    case,
                    expected = %reference::normalize(expected),
                    actual = %reference::normalize(self.output.answer()),
                    "Output mismatch"
                );
                Verdict::Mismatched
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs cases one at a time for a session
pub struct CaseRunner {
    paths: CasePaths,
    timers: Timers,
    profiling: bool,
    chart: ChartConfig,
    fatal_on_mismatch: bool,
    reference: Option<Arc<ReferenceAnswers>>,
    profiler: Profiler,
    periodic: PeriodicGate,
}

impl CaseRunner {
    pub fn new(
        paths: CasePaths,
        config: &Config,
        reference: Option<ReferenceAnswers>,
        profiler: Profiler,
    ) -> Self {
        Self {
            paths,
            timers: config.timers.clone(),
            profiling: config.profiling.enabled,
            chart: config.chart.clone(),
            fatal_on_mismatch: config.comparison.fatal_on_mismatch,
            reference: reference.map(Arc::new),
            profiler,
            periodic: PeriodicGate::new(),
        }
    }

    /// Run case `case` and hand the session I/O back once it completes
    #[tracing::instrument(skip(self, io, solver))]
    pub async fn run_case(
        &mut self,
        case: usize,
        io: CaseIo,
        solver: Arc<dyn Solver>,
    ) -> Result<(CaseIo, CaseReport)> {
        let started = Instant::now();
        let mut report = CaseReport::new(case);
        let mut timers = TimerSet::arm(&self.timers, self.profiling);

        let worker = Worker {
            output: Output::new(case, self.periodic.clone()),
            reference: self.reference.clone(),
            fatal_on_mismatch: self.fatal_on_mismatch,
        };
        let (done_tx, done_rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let completion = worker.run(io, solver);
            // The supervisor only goes away on a fatal error
            let _ = done_tx.send(completion);
        });

        let completion = self.supervise(case, &mut timers, done_rx, &mut report).await?;

        // Sampling stops here; only the profile-stop timer analyzes
        drop(timers);
        self.periodic.reset();
        if self.profiler.stop()?.is_some() {
            report.profile = ProfileOutcome::StoppedAtTeardown;
        }

        let Completion {
            io,
            mut output,
            verdict,
            result,
        } = completion;
        report.verdict = verdict;
        result?;

        let points = output.take_points();
        if self.chart.enabled {
            let path = self.paths.chart(case);
            if chart::emit(&points, &path, self.chart.size_px)? {
                report.chart = Some(path);
            }
        }

        report.elapsed = started.elapsed();
        tracing::debug!(
            elapsed = %crate::common::format_duration(report.elapsed),
            verdict = ?report.verdict,
            "Case complete"
        );
        Ok((io, report))
    }

    /// React to timers until the completion signal arrives
    ///
    /// Completion is polled first, so a timer that is due once the worker
    /// has signalled is never acted on.
    async fn supervise(
        &mut self,
        case: usize,
        timers: &mut TimerSet,
        mut done_rx: oneshot::Receiver<Completion>,
        report: &mut CaseReport,
    ) -> Result<Completion> {
        loop {
            tokio::select! {
                biased;
                done = &mut done_rx => {
                    return done.map_err(|_| Error::WorkerLost { case });
                }
                event = timers.next() => {
                    self.on_timer(case, event, report).await?;
                }
            }
        }
    }

    async fn on_timer(
        &mut self,
        case: usize,
        event: TimerEvent,
        report: &mut CaseReport,
    ) -> Result<()> {
        match event {
            TimerEvent::Warning => {
                report.warned = true;
                tracing::warn!(case, "Long calculation");
            }
            TimerEvent::ProfileStart => {
                self.profiler.start(&self.paths.profile(case))?;
            }
            TimerEvent::ProfileStop => {
                if let Some(path) = self.profiler.stop()? {
                    report.profile = ProfileOutcome::StoppedByTimer;
                    let text = self.profiler.analyze(&path).await?;
                    if !text.is_empty() {
                        tracing::info!(case, "CPUProfile:\n{}", text);
                    }
                }
            }
            TimerEvent::Heartbeat => {
                report.heartbeats += 1;
                self.periodic.arm();
            }
        }
        Ok(())
    }

    /// Fail on any visualization that already exited unsuccessfully
    pub async fn reap_visualizers(&mut self) -> Result<()> {
        self.profiler.reap().await
    }

    /// Wait for all outstanding visualizations
    pub async fn drain_visualizers(&mut self) -> Result<()> {
        self.profiler.drain().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::AnalyzerConfig;
    use crate::io::Input;
    use crate::profiling::testing::RecordingSampler;
    use std::io::Write;
    use std::sync::Mutex;

    fn test_config(warning: u64, start: u64, stop: u64, heartbeat: u64) -> Config {
        let mut config = Config::default();
        config.timers = Timers {
            warning_ms: warning,
            profile_start_ms: start,
            profile_stop_ms: stop,
            heartbeat_ms: heartbeat,
        };
        config.profiling.analyzer = AnalyzerConfig {
            enabled: false,
            ..AnalyzerConfig::default()
        };
        config.chart.size_px = 64;
        config
    }

    /// Output sink that can be inspected after the runner is done with it
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        paths: CasePaths,
        sampler: RecordingSampler,
        sink: SharedSink,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let paths = CasePaths::from_input(&dir.path().join("sample.in"));
            Self {
                dir,
                paths,
                sampler: RecordingSampler::default(),
                sink: SharedSink::default(),
            }
        }

        fn runner(&self, config: &Config, reference: Option<&str>) -> CaseRunner {
            self.build(config, reference, None)
        }

        fn runner_with_analyzer(&self, config: &Config, analyzer: AnalyzerConfig) -> CaseRunner {
            self.build(config, None, Some(analyzer))
        }

        fn build(
            &self,
            config: &Config,
            reference: Option<&str>,
            analyzer: Option<AnalyzerConfig>,
        ) -> CaseRunner {
            let profiler = Profiler::new(Box::new(self.sampler.clone()), analyzer);
            CaseRunner::new(
                self.paths.clone(),
                config,
                reference.map(ReferenceAnswers::parse),
                profiler,
            )
        }

        fn io(&self, input: &str) -> CaseIo {
            CaseIo {
                input: Input::from_text(input),
                sink: Box::new(self.sink.clone()),
            }
        }
    }

    fn sleeper(ms: u64) -> Arc<dyn Solver> {
        Arc::new(move |_: &mut Input, output: &mut Output| {
            std::thread::sleep(Duration::from_millis(ms));
            output.print("done");
        })
    }

    #[tokio::test]
    async fn test_fast_case_never_profiles() {
        let fx = Fixture::new();
        let mut runner = fx.runner(&test_config(500, 1_000, 10_000, 1_000), None);

        let (_, report) = runner.run_case(1, fx.io(""), sleeper(0)).await.unwrap();
        assert!(!report.warned);
        assert_eq!(report.profile, ProfileOutcome::NotStarted);
        assert_eq!(fx.sampler.begins(), 0);
        assert_eq!(fx.sampler.finishes(), 0);
        assert!(!fx.paths.profile(1).exists());
        assert_eq!(fx.sink.text(), "Case #1: done\n");
    }

    #[tokio::test]
    async fn test_long_case_stopped_by_timer_once() {
        let fx = Fixture::new();
        let mut runner = fx.runner(&test_config(10, 20, 60, 15), None);

        let (_, report) = runner.run_case(2, fx.io(""), sleeper(200)).await.unwrap();
        assert!(report.warned);
        assert!(report.heartbeats >= 1);
        assert_eq!(report.profile, ProfileOutcome::StoppedByTimer);
        assert_eq!(fx.sampler.begins(), 1);
        assert_eq!(fx.sampler.finishes(), 1);
        assert!(fx.paths.profile(2).exists());
        assert!(report.elapsed >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_case_inside_window_stopped_at_teardown() {
        let fx = Fixture::new();
        let mut runner = fx.runner(&test_config(10, 20, 60_000, 1_000), None);

        let (_, report) = runner.run_case(1, fx.io(""), sleeper(150)).await.unwrap();
        assert_eq!(report.profile, ProfileOutcome::StoppedAtTeardown);
        assert_eq!(fx.sampler.begins(), 1);
        assert_eq!(fx.sampler.finishes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_act_only_until_completion() {
        let fx = Fixture::new();
        let config = test_config(10, 20, 30, 5);
        let mut runner = fx.runner(&config, None);
        let mut timers = TimerSet::arm(&config.timers, true);
        let mut report = CaseReport::new(1);
        let output = Output::new(1, runner.periodic.clone());
        let (done_tx, done_rx) = oneshot::channel();

        {
            let supervise = runner.supervise(1, &mut timers, done_rx, &mut report);
            tokio::pin!(supervise);

            // Warning and profile-start fall due while the solver runs
            tokio::select! {
                _ = &mut supervise => panic!("supervision ended without a completion"),
                _ = tokio::time::sleep(Duration::from_millis(25)) => {}
            }
            assert_eq!(fx.sampler.begins(), 1);

            // Profile-stop falls due after the worker has signalled
            tokio::time::advance(Duration::from_millis(100)).await;
            let completion = Completion {
                io: fx.io(""),
                output,
                verdict: Verdict::Unchecked,
                result: Ok(()),
            };
            assert!(done_tx.send(completion).is_ok());
            let completion = supervise.await.unwrap();
            assert!(completion.result.is_ok());
        }

        assert!(report.warned);
        assert!(report.heartbeats >= 1);
        assert_eq!(report.profile, ProfileOutcome::NotStarted);
        assert_eq!(fx.sampler.finishes(), 0);
        assert!(runner.profiler.is_active());
    }

    #[cfg(unix)]
    fn marker_analyzer(marker: &std::path::Path) -> AnalyzerConfig {
        let marker = marker.display();
        AnalyzerConfig {
            enabled: true,
            program: "sh".to_string(),
            report_args: vec!["-c".to_string(), format!("echo report >> '{}'", marker)],
            visualize_args: vec!["-c".to_string(), format!("echo viz >> '{}'", marker)],
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_timer_runs_analyzer() {
        let fx = Fixture::new();
        let marker = fx.dir.path().join("analyzed");
        let mut runner =
            fx.runner_with_analyzer(&test_config(10, 20, 60, 1_000), marker_analyzer(&marker));

        let (_, report) = runner.run_case(2, fx.io(""), sleeper(200)).await.unwrap();
        assert_eq!(report.profile, ProfileOutcome::StoppedByTimer);
        runner.drain_visualizers().await.unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "report\nviz\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_teardown_stop_skips_analyzer() {
        let fx = Fixture::new();
        let marker = fx.dir.path().join("analyzed");
        let mut runner = fx.runner_with_analyzer(
            &test_config(10, 20, 60_000, 1_000),
            marker_analyzer(&marker),
        );

        let (_, report) = runner.run_case(1, fx.io(""), sleeper(150)).await.unwrap();
        assert_eq!(report.profile, ProfileOutcome::StoppedAtTeardown);
        assert_eq!(fx.sampler.finishes(), 1);
        runner.drain_visualizers().await.unwrap();
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_teardown_stop_ignores_missing_analyzer() {
        let fx = Fixture::new();
        let analyzer = AnalyzerConfig {
            enabled: true,
            program: "caseharness-no-such-analyzer".to_string(),
            ..AnalyzerConfig::default()
        };
        let mut runner = fx.runner_with_analyzer(&test_config(10, 20, 60_000, 1_000), analyzer);

        let (_, report) = runner.run_case(1, fx.io(""), sleeper(100)).await.unwrap();
        assert_eq!(report.profile, ProfileOutcome::StoppedAtTeardown);
        assert!(fx.paths.profile(1).exists());
    }

    #[tokio::test]
    async fn test_disabled_profiling_never_samples() {
        let fx = Fixture::new();
        let mut config = test_config(10, 20, 40, 1_000);
        config.profiling.enabled = false;
        let mut runner = fx.runner(&config, None);

        let (_, report) = runner.run_case(1, fx.io(""), sleeper(100)).await.unwrap();
        assert_eq!(report.profile, ProfileOutcome::NotStarted);
        assert_eq!(fx.sampler.begins(), 0);
    }

    #[tokio::test]
    async fn test_chart_written_and_points_consumed() {
        let fx = Fixture::new();
        let mut runner = fx.runner(&test_config(500, 1_000, 10_000, 1_000), None);
        let solver: Arc<dyn Solver> = Arc::new(|_: &mut Input, output: &mut Output| {
            for (x, y) in [(0.0, 0.0), (1.0, 1.0), (2.0, 4.0)] {
                output.add_point(x, y);
            }
        });

        let (_, report) = runner.run_case(3, fx.io(""), solver).await.unwrap();
        assert_eq!(report.chart, Some(fx.paths.chart(3)));
        assert!(fx.paths.chart(3).exists());

        let (_, report) = runner.run_case(4, fx.io(""), sleeper(0)).await.unwrap();
        assert_eq!(report.chart, None);
        assert!(!fx.paths.chart(4).exists());
    }

    #[tokio::test]
    async fn test_reference_comparison() {
        let fx = Fixture::new();
        let config = test_config(500, 1_000, 10_000, 1_000);
        let mut runner = fx.runner(&config, Some("Case #1: done\nCase #2: other\n"));

        let (io, report) = runner.run_case(1, fx.io(""), sleeper(0)).await.unwrap();
        assert_eq!(report.verdict, Verdict::Matched);
        let (io, report) = runner.run_case(2, io, sleeper(0)).await.unwrap();
        assert_eq!(report.verdict, Verdict::Mismatched);
        let (_, report) = runner.run_case(3, io, sleeper(0)).await.unwrap();
        assert_eq!(report.verdict, Verdict::Unchecked);

        assert_eq!(
            fx.sink.text(),
            "Case #1: done\nCase #2: done\nCase #3: done\n"
        );
    }

    #[tokio::test]
    async fn test_fatal_mismatch_skips_flush() {
        let fx = Fixture::new();
        let mut config = test_config(500, 1_000, 10_000, 1_000);
        config.comparison.fatal_on_mismatch = true;
        let mut runner = fx.runner(&config, Some("Case #1: expected\n"));

        let result = runner.run_case(1, fx.io(""), sleeper(0)).await;
        assert!(matches!(result, Err(Error::Mismatch { case: 1 })));
        assert_eq!(fx.sink.text(), "");
    }

    #[tokio::test]
    async fn test_solver_panic_is_fatal() {
        let fx = Fixture::new();
        let mut runner = fx.runner(&test_config(500, 1_000, 10_000, 1_000), None);
        let solver: Arc<dyn Solver> = Arc::new(|input: &mut Input, _: &mut Output| {
            input.int();
        });

        match runner.run_case(1, fx.io("oops"), solver).await {
            Err(Error::SolverPanicked { case, message }) => {
                assert_eq!(case, 1);
                assert!(message.contains("Malformed input"));
            }
            other => panic!("Expected SolverPanicked, got {:?}", other.map(|(_, r)| r)),
        }
    }
}
