//! Windowed CPU profiling
//!
//! A `Profiler` samples the process between `start` and `stop` and writes
//! the samples to the profile file opened at `start`. `analyze` hands a
//! written profile to an external analysis tool: once synchronously for a
//! textual hot-path report, once detached for a call-graph visualization.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::common::config::{AnalyzerConfig, ProfilingConfig};
use crate::common::{Error, Result};

/// Source of CPU samples
pub trait Sampler {
    /// Begin sampling the current process
    fn begin(&mut self) -> Result<()>;

    /// Stop sampling and write the collected profile to `out`
    fn finish(&mut self, out: &mut File) -> Result<()>;
}

/// Sampler backed by `pprof`, writing protobuf profiles
#[cfg(unix)]
pub struct PprofSampler {
    frequency: i32,
    guard: Option<pprof::ProfilerGuard<'static>>,
}

#[cfg(unix)]
impl PprofSampler {
    pub fn new(frequency: i32) -> Self {
        Self {
            frequency,
            guard: None,
        }
    }
}

#[cfg(unix)]
impl Sampler for PprofSampler {
    fn begin(&mut self) -> Result<()> {
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(self.frequency)
            .blocklist(&["libc", "libgcc", "pthread", "vdso"])
            .build()
            .map_err(|e| Error::Profiler(format!("Failed to start sampling: {}", e)))?;
        self.guard = Some(guard);
        Ok(())
    }

    fn finish(&mut self, out: &mut File) -> Result<()> {
        use pprof::protos::Message;
        use std::io::Write;

        let Some(guard) = self.guard.take() else {
            return Ok(());
        };
        let report = guard
            .report()
            .build()
            .map_err(|e| Error::Profiler(format!("Failed to build report: {}", e)))?;
        drop(guard);

        let samples: isize = report.data.values().copied().sum();
        if samples == 0 {
            tracing::warn!("No profiler samples collected");
        }

        let profile = report
            .pprof()
            .map_err(|e| Error::Profiler(format!("Failed to encode profile: {}", e)))?;
        let mut content = Vec::new();
        profile
            .encode(&mut content)
            .map_err(|e| Error::Profiler(format!("Failed to encode profile: {}", e)))?;
        out.write_all(&content)?;
        out.flush()?;
        Ok(())
    }
}

/// Sampler for platforms without a sampling backend; profiles stay empty
#[derive(Debug, Default)]
pub struct NullSampler;

impl Sampler for NullSampler {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self, _out: &mut File) -> Result<()> {
        Ok(())
    }
}

/// Default sampler for this platform
pub fn default_sampler(frequency: i32) -> Box<dyn Sampler> {
    #[cfg(unix)]
    {
        Box::new(PprofSampler::new(frequency))
    }
    #[cfg(not(unix))]
    {
        let _ = frequency;
        Box::new(NullSampler)
    }
}

/// Profiling state of the current case
#[derive(Debug)]
pub enum ProfileWindow {
    /// No profile has been started
    Idle,
    /// Sampling into `file`
    Active { path: PathBuf, file: File },
    /// The last profile was written to `path`
    Stopped { path: PathBuf },
}

/// Starts and stops CPU profiles and runs the analysis tool on them
pub struct Profiler {
    sampler: Box<dyn Sampler>,
    analyzer: Option<AnalyzerConfig>,
    window: ProfileWindow,
    visualizers: Vec<JoinHandle<Result<()>>>,
}

impl Profiler {
    pub fn new(sampler: Box<dyn Sampler>, analyzer: Option<AnalyzerConfig>) -> Self {
        Self {
            sampler,
            analyzer,
            window: ProfileWindow::Idle,
            visualizers: Vec::new(),
        }
    }

    pub fn from_config(config: &ProfilingConfig) -> Self {
        let analyzer = config
            .analyzer
            .enabled
            .then(|| config.analyzer.clone());
        Self::new(default_sampler(config.frequency), analyzer)
    }

    pub fn window(&self) -> &ProfileWindow {
        &self.window
    }

    pub fn is_active(&self) -> bool {
        matches!(self.window, ProfileWindow::Active { .. })
    }

    /// Create the profile file at `path` and begin sampling
    ///
    /// Starting while a profile is already active is an error.
    pub fn start(&mut self, path: &Path) -> Result<()> {
        if self.is_active() {
            return Err(Error::Internal("CPU profile already active".to_string()));
        }
        let file = File::create(path).map_err(|e| Error::profile_create(path, e))?;
        self.sampler.begin()?;
        tracing::debug!(path = %path.display(), "Started CPU profile");
        self.window = ProfileWindow::Active {
            path: path.to_path_buf(),
            file,
        };
        Ok(())
    }

    /// Stop sampling and write the profile
    ///
    /// Returns the path of the profile written by this call. Idempotent:
    /// when no profile is active this returns `None` and does nothing else.
    pub fn stop(&mut self) -> Result<Option<PathBuf>> {
        let (path, mut file) = match std::mem::replace(&mut self.window, ProfileWindow::Idle) {
            ProfileWindow::Active { path, file } => (path, file),
            other => {
                self.window = other;
                return Ok(None);
            }
        };

        self.sampler.finish(&mut file)?;
        drop(file);
        self.window = ProfileWindow::Stopped { path: path.clone() };
        tracing::debug!(path = %path.display(), "Stopped CPU profile");
        Ok(Some(path))
    }

    /// Run the analysis tool on a written profile
    ///
    /// Returns the hot-path report and launches the visualization in the
    /// background. Returns an empty report when analysis is disabled.
    pub async fn analyze(&mut self, profile: &Path) -> Result<String> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(String::new());
        };
        let text = analyzer_report(analyzer, profile).await?;
        self.visualizers.push(spawn_visualizer(analyzer, profile)?);
        Ok(text)
    }

    /// Collect visualizations that have already exited, failing on the
    /// first unsuccessful one
    pub async fn reap(&mut self) -> Result<()> {
        let mut running = Vec::new();
        for handle in std::mem::take(&mut self.visualizers) {
            if handle.is_finished() {
                join_visualizer(handle).await?;
            } else {
                running.push(handle);
            }
        }
        self.visualizers = running;
        Ok(())
    }

    /// Wait for every outstanding visualization
    pub async fn drain(&mut self) -> Result<()> {
        for handle in std::mem::take(&mut self.visualizers) {
            join_visualizer(handle).await?;
        }
        Ok(())
    }
}

async fn join_visualizer(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle
        .await
        .map_err(|e| Error::Internal(format!("Visualization task failed: {}", e)))?
}

/// Resolve the analyzer executable and substitute argument placeholders
fn analyzer_command(analyzer: &AnalyzerConfig, args: &[String], profile: &Path) -> Result<Command> {
    let tool = which::which(&analyzer.program)
        .map_err(|e| Error::profile_tool(&analyzer.program, e))?;
    let binary = std::env::current_exe()
        .map_err(|e| Error::Internal(format!("Failed to get current executable path: {}", e)))?;

    let binary = binary.to_string_lossy();
    let profile = profile.to_string_lossy();
    let mut cmd = Command::new(tool);
    cmd.args(args.iter().map(|arg| {
        arg.replace("{binary}", &binary)
            .replace("{profile}", &profile)
    }));
    cmd.stdin(Stdio::null());
    Ok(cmd)
}

/// Run the analyzer and return its textual report
async fn analyzer_report(analyzer: &AnalyzerConfig, profile: &Path) -> Result<String> {
    let output = analyzer_command(analyzer, &analyzer.report_args, profile)?
        .output()
        .await
        .map_err(|e| Error::profile_tool(&analyzer.program, e))?;

    if !output.status.success() {
        return Err(Error::profile_tool(
            &analyzer.program,
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}

/// Launch the visualization without waiting for it
///
/// The returned task resolves once the tool exits; a failed exit is still
/// an error for the run.
fn spawn_visualizer(analyzer: &AnalyzerConfig, profile: &Path) -> Result<JoinHandle<Result<()>>> {
    let mut child = analyzer_command(analyzer, &analyzer.visualize_args, profile)?
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::profile_tool(&analyzer.program, e))?;

    let program = analyzer.program.clone();
    Ok(tokio::spawn(async move {
        let status = child
            .wait()
            .await
            .map_err(|e| Error::profile_tool(&program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::profile_tool(
                &program,
                format!("visualization exited with {}", status),
            ))
        }
    }))
}
