//! File naming for a session and configuration locations
//!
//! All per-session artifacts are derived from the input file name with a
//! trailing `.in` removed:
//! - `<base>.out` output, `<base>.correct` reference answers
//! - `<base><i>.prof` CPU profile, `<base><i>.png` chart for case `i`

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "caseharness";

/// Paths of every file a session reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    base: String,
    input: PathBuf,
}

impl CasePaths {
    /// Derive all session paths from an input file path
    pub fn from_input(input: &Path) -> Self {
        let raw = input.to_string_lossy();
        let base = raw.strip_suffix(".in").unwrap_or(&raw).to_string();
        Self {
            base,
            input: input.to_path_buf(),
        }
    }

    /// Input path with the `.in` suffix stripped
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> PathBuf {
        PathBuf::from(format!("{}.out", self.base))
    }

    pub fn reference(&self) -> PathBuf {
        PathBuf::from(format!("{}.correct", self.base))
    }

    /// Profile file for one case; overwritten if the same input runs again
    pub fn profile(&self, case: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.prof", self.base, case))
    }

    pub fn chart(&self, case: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.png", self.base, case))
    }
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/caseharness/`
/// - macOS: `~/Library/Application Support/caseharness/`
/// - Windows: `%APPDATA%\caseharness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_strip_in_suffix() {
        let paths = CasePaths::from_input(Path::new("data/A-small.in"));
        assert_eq!(paths.base(), "data/A-small");
        assert_eq!(paths.output(), PathBuf::from("data/A-small.out"));
        assert_eq!(paths.reference(), PathBuf::from("data/A-small.correct"));
        assert_eq!(paths.profile(2), PathBuf::from("data/A-small2.prof"));
        assert_eq!(paths.chart(12), PathBuf::from("data/A-small12.png"));
    }

    #[test]
    fn test_paths_without_in_suffix() {
        let paths = CasePaths::from_input(Path::new("sample.txt"));
        assert_eq!(paths.base(), "sample.txt");
        assert_eq!(paths.output(), PathBuf::from("sample.txt.out"));
    }
}
