//! Reference answers loaded from a `<base>.correct` file
//!
//! The file uses the same layout as the output file: a line starting with
//! `Case #<i>:` opens case `i`, and everything up to the next such line
//! belongs to it.

use std::collections::HashMap;
use std::path::Path;

use crate::common::{Error, Result};

/// Known-correct answers addressable by case index
#[derive(Debug, Default, Clone)]
pub struct ReferenceAnswers {
    answers: HashMap<usize, String>,
}

impl ReferenceAnswers {
    /// Load answers from `path` if the file exists
    ///
    /// A missing file yields `None`; a file that exists but cannot be read
    /// is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::reference_open(path, e))?;
        let answers = Self::parse(&content);
        tracing::debug!(path = %path.display(), cases = answers.len(), "Loaded reference answers");
        Ok(Some(answers))
    }

    pub fn parse(content: &str) -> Self {
        let mut answers = HashMap::new();
        let mut current: Option<(usize, String)> = None;

        for line in content.lines() {
            if let Some((case, rest)) = parse_header(line) {
                if let Some((prev, text)) = current.take() {
                    answers.insert(prev, text);
                }
                current = Some((case, rest.to_string()));
            } else if let Some((_, text)) = current.as_mut() {
                text.push('\n');
                text.push_str(line);
            }
        }
        if let Some((prev, text)) = current {
            answers.insert(prev, text);
        }

        Self { answers }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn has_reference(&self, case: usize) -> bool {
        self.answers.contains_key(&case)
    }

    pub fn reference(&self, case: usize) -> Option<&str> {
        self.answers.get(&case).map(String::as_str)
    }

    /// Whether `answer` matches the reference for `case`
    ///
    /// Returns `None` when there is no reference for the case.
    pub fn check(&self, case: usize, answer: &str) -> Option<bool> {
        self.reference(case)
            .map(|expected| normalize(expected) == normalize(answer))
    }
}

/// Split `Case #<i>:<rest>` into the case index and the rest of the line
fn parse_header(line: &str) -> Option<(usize, &str)> {
    let after = line.strip_prefix("Case #")?;
    let (number, rest) = after.split_once(':')?;
    let case = number.trim().parse().ok()?;
    Some((case, rest))
}

/// Canonical form used for comparison: trailing whitespace dropped on every
/// line, leading whitespace dropped on the first, blank lines at either end
/// removed.
pub fn normalize(text: &str) -> String {
    let lines: Vec<&str> = text.trim_start().lines().map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}
