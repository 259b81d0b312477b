//! Whitespace-separated token reader over the case input stream

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::BufRead;
use std::str::FromStr;

use crate::common::{Error, Result};

/// Sequential token reader shared by all cases of a session
///
/// The fallible `try_*` methods return `Error::MalformedInput` or
/// `Error::UnexpectedEof`. The plain methods are meant for solver code and
/// panic on malformed input; the case runner turns that panic into a fatal
/// error for the run.
pub struct Input {
    reader: Box<dyn BufRead + Send>,
    pending: VecDeque<String>,
}

impl Input {
    pub fn new(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            pending: VecDeque::new(),
        }
    }

    /// Build an input from in-memory text
    pub fn from_text(text: &str) -> Self {
        Self::new(std::io::Cursor::new(text.to_string().into_bytes()))
    }

    /// Read the next token, refilling from the stream one line at a time
    pub fn try_token(&mut self) -> Result<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(Error::UnexpectedEof("a token".to_string()));
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// Read the rest of the current line as raw text
    ///
    /// Tokens already split from the line are rejoined with single spaces.
    pub fn try_line(&mut self) -> Result<String> {
        if !self.pending.is_empty() {
            let rest: Vec<String> = self.pending.drain(..).collect();
            return Ok(rest.join(" "));
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(Error::UnexpectedEof("a line".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read and parse the next token
    pub fn try_parse<T: FromStr>(&mut self, expected: &str) -> Result<T> {
        let token = self.try_token()?;
        token.parse().map_err(|_| Error::malformed(expected, &token))
    }

    pub fn try_int(&mut self) -> Result<i64> {
        self.try_parse("an integer")
    }

    pub fn try_usize(&mut self) -> Result<usize> {
        self.try_parse("a non-negative integer")
    }

    pub fn try_float(&mut self) -> Result<f64> {
        self.try_parse("a number")
    }

    pub fn string(&mut self) -> String {
        abort_on_err(self.try_token())
    }

    pub fn line(&mut self) -> String {
        abort_on_err(self.try_line())
    }

    pub fn int(&mut self) -> i64 {
        abort_on_err(self.try_int())
    }

    pub fn uint(&mut self) -> u64 {
        abort_on_err(self.try_parse("a non-negative integer"))
    }

    pub fn usize(&mut self) -> usize {
        abort_on_err(self.try_usize())
    }

    pub fn float(&mut self) -> f64 {
        abort_on_err(self.try_float())
    }

    /// Read `n` integers
    pub fn ints(&mut self, n: usize) -> Vec<i64> {
        (0..n).map(|_| self.int()).collect()
    }

    /// Read `n` numbers
    pub fn floats(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.float()).collect()
    }

    /// Read `rows` tokens as rows of a character grid
    pub fn grid(&mut self, rows: usize) -> Vec<Vec<char>> {
        (0..rows).map(|_| self.string().chars().collect()).collect()
    }
}

fn abort_on_err<T, E: Display>(result: std::result::Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_across_lines() {
        let mut input = Input::from_text("3\n1 2\n\n  -7  x\n");
        assert_eq!(input.try_usize().unwrap(), 3);
        assert_eq!(input.ints(3), vec![1, 2, -7]);
        assert_eq!(input.string(), "x");
        assert!(matches!(input.try_token(), Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn test_malformed_token() {
        let mut input = Input::from_text("abc");
        match input.try_int() {
            Err(Error::MalformedInput { found, .. }) => assert_eq!(found, "abc"),
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "Malformed input")]
    fn test_plain_reader_panics_on_malformed() {
        let mut input = Input::from_text("1.5");
        input.int();
    }

    #[test]
    fn test_grid_and_line() {
        let mut input = Input::from_text("2\n#.\n.#\nhello world\n");
        let rows = input.usize();
        assert_eq!(input.grid(rows), vec![vec!['#', '.'], vec!['.', '#']]);
        assert_eq!(input.line(), "hello world");
    }

    #[test]
    fn test_floats() {
        let mut input = Input::from_text("0.5 2 1e3");
        assert_eq!(input.floats(3), vec![0.5, 2.0, 1000.0]);
    }
}
