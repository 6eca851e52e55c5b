//! Exact-match assertions over a run's outcome.

use std::fmt;
use std::process::ExitCode;

use thiserror::Error;

use crate::exec::exit_status;

/// An outcome that differed from the script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    /// The exit code differed.
    ExitCode {
        /// Expected code.
        expected: u8,
        /// Observed code, when it could be recovered.
        actual: Option<u8>,
    },
    /// Captured output differed.
    Output {
        /// Stream name, such as `stdout`.
        stream: &'static str,
        /// Expected text.
        expected: String,
        /// Observed text.
        actual: String,
        /// Line-by-line comparison.
        diff: String,
    },
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode {
                expected,
                actual: Some(actual),
            } => write!(f, "exit code: expected {expected}, got {actual}"),
            Self::ExitCode {
                expected,
                actual: None,
            } => write!(f, "exit code: expected {expected}, got an unrecognised code"),
            Self::Output {
                stream,
                expected,
                actual,
                diff,
            } => write!(
                f,
                "{stream} mismatch\nexpected: {expected:?}\n  actual: {actual:?}\n{diff}"
            ),
        }
    }
}

/// Asserts that `actual` equals the exit code `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::ExitCode`] with both values on mismatch.
pub fn assert_exit_code(actual: ExitCode, expected: u8) -> Result<(), AssertionError> {
    if actual == ExitCode::from(expected) {
        return Ok(());
    }
    Err(AssertionError::ExitCode {
        expected,
        actual: exit_status(actual),
    })
}

/// Asserts that captured stdout equals `expected` byte for byte.
///
/// # Errors
///
/// Returns [`AssertionError::Output`] carrying both texts and a line diff.
pub fn assert_stdout(actual: &str, expected: &str) -> Result<(), AssertionError> {
    assert_output("stdout", actual, expected)
}

/// Asserts that captured stderr equals `expected` byte for byte.
///
/// # Errors
///
/// Returns [`AssertionError::Output`] carrying both texts and a line diff.
pub fn assert_stderr(actual: &str, expected: &str) -> Result<(), AssertionError> {
    assert_output("stderr", actual, expected)
}

fn assert_output(stream: &'static str, actual: &str, expected: &str) -> Result<(), AssertionError> {
    if actual == expected {
        return Ok(());
    }
    Err(AssertionError::Output {
        stream,
        expected: expected.to_owned(),
        actual: actual.to_owned(),
        diff: line_diff(expected, actual),
    })
}

/// Pairs lines positionally, marking expected lines with `-` and observed
/// lines with `+`. Equal lines are kept with two spaces for context.
fn line_diff(expected: &str, actual: &str) -> String {
    let expected_lines: Vec<&str> = expected.split_inclusive('\n').collect();
    let actual_lines: Vec<&str> = actual.split_inclusive('\n').collect();
    let mut diff = String::new();
    for index in 0..expected_lines.len().max(actual_lines.len()) {
        match (expected_lines.get(index), actual_lines.get(index)) {
            (Some(want), Some(got)) if want == got => {
                diff.push_str(&format!("  {want:?}\n"));
            }
            (want, got) => {
                if let Some(line) = want {
                    diff.push_str(&format!("- {line:?}\n"));
                }
                if let Some(line) = got {
                    diff.push_str(&format!("+ {line:?}\n"));
                }
            }
        }
    }
    diff
}
