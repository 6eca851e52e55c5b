//! Harness error type.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::assertions::AssertionError;
use crate::expectation::Violation;

/// Failures raised while preparing, running, or verifying a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The loopback socket could not be bound.
    #[error("failed to bind mock server: {0}")]
    Bind(#[source] io::Error),
    /// The server runtime could not be built.
    #[error("failed to build mock server runtime: {0}")]
    Runtime(#[source] io::Error),
    /// A worker thread could not be spawned.
    #[error("failed to spawn harness thread: {0}")]
    Spawn(#[source] io::Error),
    /// The server loop failed.
    #[error("mock server failed: {0}")]
    Server(#[source] io::Error),
    /// A scripted response payload could not be encoded.
    #[error("failed to encode response payload: {0}")]
    Payload(#[source] serde_json::Error),
    /// Requests broke the script.
    #[error("unexpected requests: {}", describe(.violations))]
    Violations {
        /// Every recorded violation.
        violations: Vec<Violation>,
    },
    /// The wrong number of expectations remained at teardown.
    #[error(
        "expected {expected} unconsumed expectation(s), found {}: [{}]",
        .pending.len(),
        .pending.join(", ")
    )]
    Unconsumed {
        /// How many were allowed to remain.
        expected: usize,
        /// The expectations that remained.
        pending: Vec<String>,
    },
    /// A scripted command line could not be split into words.
    #[error("cannot split command `{command}`: {source}")]
    Command {
        /// The command line.
        command: String,
        /// Underlying parse error.
        #[source]
        source: shell_words::ParseError,
    },
    /// A scripted command line had no words.
    #[error("scripted command is empty")]
    EmptyCommand,
    /// A run did not finish in time.
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout {
        /// The command line.
        command: String,
        /// The bound that elapsed.
        timeout: Duration,
    },
    /// The program panicked.
    #[error("`{command}` panicked: {message}")]
    Panicked {
        /// The command line.
        command: String,
        /// Panic payload rendered as text.
        message: String,
    },
    /// The program wrote bytes that are not UTF-8.
    #[error("`{command}` wrote non-UTF-8 {stream}")]
    NonUtf8 {
        /// The command line.
        command: String,
        /// Stream name.
        stream: &'static str,
    },
    /// The program read stdin after the script was exhausted.
    #[error("`{command}` read stdin past the end of its scripted input")]
    StdinExhausted {
        /// The command line.
        command: String,
    },
    /// A run's outcome differed from the script.
    #[error("run {index} `{command}`: {source}")]
    Assertion {
        /// Zero-based position of the run in the scenario.
        index: usize,
        /// The command line.
        command: String,
        /// What differed.
        #[source]
        source: Box<AssertionError>,
    },
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
