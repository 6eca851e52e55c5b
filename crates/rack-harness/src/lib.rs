//! Scripted end-to-end verification for command-line API clients.
//!
//! A scenario pairs an ordered list of expected HTTP requests, each with a
//! canned response, with an ordered list of command runs. The harness starts a
//! loopback service double, runs the program in-process against it with
//! scripted stdin, and checks that every request matched in order, that the
//! expected number of expectations was consumed, and that each run produced
//! the exact exit code and stdout.

mod assertions;
mod error;
mod exec;
mod expectation;
mod scenario;
mod server;
mod stdin;

pub use assertions::{AssertionError, assert_exit_code, assert_stderr, assert_stdout};
pub use error::HarnessError;
pub use exec::{DEFAULT_TIMEOUT, ExecRun, Execution, FnProgram, Program, Simulator, exit_status};
pub use expectation::{
    Difference, Expectation, ExpectationQueue, Mismatch, RecordedRequest, RequestExpectation,
    ScriptedResponse, VIOLATION_STATUS, Violation,
};
pub use scenario::{Scenario, runs};
pub use server::MockServer;
pub use stdin::ScriptedStdin;
