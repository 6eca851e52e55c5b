//! Scripted command runs and the in-process simulator that executes them.

use std::any::Any;
use std::ffi::OsString;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::HarnessError;
use crate::stdin::ScriptedStdin;

/// Default bound on a single run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A command-line program that can run in-process.
///
/// `endpoint` is the base URL of the service double, handed over explicitly
/// so concurrent runs never share process-wide state.
pub trait Program: Send + Sync {
    /// Runs the program and returns its exit code.
    fn run(
        &self,
        args: Vec<OsString>,
        endpoint: &str,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> ExitCode;
}

/// Adapts a closure into a [`Program`].
pub struct FnProgram<F>(F);

impl<F> Program for FnProgram<F>
where
    F: Fn(Vec<OsString>, &str, &mut dyn BufRead, &mut dyn Write, &mut dyn Write) -> ExitCode
        + Send
        + Sync,
{
    fn run(
        &self,
        args: Vec<OsString>,
        endpoint: &str,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> ExitCode {
        (self.0)(args, endpoint, stdin, stdout, stderr)
    }
}

/// One scripted invocation: the command line, its standard input, and the
/// outcome it must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRun {
    command: String,
    stdin: String,
    exit: u8,
    stdout: String,
}

impl ExecRun {
    /// Scripts `command`, split with shell quoting rules. The first word is the
    /// program name.
    ///
    /// By default the run gets empty stdin and must exit 0 with empty stdout.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdin: String::new(),
            exit: 0,
            stdout: String::new(),
        }
    }

    /// Feeds `stdin` to the program.
    #[must_use]
    pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }

    /// Expects the program to exit with `exit`.
    #[must_use]
    pub const fn exit(mut self, exit: u8) -> Self {
        self.exit = exit;
        self
    }

    /// Expects stdout to equal `stdout` exactly.
    #[must_use]
    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// The scripted command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Expected exit code.
    #[must_use]
    pub const fn expected_exit(&self) -> u8 {
        self.exit
    }

    /// Expected stdout.
    #[must_use]
    pub fn expected_stdout(&self) -> &str {
        &self.stdout
    }

    fn arguments(&self) -> Result<Vec<OsString>, HarnessError> {
        let words = shell_words::split(&self.command).map_err(|source| HarnessError::Command {
            command: self.command.clone(),
            source,
        })?;
        if words.is_empty() {
            return Err(HarnessError::EmptyCommand);
        }
        Ok(words.into_iter().map(OsString::from).collect())
    }
}

impl fmt::Display for ExecRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Exit code returned by the program.
    pub exit: ExitCode,
    /// Whether the program read stdin after end-of-input.
    pub stdin_overread: bool,
}

impl Execution {
    /// Numeric exit status, when the platform exposes one.
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        exit_status(self.exit)
    }
}

/// Recovers the numeric value of `exit` by comparing against every `u8`.
#[must_use]
pub fn exit_status(exit: ExitCode) -> Option<u8> {
    (0..=u8::MAX).find(|candidate| ExitCode::from(*candidate) == exit)
}

/// Runs a [`Program`] in-process with captured streams and a time bound.
#[derive(Clone)]
pub struct Simulator {
    program: Arc<dyn Program>,
    timeout: Duration,
}

impl Simulator {
    /// Wraps `program` with the default timeout.
    #[must_use]
    pub fn new(program: impl Program + 'static) -> Self {
        Self {
            program: Arc::new(program),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Wraps a closure with the default timeout.
    #[must_use]
    pub fn from_fn<F>(program: F) -> Self
    where
        F: Fn(Vec<OsString>, &str, &mut dyn BufRead, &mut dyn Write, &mut dyn Write) -> ExitCode
            + Send
            + Sync
            + 'static,
    {
        Self::new(FnProgram(program))
    }

    /// Replaces the per-run timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executes `run` against `endpoint` and captures the outcome.
    ///
    /// The program runs on a worker thread so a hang becomes an error after
    /// the timeout rather than stalling the suite.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be split, the worker cannot be
    /// spawned, the program panics or times out, or its output is not UTF-8.
    pub fn execute(&self, run: &ExecRun, endpoint: &str) -> Result<Execution, HarnessError> {
        let args = run.arguments()?;
        let program = Arc::clone(&self.program);
        let base_url = endpoint.to_owned();
        let script = run.stdin.clone();
        let (result_tx, result_rx) = mpsc::channel();

        debug!(command = %run, "executing scripted run");
        let worker = thread::Builder::new()
            .name("rack-harness-run".to_owned())
            .spawn(move || {
                let mut stdin = BufReader::new(ScriptedStdin::new(script));
                let mut stdout = Vec::new();
                let mut stderr = Vec::new();
                let exit = program.run(args, &base_url, &mut stdin, &mut stdout, &mut stderr);
                let captured = (stdout, stderr, exit, stdin.get_ref().overread());
                if result_tx.send(captured).is_err() {
                    debug!("run finished after the harness gave up on it");
                }
            })
            .map_err(HarnessError::Spawn)?;

        let (stdout, stderr, exit, stdin_overread) = match result_rx.recv_timeout(self.timeout) {
            Ok(captured) => captured,
            Err(RecvTimeoutError::Timeout) => {
                return Err(HarnessError::Timeout {
                    command: run.command.clone(),
                    timeout: self.timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                let message = match worker.join() {
                    Err(payload) => panic_message(payload.as_ref()),
                    Ok(()) => String::from("worker exited without a result"),
                };
                return Err(HarnessError::Panicked {
                    command: run.command.clone(),
                    message,
                });
            }
        };

        Ok(Execution {
            stdout: utf8(run, "stdout", stdout)?,
            stderr: utf8(run, "stderr", stderr)?,
            exit,
            stdin_overread,
        })
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn utf8(run: &ExecRun, stream: &'static str, bytes: Vec<u8>) -> Result<String, HarnessError> {
    String::from_utf8(bytes).map_err(|_| HarnessError::NonUtf8 {
        command: run.command.clone(),
        stream,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
