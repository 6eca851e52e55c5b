//! Command-line client runtime for a rack's resource API.
//!
//! The module owns argument parsing, configuration bootstrapping, and command
//! dispatch. Standard streams are always passed in, so the same code runs from
//! the binary entry point and in-process from the verification harness, where
//! stdin is scripted and stdout is captured.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use rack_config::Config;
use tracing::debug;

mod cli;
mod client;
mod commands;
mod config;
mod errors;
mod output;
mod prompt;
mod telemetry;

pub use client::{ApiClient, ApiError, FormBody, Resource};
pub use telemetry::TelemetryError;

use cli::{Cli, CliCommand};
pub(crate) use config::{ConfigLoader, FixedConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;

/// Bundles the standard streams handed to the CLI runtime.
pub(crate) struct IoStreams<'a, R: BufRead, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, R: BufRead, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) fn new(stdin: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// Whether the runner should install the global tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Telemetry {
    Install,
    Skip,
}

struct CliRunner<'a, 'io, R: BufRead, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, R, W, E>,
    loader: &'a L,
    telemetry: Telemetry,
}

impl<'a, 'io, R, W, E, L> CliRunner<'a, 'io, R, W, E, L>
where
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'io, R, W, E>, loader: &'a L, telemetry: Telemetry) -> Self {
        Self {
            io,
            loader,
            telemetry,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let arguments: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&arguments);

        let cli = match Cli::try_parse_from(&split.command_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };

        match self.execute(cli, &split.config_arguments) {
            Ok(exit_code) => exit_code,
            Err(error) => {
                debug!(%error, "command failed");
                let _ = writeln!(self.io.stderr, "ERROR: {error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, cli: Cli, config_arguments: &[OsString]) -> Result<ExitCode, AppError> {
        let config = self.loader.load(config_arguments)?;
        if self.telemetry == Telemetry::Install {
            telemetry::initialise(&config)?;
        }
        let client = ApiClient::new(config.api_base()?);
        match cli.command {
            CliCommand::Resources(args) => {
                commands::execute(args.action, &client, self.io.stdin, self.io.stdout)
            }
        }
    }

    /// Help and version requests go to stdout and succeed; real usage errors
    /// go to stderr and fail.
    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = write!(self.io.stdout, "{}", error.render());
                ExitCode::SUCCESS
            }
            _ => {
                let _ = write!(self.io.stderr, "{}", AppError::CliUsage(error));
                ExitCode::FAILURE
            }
        }
    }
}

/// Runs the CLI as the binary does: configuration comes from defaults, files,
/// environment, and leading flags, and the tracing subscriber is installed.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr);
    CliRunner::new(&mut io, &OrthoConfigLoader, Telemetry::Install).run(args)
}

/// Runs the CLI in-process with an explicit configuration.
///
/// Nothing is read from the environment or configuration files and no global
/// subscriber is installed, so concurrent callers stay isolated from each
/// other. Leading configuration flags are still accepted and ignored.
#[must_use]
pub fn run_with_config<I, R, W, E>(
    args: I,
    config: Config,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr);
    let loader = FixedConfigLoader::new(config);
    CliRunner::new(&mut io, &loader, Telemetry::Skip).run(args)
}
