//! CLI entrypoint for the Rack client.
//!
//! The binary delegates to [`rack_cli::run`], which loads configuration,
//! parses the command, and talks to the configured rack API.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'static> = io::stdin().lock();
    let mut stdout: StdoutLock<'static> = io::stdout().lock();
    let mut stderr: StderrLock<'static> = io::stderr().lock();
    rack_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
