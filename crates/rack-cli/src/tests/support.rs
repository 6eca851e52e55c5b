//! Test support for behavioural coverage of the resource commands.
//!
//! The world collects expected requests from `given` steps, starts a mock
//! rack API on the first run, and captures what the CLI printed so `then`
//! steps only compare values.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, ensure};
use rack_config::Config;
use rack_harness::{
    Expectation, MockServer, RequestExpectation, ScriptedResponse, ScriptedStdin, exit_status,
};
use rstest::fixture;

use crate::{Resource, run_with_config};

/// Scenario state shared between steps.
#[derive(Default)]
pub(super) struct TestWorld {
    expectations: Vec<Expectation>,
    server: Option<MockServer>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub fn expect(&mut self, expectation: Expectation) {
        self.expectations.push(expectation);
    }

    pub fn expect_resource(&mut self, resource: &Resource) -> Result<()> {
        let path = format!("/services/{}", resource.name);
        let response = ScriptedResponse::ok(resource).context("encode resource")?;
        self.expect(RequestExpectation::get(path).respond(response));
        Ok(())
    }

    pub fn run(&mut self, command: &str, stdin: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        if self.server.is_none() {
            let expectations = std::mem::take(&mut self.expectations);
            self.server = Some(MockServer::start(expectations).context("start mock API")?);
        }
        let server = self.server.as_ref().context("mock API running")?;
        let config = Config::default().with_host(server.uri());
        let mut input = BufReader::new(ScriptedStdin::new(stdin));
        let args = command_args(command)?;
        let exit = run_with_config(
            args,
            config,
            &mut input,
            &mut self.stdout,
            &mut self.stderr,
        );
        self.exit_code = Some(exit);
        ensure!(
            !input.get_ref().overread(),
            "CLI read stdin past the scripted input"
        );
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        decode_utf8(self.stdout.clone(), "stdout")
    }

    pub fn stderr_text(&self) -> Result<String> {
        decode_utf8(self.stderr.clone(), "stderr")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {:?}",
            exit_status(exit)
        );
        Ok(())
    }

    pub fn assert_stdout_fixture(&self, fixture: &str) -> Result<()> {
        let expected = read_fixture(fixture)?;
        let stdout = self.stdout_text()?;
        ensure!(
            stdout == expected,
            "stdout mismatch: expected {expected:?}, got {stdout:?}"
        );
        Ok(())
    }

    pub fn verify_leaving(&self, unconsumed: usize) -> Result<()> {
        let server = self
            .server
            .as_ref()
            .ok_or_else(|| anyhow!("the CLI never ran against the mock API"))?;
        server.verify_leaving(unconsumed)?;
        Ok(())
    }
}

/// Splits a quoted step argument into CLI arguments after the program name.
pub(super) fn command_args(command: &str) -> Result<Vec<OsString>> {
    let trimmed = command.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed);
    let words = shell_words::split(unquoted)
        .with_context(|| format!("split command {unquoted:?}"))?;
    let mut args = vec![OsString::from("rack")];
    args.extend(words.into_iter().map(OsString::from));
    Ok(args)
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

pub(super) fn syslog(name: &str, status: &str) -> Resource {
    Resource {
        name: name.to_owned(),
        kind: String::from("syslog"),
        status: status.to_owned(),
        url: String::new(),
    }
}

pub(super) fn os_args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

pub(super) fn read_fixture(name: &str) -> Result<String> {
    let normalized = name.trim().trim_matches('"');
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("golden");
    path.push(normalized);
    fs::read_to_string(&path).with_context(|| format!("read fixture at {}", path.display()))
}

pub(super) fn decode_utf8(buffer: Vec<u8>, label: &str) -> Result<String> {
    String::from_utf8(buffer).with_context(|| format!("{label} utf8"))
}
