//! Declarative scenarios: expected traffic plus scripted runs, checked
//! together.

use tracing::{debug, info, warn};

use crate::HarnessError;
use crate::assertions::{assert_exit_code, assert_stdout};
use crate::exec::{ExecRun, Simulator};
use crate::expectation::Expectation;
use crate::server::MockServer;

/// A scripted exchange between a program and a service double.
///
/// ```ignore
/// Scenario::new(simulator)
///     .expect(RequestExpectation::get("/services").respond(ScriptedResponse::ok(&list)?))
///     .run(ExecRun::new("rack resources").stdout("NAME  TYPE  STATUS\n"))
///     .verify()?;
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    simulator: Simulator,
    expectations: Vec<Expectation>,
    runs: Vec<ExecRun>,
    unconsumed: usize,
}

impl Scenario {
    /// Starts an empty scenario for `simulator`.
    #[must_use]
    pub const fn new(simulator: Simulator) -> Self {
        Self {
            simulator,
            expectations: Vec::new(),
            runs: Vec::new(),
            unconsumed: 0,
        }
    }

    /// Appends an expected request and its response.
    #[must_use]
    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Appends a scripted run.
    #[must_use]
    pub fn run(mut self, run: ExecRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Requires exactly `count` expectations to remain unconsumed at
    /// teardown, for runs that must stop before reaching the server.
    #[must_use]
    pub const fn leave_unconsumed(mut self, count: usize) -> Self {
        self.unconsumed = count;
        self
    }

    /// Starts a fresh service double, executes every run in order, and
    /// checks traffic and outcomes.
    ///
    /// Traffic violations are reported ahead of output differences since they
    /// usually explain them.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed.
    pub fn verify(self) -> Result<(), HarnessError> {
        let server = MockServer::start(self.expectations)?;
        runs(&self.simulator, &server, &self.runs)?;
        server.verify_leaving(self.unconsumed)?;
        info!(runs = self.runs.len(), "scenario verified");
        Ok(())
    }
}

/// Executes `scripted` in order against a running `server`.
///
/// Each run is checked for traffic violations, stdin overreads, exit code,
/// and stdout, in that order. Violations also take precedence over a run
/// that panicked or timed out. Expectation consumption is left to the caller's
/// [`MockServer::verify`].
///
/// # Errors
///
/// Returns the first failure observed.
pub fn runs(
    simulator: &Simulator,
    server: &MockServer,
    scripted: &[ExecRun],
) -> Result<(), HarnessError> {
    let endpoint = server.uri();
    for (index, run) in scripted.iter().enumerate() {
        let execution = match simulator.execute(run, &endpoint) {
            Ok(execution) => execution,
            Err(failure) => {
                warn!(index, command = %run, error = %failure, "run did not finish");
                server.check_violations()?;
                return Err(failure);
            }
        };
        debug!(index, command = %run, stderr = %execution.stderr, "run finished");

        server.check_violations()?;
        if execution.stdin_overread {
            return Err(HarnessError::StdinExhausted {
                command: run.command().to_owned(),
            });
        }
        let assertion = assert_exit_code(execution.exit, run.expected_exit())
            .and_then(|()| assert_stdout(&execution.stdout, run.expected_stdout()));
        assertion.map_err(|source| HarnessError::Assertion {
            index,
            command: run.command().to_owned(),
            source: Box::new(source),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]

    use std::ffi::OsString;
    use std::io::{BufRead, Write};
    use std::process::ExitCode;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::expectation::{RequestExpectation, ScriptedResponse};

    /// Fetches `/items` with the given method and prints the body.
    #[fixture]
    fn fetcher() -> Simulator {
        Simulator::from_fn(
            |args: Vec<OsString>,
             endpoint: &str,
             stdin: &mut dyn BufRead,
             stdout: &mut dyn Write,
             _stderr: &mut dyn Write| {
                let method = args
                    .get(1)
                    .map_or_else(|| String::from("GET"), |arg| arg.to_string_lossy().into_owned());
                if method == "ASK" {
                    let mut answer = String::new();
                    return match stdin.read_line(&mut answer) {
                        Ok(_) if answer.trim() == "y" => ExitCode::SUCCESS,
                        _ => ExitCode::FAILURE,
                    };
                }
                let agent: ureq::Agent = ureq::Agent::config_builder()
                    .http_status_as_error(false)
                    .build()
                    .into();
                let url = format!("{endpoint}/items");
                let outcome = match method.as_str() {
                    "DELETE" | "CRASH" => agent.delete(&url).call(),
                    _ => agent.get(&url).call(),
                };
                if method == "CRASH" {
                    panic!("crashed after request");
                }
                let Ok(mut response) = outcome else {
                    return ExitCode::from(2);
                };
                let body = response.body_mut().read_to_string().unwrap_or_default();
                if write!(stdout, "{body}").is_err() || !response.status().is_success() {
                    return ExitCode::FAILURE;
                }
                ExitCode::SUCCESS
            },
        )
    }

    fn items() -> Expectation {
        RequestExpectation::get("/items").respond(ScriptedResponse::raw(200, "[1]"))
    }

    #[rstest]
    fn passing_scenarios_verify(fetcher: Simulator) {
        Scenario::new(fetcher)
            .expect(items())
            .run(ExecRun::new("fetch").stdout("[1]"))
            .verify()
            .expect("scenario passes");
    }

    #[rstest]
    fn wrong_stdout_is_an_assertion_failure(fetcher: Simulator) {
        let error = Scenario::new(fetcher)
            .expect(items())
            .run(ExecRun::new("fetch").stdout("[2]"))
            .verify()
            .expect_err("stdout differs");
        assert!(matches!(error, HarnessError::Assertion { index: 0, .. }));
    }

    #[rstest]
    fn traffic_violations_win_over_output_differences(fetcher: Simulator) {
        let error = Scenario::new(fetcher)
            .expect(items())
            .run(ExecRun::new("fetch DELETE").stdout("[1]"))
            .verify()
            .expect_err("wrong method");
        assert!(matches!(error, HarnessError::Violations { .. }));
    }

    #[rstest]
    fn violations_are_reported_when_a_run_panics(fetcher: Simulator) {
        let error = Scenario::new(fetcher)
            .expect(items())
            .run(ExecRun::new("fetch CRASH"))
            .verify()
            .expect_err("wrong method then panic");
        assert!(matches!(error, HarnessError::Violations { .. }));
    }

    #[rstest]
    fn panicking_runs_surface_their_message(fetcher: Simulator) {
        let error = Scenario::new(fetcher)
            .expect(RequestExpectation::delete("/items").respond(ScriptedResponse::raw(200, "{}")))
            .run(ExecRun::new("fetch CRASH"))
            .verify()
            .expect_err("run panics");
        assert!(
            matches!(error, HarnessError::Panicked { ref message, .. } if message == "crashed after request")
        );
    }

    #[rstest]
    fn leftover_expectations_fail_unless_allowed(fetcher: Simulator) {
        let declined = ExecRun::new("fetch ASK").stdin("n\n").exit(1);
        let error = Scenario::new(fetcher.clone())
            .expect(items())
            .run(declined.clone())
            .verify()
            .expect_err("expectation left over");
        assert!(matches!(error, HarnessError::Unconsumed { expected: 0, .. }));

        Scenario::new(fetcher)
            .expect(items())
            .run(declined)
            .leave_unconsumed(1)
            .verify()
            .expect("one expectation may remain");
    }

    #[rstest]
    fn runs_share_one_server(fetcher: Simulator) {
        let server = MockServer::start([items(), items()]).expect("start server");
        let scripted = [
            ExecRun::new("fetch").stdout("[1]"),
            ExecRun::new("fetch").stdout("[1]"),
        ];
        runs(&fetcher, &server, &scripted).expect("both runs pass");
        server.verify().expect("all expectations consumed");
    }
}
