//! Ordered request expectations and the queue that matches traffic against
//! them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::HarnessError;

/// Status returned to the program when a request violates the script.
pub const VIOLATION_STATUS: u16 = 500;

/// Describes one request the program under test must send.
///
/// Method, path and body are compared exactly. Header constraints compare
/// names case-insensitively and values exactly; headers that are not
/// constrained are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestExpectation {
    method: String,
    path: String,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestExpectation {
    /// Expects a request with `method` on `path`.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Expects a `GET` on `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Expects a `POST` on `path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Expects a `PUT` on `path`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new("PUT", path)
    }

    /// Expects a `DELETE` on `path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    /// Requires the raw request body to equal `body`.
    ///
    /// Without this the request must carry an empty body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Requires header `name` to be present with exactly `value`.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Pairs the expectation with the response served when it matches.
    #[must_use]
    pub fn respond(self, response: ScriptedResponse) -> Expectation {
        Expectation::new(self, response)
    }

    /// Expected HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Expected request path, including any query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Expected body, when one was set.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Compares `request` against the expectation, reporting every field that
    /// differs.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] listing each differing field.
    pub fn check(&self, request: &RecordedRequest) -> Result<(), Mismatch> {
        let mut differences = Vec::new();
        if self.method != request.method {
            differences.push(Difference::new("method", &self.method, &request.method));
        }
        if self.path != request.path {
            differences.push(Difference::new("path", &self.path, &request.path));
        }
        let expected_body = self.body.as_deref().unwrap_or_default();
        if expected_body != request.body {
            differences.push(Difference::new("body", expected_body, &request.body));
        }
        for (name, value) in &self.headers {
            let actual = request.header(name);
            if actual != Some(value.as_str()) {
                differences.push(Difference::new(
                    format!("header {name}"),
                    value,
                    actual.unwrap_or("<missing>"),
                ));
            }
        }

        if differences.is_empty() {
            Ok(())
        } else {
            Err(Mismatch { differences })
        }
    }
}

impl fmt::Display for RequestExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(body) = &self.body {
            write!(f, " body={body:?}")?;
        }
        Ok(())
    }
}

/// Response served when an expectation matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedResponse {
    status: u16,
    body: String,
}

impl ScriptedResponse {
    /// Serves `payload` encoded as JSON with `status`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Payload`] when the payload cannot be encoded.
    pub fn json<T: Serialize + ?Sized>(status: u16, payload: &T) -> Result<Self, HarnessError> {
        let body = serde_json::to_string(payload).map_err(HarnessError::Payload)?;
        Ok(Self { status, body })
    }

    /// Serves `payload` encoded as JSON with status 200.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Payload`] when the payload cannot be encoded.
    pub fn ok<T: Serialize + ?Sized>(payload: &T) -> Result<Self, HarnessError> {
        Self::json(200, payload)
    }

    /// Serves `body` verbatim with `status`.
    #[must_use]
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    fn violation(message: &str) -> Self {
        let body = serde_json::json!({ "error": format!("unexpected request: {message}") });
        Self::raw(VIOLATION_STATUS, body.to_string())
    }
}

/// A request expectation paired with its scripted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// What the request must look like.
    pub request: RequestExpectation,
    /// What the server answers when it does.
    pub response: ScriptedResponse,
}

impl Expectation {
    /// Pairs `request` with `response`.
    #[must_use]
    pub const fn new(request: RequestExpectation, response: ScriptedResponse) -> Self {
        Self { request, response }
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Path plus query string.
    pub path: String,
    /// Raw body decoded as UTF-8.
    pub body: String,
    /// Header names (lower case) and values in arrival order.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Returns the first value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for RecordedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.body.is_empty() {
            write!(f, " body={:?}", self.body)?;
        }
        Ok(())
    }
}

/// One field that differed between an expectation and a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    /// Field name, such as `method` or `header accept`.
    pub field: String,
    /// Expected value.
    pub expected: String,
    /// Observed value.
    pub actual: String,
}

impl Difference {
    fn new(field: impl Into<String>, expected: &str, actual: &str) -> Self {
        Self {
            field: field.into(),
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        }
    }
}

/// Field-by-field report of why a request did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// The differing fields in comparison order.
    pub differences: Vec<Difference>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, difference) in self.differences.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "{}: expected {:?}, got {:?}",
                difference.field, difference.expected, difference.actual
            )?;
        }
        Ok(())
    }
}

/// A request that broke the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A request arrived after every expectation was consumed.
    Unexpected {
        /// The offending request.
        request: RecordedRequest,
    },
    /// A request did not match the next expectation.
    Mismatched {
        /// The expectation that was consumed.
        expected: RequestExpectation,
        /// The offending request.
        request: RecordedRequest,
        /// Fields that differed.
        mismatch: Mismatch,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { request } => {
                write!(f, "{request} arrived with no expectations left")
            }
            Self::Mismatched {
                expected,
                request,
                mismatch,
            } => write!(f, "{request} did not match {expected}: {mismatch}"),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Expectation>,
    received: Vec<RecordedRequest>,
    violations: Vec<Violation>,
}

/// Ordered expectations shared between the server and the test.
///
/// Each incoming request pops the head of the queue and is compared against
/// it under a single lock, so concurrent requests consume distinct
/// expectations.
#[derive(Debug, Default)]
pub struct ExpectationQueue {
    state: Mutex<QueueState>,
}

impl ExpectationQueue {
    /// Creates a queue holding `expectations` in order.
    #[must_use]
    pub fn new<I>(expectations: I) -> Self
    where
        I: IntoIterator<Item = Expectation>,
    {
        Self {
            state: Mutex::new(QueueState {
                pending: expectations.into_iter().collect(),
                ..QueueState::default()
            }),
        }
    }

    /// Consumes the next expectation for `request` and returns the response
    /// to serve.
    ///
    /// Requests that find the queue empty, or that differ from the head, are
    /// recorded as violations and answered with status 500.
    pub fn handle(&self, request: RecordedRequest) -> ScriptedResponse {
        let mut state = self.lock();
        state.received.push(request.clone());
        let Some(next) = state.pending.pop_front() else {
            warn!(%request, "request arrived with no expectations left");
            let response = ScriptedResponse::violation(&request.to_string());
            state.violations.push(Violation::Unexpected { request });
            return response;
        };

        match next.request.check(&request) {
            Ok(()) => {
                debug!(%request, status = next.response.status(), "request matched");
                next.response
            }
            Err(mismatch) => {
                warn!(%request, expected = %next.request, %mismatch, "request mismatched");
                let response = ScriptedResponse::violation(&format!("{request} ({mismatch})"));
                state.violations.push(Violation::Mismatched {
                    expected: next.request,
                    request,
                    mismatch,
                });
                response
            }
        }
    }

    /// Expectations not consumed yet.
    #[must_use]
    pub fn pending(&self) -> Vec<Expectation> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Every request received so far.
    #[must_use]
    pub fn received(&self) -> Vec<RecordedRequest> {
        self.lock().received.clone()
    }

    /// Every violation recorded so far.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.lock().violations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
