//! Blocking HTTP client for the rack resource API.
//!
//! Requests carry form-encoded bodies and responses are JSON. Non-success
//! statuses are turned into [`ApiError`] values rather than transport errors so
//! the server's own message reaches the operator.

use std::time::Duration;

use rack_config::ApiBase;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use url::Url;
use url::form_urlencoded;

const COLLECTION: &str = "services";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("rack/", env!("CARGO_PKG_VERSION"));

/// A resource attached to the rack, for example a log drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
    /// Unique resource name.
    #[serde(default)]
    pub name: String,
    /// Resource kind, for example `syslog`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Lifecycle state such as `running` or `creating`.
    #[serde(default)]
    pub status: String,
    /// Connection URL reported by the backend, when any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Errors raised while talking to the rack API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the request with a message.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message reported by the server.
        message: String,
    },
    /// The server rejected the request without a usable message.
    #[error("unexpected response status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The request never completed.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: Box<ureq::Error>,
    },
    /// A successful response carried an unreadable body.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Target URL.
        url: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Form-encoded request body that preserves insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormBody {
    pairs: Vec<(String, String)>,
}

impl FormBody {
    /// Appends a key/value pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Encodes the pairs as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

/// Client bound to one rack API base URL.
pub struct ApiClient {
    base: ApiBase,
    agent: Agent,
}

impl ApiClient {
    /// Creates a client for `base`.
    #[must_use]
    pub fn new(base: ApiBase) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self { base, agent }
    }

    /// Lists every resource.
    pub fn list(&self) -> Result<Vec<Resource>, ApiError> {
        let url = self.base.endpoint(&[COLLECTION]);
        let body = self.send(Method::Get, &url, None)?;
        decode(&url, &body)
    }

    /// Fetches one resource by name.
    pub fn get(&self, name: &str) -> Result<Resource, ApiError> {
        let url = self.base.endpoint(&[COLLECTION, name]);
        let body = self.send(Method::Get, &url, None)?;
        decode(&url, &body)
    }

    /// Creates a resource; `name` is left to the server when absent.
    pub fn create(
        &self,
        kind: &str,
        name: Option<&str>,
        params: &[(String, String)],
    ) -> Result<Resource, ApiError> {
        let url = self.base.endpoint(&[COLLECTION]);
        let mut form = FormBody::default();
        if let Some(name) = name {
            form.push("name", name);
        }
        form.push("type", kind);
        for (key, value) in params {
            form.push(key.as_str(), value.as_str());
        }
        let body = self.send(Method::Post, &url, Some(&form))?;
        decode(&url, &body)
    }

    /// Updates the given parameters of a resource.
    pub fn update(&self, name: &str, params: &[(String, String)]) -> Result<Resource, ApiError> {
        let url = self.base.endpoint(&[COLLECTION, name]);
        let mut form = FormBody::default();
        for (key, value) in params {
            form.push(key.as_str(), value.as_str());
        }
        let body = self.send(Method::Put, &url, Some(&form))?;
        decode(&url, &body)
    }

    /// Deletes a resource.
    pub fn delete(&self, name: &str) -> Result<Resource, ApiError> {
        let url = self.base.endpoint(&[COLLECTION, name]);
        let body = self.send(Method::Delete, &url, None)?;
        decode(&url, &body)
    }

    fn send(&self, method: Method, url: &Url, form: Option<&FormBody>) -> Result<String, ApiError> {
        let target = url.as_str();
        debug!(method = method.as_str(), url = target, "sending request");
        let result = match method {
            Method::Get => self
                .agent
                .get(target)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Delete => self
                .agent
                .delete(target)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Post | Method::Put => {
                let encoded = form.map(FormBody::encode).unwrap_or_default();
                let builder = if matches!(method, Method::Post) {
                    self.agent.post(target)
                } else {
                    self.agent.put(target)
                };
                builder
                    .header("Accept", "application/json")
                    .header("User-Agent", USER_AGENT)
                    .header("Content-Type", FORM_CONTENT_TYPE)
                    .send(encoded.as_str())
            }
        };
        let mut response = result.map_err(|source| transport(target, source))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|source| transport(target, source))?;
        debug!(status, url = target, bytes = body.len(), "received response");

        if (200..300).contains(&status) {
            return Ok(body);
        }
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(error) => Err(ApiError::Server {
                status,
                message: error.error,
            }),
            Err(_) => Err(ApiError::Status { status }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

fn transport(url: &str, source: ureq::Error) -> ApiError {
    ApiError::Transport {
        url: url.to_owned(),
        source: Box::new(source),
    }
}

/// Decodes a JSON body, treating an empty body as the type's default.
fn decode<T>(url: &Url, body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}
