//! Validation of the configured API host.
//!
//! The client appends resource paths to this base, so it has to be an
//! absolute HTTP(S) URL. A trailing slash is tolerated.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Parsed API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    url: Url,
}

impl ApiBase {
    /// Builds the absolute URL for a sequence of path segments.
    ///
    /// Segments are percent-encoded individually, so resource names containing
    /// `/` or spaces stay within a single segment.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    /// Underlying URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.url.as_str().trim_end_matches('/'))
    }
}

impl FromStr for ApiBase {
    type Err = HostError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(value).map_err(|source| HostError::Invalid {
            host: value.to_owned(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HostError::UnsupportedScheme {
                    host: value.to_owned(),
                    scheme: other.to_owned(),
                });
            }
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(HostError::UnexpectedComponents {
                host: value.to_owned(),
            });
        }
        Ok(Self { url })
    }
}

/// Errors raised while validating the API host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host was not a URL at all.
    #[error("invalid API host '{host}': {source}")]
    Invalid {
        /// Host as configured.
        host: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The host used a scheme other than HTTP(S).
    #[error("API host '{host}' uses unsupported scheme '{scheme}'")]
    UnsupportedScheme {
        /// Host as configured.
        host: String,
        /// Offending scheme.
        scheme: String,
    },
    /// The host carried a query string or fragment.
    #[error("API host '{host}' must not contain a query or fragment")]
    UnexpectedComponents {
        /// Host as configured.
        host: String,
    },
}
