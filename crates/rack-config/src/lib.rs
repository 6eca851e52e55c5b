//! Shared configuration for the Rack command-line client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `RACK_CONFIG_PATH`), then `RACK_*`
//! environment variables, and finally command-line flags. The harness skips
//! the loader entirely and hands a [`Config`] straight to the CLI, which is how
//! scenarios point the client at a mock service without touching process
//! state.

mod defaults;
mod host;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, default_host, default_log_filter, default_log_format,
};
pub use host::{ApiBase, HostError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the CLI binary and the test harness.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RACK")]
pub struct Config {
    /// Base URL of the Rack API, for example `https://rack.example.com`.
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// Tracing filter expression applied to client diagnostics.
    #[ortho_config(default = defaults::default_log_filter())]
    pub log_filter: String,
    /// Output format for client diagnostics.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Returns a copy of the configuration pointed at another API host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Configured API host as written.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// Parses and validates the configured API host.
    pub fn api_base(&self) -> Result<ApiBase, HostError> {
        self.host.parse()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Diagnostic output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
