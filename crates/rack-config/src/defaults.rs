use crate::logging::LogFormat;

/// API host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "https://localhost";

/// Default log filter expression used by the binaries.
///
/// The CLI shares stderr with error messages, so only warnings surface unless
/// the operator asks for more.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Owned default host, used where allocation is required (e.g. serde).
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
