//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::client::ApiError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Host(#[from] rack_config::HostError),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid option '{0}', expected --key=value")]
    InvalidOption(String),
    #[error("option '--{0}' is missing a value")]
    MissingOptionValue(String),
    #[error("no options to update")]
    NothingToUpdate,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to read confirmation: {0}")]
    ReadConfirmation(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
