//! Top-level error type for exporter startup.

use crate::client::ClientError;
use crate::config::ConfigError;
use crate::metrics::{MetricsError, ServerError};
use thiserror::Error;

/// Errors that stop the exporter from starting or serving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to create Buildkite client: {0}")]
    Client(#[from] ClientError),
    #[error("failed to set up metrics: {0}")]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
