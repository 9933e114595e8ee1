//! Client contract and error type.

use super::model::{Agent, Build};
use thiserror::Error;

/// Errors that can occur while talking to the Buildkite API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to set up HTTP client: {0}")]
    Setup(String),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the Buildkite API used by the scrape engine.
///
/// Implementations are shared between concurrent collects and must be
/// safe to call from any thread. Each call is a single attempt; retrying
/// is left to the next scrape.
pub trait BuildkiteApi: Send + Sync {
    /// Lists builds for an organization.
    fn list_builds(&self, org: &str) -> Result<Vec<Build>, ClientError>;

    /// Lists agents for an organization.
    fn list_agents(&self, org: &str) -> Result<Vec<Agent>, ClientError>;
}
