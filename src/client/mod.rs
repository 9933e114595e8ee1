//! Buildkite REST API access.
//!
//! The exporter only needs two read operations per scrape cycle: list the
//! builds of an organization and list its agents. [`BuildkiteApi`] captures
//! that contract so the scrape engine can run against the real HTTP client
//! or against [`MockClient`] in tests.

mod api;
mod http;
mod mock;
mod model;

pub use api::{BuildkiteApi, ClientError};
pub use http::HttpClient;
pub use mock::MockClient;
pub use model::{Agent, Build, BuildState};
