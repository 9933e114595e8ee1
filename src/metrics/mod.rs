//! Prometheus exporter for Buildkite.
//!
//! Every pull of the metrics endpoint triggers one live scrape of the
//! Buildkite API. The [`Exporter`] collector serializes those scrapes and
//! republishes the results under the `buildkite` namespace.
//!
//! # Metrics Exposed
//!
//! ## Upstream Metrics
//! - `buildkite_builds{state}` - Builds per state, every state pre-seeded at 0
//! - `buildkite_agents` - Agents registered to the organization
//!
//! ## Scrape Health
//! - `buildkite_up` - 1 once a scrape cycle has completed
//! - `buildkite_last_scrape_error` - 1 if the builds fetch failed last cycle
//! - `buildkite_last_scrape_duration_seconds` - Duration of the last cycle
//! - `buildkite_scrapes_total` - Scrape cycles attempted
//! - `buildkite_scrape_errors_total{collector}` - Failures per sub-scrape
//!
//! ## Build Information
//! - `buildkite_build_info{version}` - Constant 1
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use buildkite_exporter::client::MockClient;
//! use buildkite_exporter::metrics::{Exporter, MetricsRegistry};
//!
//! let client = Arc::new(MockClient::new().with_builds(&["passed"]).with_agents(2));
//! let exporter = Exporter::new(client, "my-org").expect("Failed to create exporter");
//! let registry = MetricsRegistry::new(exporter).expect("Failed to create registry");
//!
//! println!("{}", registry.encode().expect("Failed to encode"));
//! ```

mod collector;
mod registry;
mod server;
mod snapshot;

pub use collector::Exporter;
pub use registry::MetricsRegistry;
pub use server::{landing_page, MetricsServer, ServerError};
pub use snapshot::{MetricSnapshot, SnapshotValues};

use thiserror::Error;

/// Namespace prefixed to every scraped metric.
pub const NAMESPACE: &str = "buildkite";

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}
