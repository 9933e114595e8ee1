//! Buildkite Prometheus Exporter
//!
//! Polls the Buildkite REST API whenever Prometheus pulls the metrics
//! endpoint and republishes build and agent counts together with the
//! exporter's own scrape health.
//!
//! # Architecture
//!
//! ```text
//! GET /metrics → Registry::gather → Exporter::collect (locked)
//!                                        ↓
//!                       ScrapeEngine::run → builds, agents
//!                                        ↓
//!                                  MetricSnapshot
//! ```
//!
//! # Design Principles
//!
//! - **One scrape per pull**: no caching between pulls; the next pull is the retry
//! - **Serialized scrapes**: a single lock covers the whole cycle
//! - **Failure is data**: upstream errors show up in `last_scrape_error` and
//!   `scrape_errors_total`, never as a failed metrics response
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use buildkite_exporter::{
//!     client::HttpClient,
//!     config::{ExporterConfig, FileConfig},
//!     metrics::{Exporter, MetricsRegistry},
//! };
//!
//! let mut file = FileConfig::default();
//! file.buildkite.token = "bkua_...".to_string();
//! file.buildkite.orgname = "my-org".to_string();
//! let config = ExporterConfig::new(file).unwrap();
//!
//! let client = HttpClient::new(&config.buildkite).unwrap();
//! let exporter = Exporter::new(Arc::new(client), config.buildkite.orgname.clone()).unwrap();
//! let registry = MetricsRegistry::new(exporter).unwrap();
//!
//! println!("{}", registry.encode().unwrap());
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scrape;

// Re-export commonly used types at crate root
pub use client::{BuildState, BuildkiteApi, HttpClient, MockClient};
pub use config::ExporterConfig;
pub use error::Error;
pub use metrics::{Exporter, MetricsRegistry, MetricsServer};
pub use scrape::{ScrapeEngine, SubScrape};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
