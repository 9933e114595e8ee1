//! Prometheus collector that scrapes Buildkite on every pull.

use super::{MetricSnapshot, MetricsError, SnapshotValues};
use crate::client::BuildkiteApi;
use crate::scrape::ScrapeEngine;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use std::sync::{Arc, Mutex, MutexGuard};

/// Buildkite exporter collector.
///
/// Each [`Collector::collect`] call runs one live scrape cycle under an
/// exclusive lock, so concurrent pulls are fully serialized and never see
/// a half-updated build breakdown.
pub struct Exporter {
    engine: Mutex<ScrapeEngine>,
    descs: Vec<Desc>,
}

impl Exporter {
    /// Creates a collector scraping `org` through `client`.
    pub fn new(client: Arc<dyn BuildkiteApi>, org: impl Into<String>) -> Result<Self, MetricsError> {
        let snapshot = MetricSnapshot::new()?;
        let descs = snapshot.descs();
        Ok(Self {
            engine: Mutex::new(ScrapeEngine::new(client, org, snapshot)),
            descs,
        })
    }

    /// Reads the current values without scraping.
    pub fn values(&self) -> SnapshotValues {
        self.lock().snapshot().values()
    }

    fn lock(&self) -> MutexGuard<'_, ScrapeEngine> {
        // A panic mid-cycle leaves the guard poisoned. The next cycle resets
        // the build breakdown before counting, so the state is usable.
        self.engine.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Previous scrape panicked, recovering collector lock");
            self.engine.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let engine = self.lock();

        engine.snapshot().reset_builds();
        engine.run();

        engine.snapshot().families()
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("descs", &self.descs.len())
            .finish()
    }
}
