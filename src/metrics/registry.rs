//! Registry wiring and text exposition.

use super::{Exporter, MetricsError, NAMESPACE};
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

/// Registry holding the exporter collector and build information.
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    /// Registers `exporter` and the build info gauge.
    pub fn new(exporter: Exporter) -> Result<Self, MetricsError> {
        let registry = Registry::new();
        registry.register(Box::new(exporter))?;
        registry.register(Box::new(build_info()?))?;
        Ok(Self { registry })
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scrapes Buildkite and encodes all metrics in Prometheus text format.
    ///
    /// Blocks for the duration of the scrape cycle.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn build_info() -> Result<IntGaugeVec, MetricsError> {
    let info = IntGaugeVec::new(
        Opts::new(
            "build_info",
            "A metric with a constant '1' value labeled by version from which buildkite_exporter was built.",
        )
        .namespace(NAMESPACE),
        &["version"],
    )?;
    info.with_label_values(&[crate::VERSION]).set(1);
    Ok(info)
}
