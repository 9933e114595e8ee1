//! The exported metric set.

use super::{MetricsError, NAMESPACE};
use crate::client::BuildState;
use crate::scrape::SubScrape;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts};
use std::collections::BTreeMap;
use std::time::Duration;

/// Current values of every metric the exporter publishes.
///
/// Created once, zeroed, and mutated in place by the scrape engine. Callers
/// serialize access through the collector's lock.
pub struct MetricSnapshot {
    builds: IntGaugeVec,
    agents: IntGauge,
    up: IntGauge,
    last_scrape_error: IntGauge,
    last_scrape_duration: Gauge,
    scrapes_total: IntCounter,
    scrape_errors: IntCounterVec,
}

impl MetricSnapshot {
    /// Creates the metric set with all values zeroed.
    pub fn new() -> Result<Self, MetricsError> {
        let builds = IntGaugeVec::new(
            Opts::new("builds", "Number of builds by state.").namespace(NAMESPACE),
            &["state"],
        )?;
        let agents = IntGauge::with_opts(
            Opts::new("agents", "Number of agents.").namespace(NAMESPACE),
        )?;
        let up = IntGauge::with_opts(
            Opts::new("up", "Whether the last scrape of Buildkite completed.").namespace(NAMESPACE),
        )?;
        let last_scrape_error = IntGauge::with_opts(
            Opts::new(
                "last_scrape_error",
                "Whether the last scrape of builds from Buildkite resulted in an error (1 for error, 0 for success).",
            )
            .namespace(NAMESPACE),
        )?;
        let last_scrape_duration = Gauge::with_opts(
            Opts::new(
                "last_scrape_duration_seconds",
                "Duration of the last scrape of metrics from Buildkite.",
            )
            .namespace(NAMESPACE),
        )?;
        let scrapes_total = IntCounter::with_opts(
            Opts::new(
                "scrapes_total",
                "Total number of times Buildkite was scraped for metrics.",
            )
            .namespace(NAMESPACE),
        )?;
        let scrape_errors = IntCounterVec::new(
            Opts::new(
                "scrape_errors_total",
                "Total number of times an error occurred scraping Buildkite.",
            )
            .namespace(NAMESPACE),
            &["collector"],
        )?;

        // Both error series exist from the first collect on.
        for source in SubScrape::ALL {
            scrape_errors.with_label_values(&[source.as_label()]);
        }

        Ok(Self {
            builds,
            agents,
            up,
            last_scrape_error,
            last_scrape_duration,
            scrapes_total,
            scrape_errors,
        })
    }

    /// Drops every build series and re-creates one per state at zero.
    pub fn reset_builds(&self) {
        self.builds.reset();
        for state in BuildState::ALL {
            self.builds.with_label_values(&[state.as_label()]).set(0);
        }
    }

    pub fn record_build(&self, state: BuildState) {
        self.builds.with_label_values(&[state.as_label()]).inc();
    }

    pub fn set_agents(&self, count: usize) {
        self.agents.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn set_up(&self, up: bool) {
        self.up.set(i64::from(up));
    }

    pub fn set_last_scrape_error(&self, failed: bool) {
        self.last_scrape_error.set(i64::from(failed));
    }

    pub fn set_last_scrape_duration(&self, elapsed: Duration) {
        self.last_scrape_duration.set(elapsed.as_secs_f64());
    }

    pub fn inc_scrapes(&self) {
        self.scrapes_total.inc();
    }

    pub fn inc_scrape_errors(&self, source: SubScrape) {
        self.scrape_errors
            .with_label_values(&[source.as_label()])
            .inc();
    }

    /// Descriptors of every metric, in emission order.
    pub fn descs(&self) -> Vec<Desc> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.desc())
            .cloned()
            .collect()
    }

    /// Current samples of every metric.
    pub fn families(&self) -> Vec<MetricFamily> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.collect())
            .collect()
    }

    /// Reads the current values into plain data.
    pub fn values(&self) -> SnapshotValues {
        SnapshotValues {
            builds_by_state: label_values(&self.builds.collect(), "state", |m| {
                m.get_gauge().get_value() as i64
            }),
            agent_count: self.agents.get(),
            up: self.up.get() == 1,
            last_scrape_error: self.last_scrape_error.get() == 1,
            last_scrape_duration_seconds: self.last_scrape_duration.get(),
            scrapes_total: self.scrapes_total.get(),
            scrape_errors_total: label_values(&self.scrape_errors.collect(), "collector", |m| {
                m.get_counter().get_value() as u64
            }),
        }
    }

    fn collectors(&self) -> [&dyn Collector; 7] {
        [
            &self.builds,
            &self.scrape_errors,
            &self.agents,
            &self.last_scrape_duration,
            &self.scrapes_total,
            &self.last_scrape_error,
            &self.up,
        ]
    }
}

fn label_values<T>(
    families: &[MetricFamily],
    label: &str,
    value: impl Fn(&prometheus::proto::Metric) -> T,
) -> BTreeMap<String, T> {
    families
        .iter()
        .flat_map(|f| f.get_metric())
        .filter_map(|m| {
            m.get_label()
                .iter()
                .find(|l| l.get_name() == label)
                .map(|l| (l.get_value().to_string(), value(m)))
        })
        .collect()
}

/// Plain-data copy of a [`MetricSnapshot`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotValues {
    /// Build count per state label.
    pub builds_by_state: BTreeMap<String, i64>,
    /// Agents returned by the last successful fetch.
    pub agent_count: i64,
    /// Whether the last scrape cycle completed.
    pub up: bool,
    /// Whether the builds fetch failed on the last cycle.
    pub last_scrape_error: bool,
    pub last_scrape_duration_seconds: f64,
    pub scrapes_total: u64,
    /// Error count per sub-scrape label.
    pub scrape_errors_total: BTreeMap<String, u64>,
}

impl SnapshotValues {
    /// Build count for `state`, zero when the series is absent.
    pub fn builds(&self, state: BuildState) -> i64 {
        self.builds_by_state
            .get(state.as_label())
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all build states.
    pub fn total_builds(&self) -> i64 {
        self.builds_by_state.values().sum()
    }

    pub fn scrape_errors(&self, source: SubScrape) -> u64 {
        self.scrape_errors_total
            .get(source.as_label())
            .copied()
            .unwrap_or(0)
    }
}
