//! One scrape cycle: builds, then agents, then health bookkeeping.

use super::SubScrape;
use crate::client::{BuildkiteApi, ClientError};
use crate::metrics::MetricSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a single scrape cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOutcome {
    /// Builds counted, or `None` if the builds fetch failed.
    pub builds: Option<usize>,
    /// Agents counted, or `None` if the agents fetch failed.
    pub agents: Option<usize>,
    pub elapsed: Duration,
}

impl ScrapeOutcome {
    /// True when both sub-scrapes succeeded.
    pub fn is_clean(&self) -> bool {
        self.builds.is_some() && self.agents.is_some()
    }
}

/// Runs scrape cycles against one organization and records the results
/// into a [`MetricSnapshot`].
///
/// The engine does no locking of its own; the caller must ensure that only
/// one cycle runs at a time.
pub struct ScrapeEngine {
    client: Arc<dyn BuildkiteApi>,
    org: String,
    snapshot: MetricSnapshot,
}

impl ScrapeEngine {
    pub fn new(client: Arc<dyn BuildkiteApi>, org: impl Into<String>, snapshot: MetricSnapshot) -> Self {
        Self {
            client,
            org: org.into(),
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &MetricSnapshot {
        &self.snapshot
    }

    /// Executes one scrape cycle.
    ///
    /// Expects the build counts to have been reset by the caller. The agents
    /// sub-scrape runs even when the builds sub-scrape fails, and only the
    /// builds result feeds `last_scrape_error`.
    pub fn run(&self) -> ScrapeOutcome {
        self.snapshot.inc_scrapes();
        let begun = Instant::now();

        let builds = self.scrape_builds();
        let agents = self.scrape_agents();

        self.snapshot.set_up(true);
        let elapsed = begun.elapsed();
        self.snapshot.set_last_scrape_duration(elapsed);
        self.snapshot.set_last_scrape_error(builds.is_err());

        let outcome = ScrapeOutcome {
            builds: builds.ok(),
            agents: agents.ok(),
            elapsed,
        };
        tracing::debug!(
            org = %self.org,
            builds = ?outcome.builds,
            agents = ?outcome.agents,
            elapsed_ms = elapsed.as_millis() as u64,
            "Scrape cycle finished"
        );
        outcome
    }

    fn scrape_builds(&self) -> Result<usize, ClientError> {
        let builds = self
            .client
            .list_builds(&self.org)
            .inspect_err(|e| self.record_failure(SubScrape::Builds, e))?;

        for build in &builds {
            let state = build.state();
            if state.is_unknown() {
                tracing::warn!(
                    collector = %SubScrape::Builds,
                    state = %build.state,
                    "Unrecognised build state, counting as unknown"
                );
            }
            self.snapshot.record_build(state);
        }
        Ok(builds.len())
    }

    fn scrape_agents(&self) -> Result<usize, ClientError> {
        let agents = self
            .client
            .list_agents(&self.org)
            .inspect_err(|e| self.record_failure(SubScrape::Agents, e))?;

        self.snapshot.set_agents(agents.len());
        Ok(agents.len())
    }

    fn record_failure(&self, source: SubScrape, error: &ClientError) {
        self.snapshot.inc_scrape_errors(source);
        tracing::error!(collector = %source, error = %error, "Scrape failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BuildState, MockClient};
    use proptest::prelude::*;

    fn engine(client: &Arc<MockClient>) -> ScrapeEngine {
        ScrapeEngine::new(
            Arc::clone(client) as Arc<dyn BuildkiteApi>,
            "acme",
            MetricSnapshot::new().unwrap(),
        )
    }

    fn cycle(engine: &ScrapeEngine) -> ScrapeOutcome {
        engine.snapshot().reset_builds();
        engine.run()
    }

    #[test]
    fn test_counts_builds_and_agents() {
        let client = Arc::new(
            MockClient::new()
                .with_builds(&["passed", "passed", "failed"])
                .with_agents(3),
        );
        let engine = engine(&client);

        let outcome = cycle(&engine);
        assert!(outcome.is_clean());
        assert_eq!(outcome.builds, Some(3));

        let values = engine.snapshot().values();
        assert_eq!(values.builds(BuildState::Passed), 2);
        assert_eq!(values.builds(BuildState::Failed), 1);
        assert_eq!(values.total_builds(), 3);
        assert_eq!(values.agent_count, 3);
        assert!(!values.last_scrape_error);
        assert!(values.up);
    }

    #[test]
    fn test_builds_failure_still_scrapes_agents() {
        let client = Arc::new(MockClient::new().with_agents(5));
        client.fail_builds("connection reset");
        let engine = engine(&client);

        let outcome = cycle(&engine);
        assert_eq!(outcome.builds, None);
        assert_eq!(outcome.agents, Some(5));
        assert_eq!(client.agents_calls(), 1);

        let values = engine.snapshot().values();
        assert!(values.last_scrape_error);
        assert!(values.up);
        assert_eq!(values.agent_count, 5);
        assert_eq!(values.total_builds(), 0);
        assert_eq!(values.scrape_errors(SubScrape::Builds), 1);
        assert_eq!(values.scrape_errors(SubScrape::Agents), 0);
    }

    #[test]
    fn test_agents_failure_keeps_stale_count_and_clear_error_flag() {
        let client = Arc::new(MockClient::new().with_builds(&["running"]).with_agents(4));
        let engine = engine(&client);
        cycle(&engine);

        client.fail_agents("HTTP 502");
        let outcome = cycle(&engine);
        assert_eq!(outcome.agents, None);

        let values = engine.snapshot().values();
        assert_eq!(values.agent_count, 4);
        assert_eq!(values.scrape_errors(SubScrape::Agents), 1);
        assert!(!values.last_scrape_error);
    }

    #[test]
    fn test_unknown_state_is_bucketed() {
        let client = Arc::new(MockClient::new().with_builds(&["passed", "levitating"]));
        let engine = engine(&client);
        cycle(&engine);

        let values = engine.snapshot().values();
        assert_eq!(values.builds(BuildState::Unknown), 1);
        assert_eq!(values.builds(BuildState::Passed), 1);
        assert_eq!(values.total_builds(), 2);
        assert!(!values.last_scrape_error);
    }

    #[test]
    fn test_error_flag_clears_after_recovery() {
        let client = Arc::new(MockClient::new());
        client.fail_builds("timeout");
        let engine = engine(&client);

        cycle(&engine);
        assert!(engine.snapshot().values().last_scrape_error);

        client.set_builds(&["scheduled"]);
        cycle(&engine);
        let values = engine.snapshot().values();
        assert!(!values.last_scrape_error);
        assert_eq!(values.scrapes_total, 2);
        assert_eq!(values.scrape_errors(SubScrape::Builds), 1);
    }

    #[test]
    fn test_duration_covers_both_sub_scrapes() {
        let client = Arc::new(MockClient::new().with_latency(Duration::from_millis(20)));
        let engine = engine(&client);

        let outcome = cycle(&engine);
        assert!(outcome.elapsed >= Duration::from_millis(40));
        assert!(engine.snapshot().values().last_scrape_duration_seconds >= 0.04);
    }

    const LABELS: &[&str] = &[
        "running", "scheduled", "passed", "failed", "blocked", "canceled", "canceling",
        "skipped", "not_run", "finished", "bogus", "PASSED",
    ];

    proptest! {
        #[test]
        fn prop_builds_sum_matches_fetch(
            states in proptest::collection::vec(proptest::sample::select(LABELS), 0..64),
        ) {
            let client = Arc::new(MockClient::new().with_builds(&states));
            let engine = engine(&client);

            // A second cycle must not accumulate on top of the first.
            cycle(&engine);
            cycle(&engine);

            let values = engine.snapshot().values();
            prop_assert_eq!(values.total_builds(), states.len() as i64);
            for state in BuildState::ALL {
                let expected = states
                    .iter()
                    .filter(|s| BuildState::from_label(s) == state)
                    .count() as i64;
                prop_assert_eq!(values.builds(state), expected);
            }
        }
    }
}
