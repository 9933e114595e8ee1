//! Scrape cycle execution.
//!
//! One cycle runs the builds sub-scrape and then the agents sub-scrape,
//! sequentially, and records the exporter's own health. Sub-scrape
//! failures are counted and logged but never escape the cycle.

mod engine;

pub use engine::{ScrapeEngine, ScrapeOutcome};

/// One of the independent upstream fetches that make up a scrape cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubScrape {
    Builds,
    Agents,
}

impl SubScrape {
    pub const ALL: [SubScrape; 2] = [SubScrape::Builds, SubScrape::Agents];

    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            SubScrape::Builds => "builds",
            SubScrape::Agents => "agents",
        }
    }
}

impl std::fmt::Display for SubScrape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
