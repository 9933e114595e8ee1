//! Wire types returned by the list endpoints.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a build as reported by Buildkite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildState {
    Running,
    Scheduled,
    Passed,
    Failed,
    Blocked,
    Canceled,
    Canceling,
    Skipped,
    NotRun,
    Finished,
    /// Any state string outside the known set.
    Unknown,
}

impl BuildState {
    /// Every state the exporter pre-seeds on each scrape, `Unknown` last.
    pub const ALL: [BuildState; 11] = [
        BuildState::Running,
        BuildState::Scheduled,
        BuildState::Passed,
        BuildState::Failed,
        BuildState::Blocked,
        BuildState::Canceled,
        BuildState::Canceling,
        BuildState::Skipped,
        BuildState::NotRun,
        BuildState::Finished,
        BuildState::Unknown,
    ];

    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildState::Running => "running",
            BuildState::Scheduled => "scheduled",
            BuildState::Passed => "passed",
            BuildState::Failed => "failed",
            BuildState::Blocked => "blocked",
            BuildState::Canceled => "canceled",
            BuildState::Canceling => "canceling",
            BuildState::Skipped => "skipped",
            BuildState::NotRun => "not_run",
            BuildState::Finished => "finished",
            BuildState::Unknown => "unknown",
        }
    }

    /// Parses an API state string. Unrecognised values map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| *s != BuildState::Unknown && s.as_label() == label)
            .unwrap_or(BuildState::Unknown)
    }

    /// Returns true for states outside the known set.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, BuildState::Unknown)
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A build entry from `GET /organizations/{org}/builds`.
///
/// Only the fields the exporter reads are modelled; the rest of the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    /// Raw state string, kept verbatim so unknown values can be logged.
    #[serde(default)]
    pub state: String,
}

impl Build {
    /// Creates a build with only a state set.
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            id: None,
            number: None,
            state: state.into(),
        }
    }

    /// Returns the parsed build state.
    pub fn state(&self) -> BuildState {
        BuildState::from_label(&self.state)
    }
}

/// An agent entry from `GET /organizations/{org}/agents`.
///
/// Agents are only counted, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub connection_state: Option<String>,
}
