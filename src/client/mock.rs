//! Scripted client for tests and local experiments.

use super::api::{BuildkiteApi, ClientError};
use super::model::{Agent, Build};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Scripted<T> = Result<Vec<T>, String>;

/// Mock client returning configurable responses.
///
/// Tracks how often each endpoint is called and the highest number of
/// calls observed in flight at once.
#[derive(Debug)]
pub struct MockClient {
    builds: Mutex<Scripted<Build>>,
    agents: Mutex<Scripted<Agent>>,
    latency: Duration,
    builds_calls: AtomicUsize,
    agents_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            builds: Mutex::new(Ok(Vec::new())),
            agents: Mutex::new(Ok(Vec::new())),
            latency: Duration::ZERO,
            builds_calls: AtomicUsize::new(0),
            agents_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns builds with the given raw states.
    pub fn with_builds(self, states: &[&str]) -> Self {
        self.set_builds(states);
        self
    }

    /// Returns `count` agents.
    pub fn with_agents(self, count: usize) -> Self {
        self.set_agents(count);
        self
    }

    /// Sleeps for `latency` inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_builds(&self, states: &[&str]) {
        *lock(&self.builds) = Ok(states.iter().map(|s| Build::with_state(*s)).collect());
    }

    pub fn set_agents(&self, count: usize) {
        *lock(&self.agents) = Ok(vec![Agent::default(); count]);
    }

    /// Makes subsequent build listings fail with `message`.
    pub fn fail_builds(&self, message: impl Into<String>) {
        *lock(&self.builds) = Err(message.into());
    }

    /// Makes subsequent agent listings fail with `message`.
    pub fn fail_agents(&self, message: impl Into<String>) {
        *lock(&self.agents) = Err(message.into());
    }

    pub fn builds_calls(&self) -> usize {
        self.builds_calls.load(Ordering::SeqCst)
    }

    pub fn agents_calls(&self) -> usize {
        self.agents_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls seen so far.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond<T: Clone>(&self, script: &Mutex<Scripted<T>>) -> Result<Vec<T>, ClientError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let result = lock(script).clone().map_err(ClientError::Unavailable);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl BuildkiteApi for MockClient {
    fn list_builds(&self, _org: &str) -> Result<Vec<Build>, ClientError> {
        self.builds_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.builds)
    }

    fn list_agents(&self, _org: &str) -> Result<Vec<Agent>, ClientError> {
        self.agents_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.agents)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
