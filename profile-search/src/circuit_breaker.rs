//! Per-collection circuit breaker.
//!
//! Tracks consecutive store failures per backing collection. A collection
//! that keeps failing is short-circuited to [`SearchError::Unavailable`]
//! without touching the store until a cooldown has elapsed, after which a
//! single probe query decides whether to close or re-open the circuit.
//!
//! A short-circuited collection is a failure of the whole search, never an
//! empty result: dropping one side would corrupt deduplication and ordering.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure             │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::error::SearchError;
use crate::types::Collection;

/// Circuit state for a single collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy; queries go through.
    Closed,
    /// Failing; queries are refused until the cooldown expires.
    Open,
    /// Cooldown elapsed; the next query is a probe.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct CollectionHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for CollectionHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Thresholds for tripping and recovering a collection's circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds an open circuit waits before allowing a probe.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

/// Whether `err` says something about the health of the store.
///
/// Caller mistakes (bad cursor, missing collection, missing permission)
/// and cancellations leave the circuit untouched.
pub fn counts_as_failure(err: &SearchError) -> bool {
    matches!(err, SearchError::Unavailable(_) | SearchError::Unknown(_))
}

/// Independent health tracking for each backing collection.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    collections: HashMap<Collection, CollectionHealth>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            collections: HashMap::new(),
        }
    }

    /// Record a successful query; closes the circuit.
    pub fn record_success(&mut self, collection: Collection) {
        let health = self.collections.entry(collection).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    /// Record a failed query; opens the circuit at the threshold.
    pub fn record_failure(&mut self, collection: Collection) {
        let health = self.collections.entry(collection).or_default();
        health.consecutive_failures += 1;
        health.last_failure_at = Some(Instant::now());

        if health.consecutive_failures >= self.config.failure_threshold {
            if health.state != CircuitState::Open {
                tracing::warn!(
                    %collection,
                    failures = health.consecutive_failures,
                    "collection circuit opened"
                );
            }
            health.state = CircuitState::Open;
        }
    }

    /// Whether a query against `collection` should be sent to the store.
    ///
    /// An open circuit whose cooldown has elapsed moves to
    /// [`CircuitState::HalfOpen`] and lets the probe through.
    pub fn should_attempt(&mut self, collection: Collection) -> bool {
        let cooldown_secs = self.config.cooldown_secs;
        let health = self.collections.entry(collection).or_default();

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed().as_secs() >= cooldown_secs);
                if cooled {
                    health.state = CircuitState::HalfOpen;
                }
                cooled
            }
        }
    }

    pub fn status(&self, collection: Collection) -> CircuitState {
        self.collections
            .get(&collection)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// `(collection, state, consecutive failures)` for every collection seen.
    pub fn health_report(&self) -> Vec<(Collection, CircuitState, u32)> {
        let mut report: Vec<_> = self
            .collections
            .iter()
            .map(|(c, h)| (*c, h.state, h.consecutive_failures))
            .collect();
        report.sort_by_key(|(c, _, _)| *c);
        report
    }

    pub fn reset(&mut self) {
        self.collections.clear();
    }
}
