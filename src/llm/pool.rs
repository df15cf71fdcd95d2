//! Health bookkeeping for a pool of API keys.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Response times kept per key.
const RESPONSE_WINDOW: usize = 10;

/// Coarse state of a key, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Last request succeeded
    Healthy,
    /// Resting after a rate limit
    RateLimited,
    /// Last request failed
    Failed,
    /// Too many failures in a row
    CircuitOpen,
}

impl KeyStatus {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::RateLimited => "rate_limited",
            Self::Failed => "failed",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

/// Counters and timers of one key.
#[derive(Debug, Clone)]
pub struct KeyState {
    /// Position in the pool
    pub index: usize,
    /// Last known status
    pub status: KeyStatus,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Requests sent with this key
    pub total: u64,
    /// Requests that succeeded
    pub successful: u64,
    /// Rate limit expiry
    pub rate_limited_until: Option<Instant>,
    /// Circuit breaker expiry
    pub circuit_open_until: Option<Instant>,
    /// Latest response times
    pub response_times: VecDeque<Duration>,
}

impl KeyState {
    fn new(index: usize) -> Self {
        Self {
            index,
            status: KeyStatus::Healthy,
            consecutive_failures: 0,
            total: 0,
            successful: 0,
            rate_limited_until: None,
            circuit_open_until: None,
            response_times: VecDeque::with_capacity(RESPONSE_WINDOW),
        }
    }

    /// Share of successful requests, 1.0 for an unused key.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    /// Mean of the recent response times.
    #[must_use]
    pub fn average_response_time(&self) -> Duration {
        let count = u32::try_from(self.response_times.len()).unwrap_or(u32::MAX);
        if count == 0 {
            return Duration::ZERO;
        }
        self.response_times.iter().sum::<Duration>() / count
    }

    /// Whether the key may be used at `now`.
    ///
    /// A circuit whose window has passed is half-open: the key gets one more
    /// chance, and the next failure opens it again.
    #[must_use]
    pub fn is_healthy(&self, now: Instant, failure_threshold: u32) -> bool {
        if self.circuit_open_until.is_some_and(|until| until > now) {
            return false;
        }
        if self.rate_limited_until.is_some_and(|until| until > now) {
            return false;
        }
        self.consecutive_failures < failure_threshold || self.circuit_open_until.is_some()
    }
}

/// API keys plus their health.
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    states: Mutex<Vec<KeyState>>,
    failure_threshold: u32,
    circuit_open: Duration,
    rate_limit: Duration,
}

impl KeyPool {
    /// Creates a pool where every key starts healthy.
    #[must_use]
    pub fn new(
        keys: Vec<String>,
        failure_threshold: u32,
        circuit_open: Duration,
        rate_limit: Duration,
    ) -> Self {
        let states = (0..keys.len()).map(KeyState::new).collect();
        Self {
            keys,
            states: Mutex::new(states),
            failure_threshold: failure_threshold.max(1),
            circuit_open,
            rate_limit,
        }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the pool has no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The secret at `index`.
    #[must_use]
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    /// Whether the key at `index` may be used now.
    pub async fn is_healthy(&self, index: usize) -> bool {
        let now = Instant::now();
        self.states
            .lock()
            .await
            .get(index)
            .is_some_and(|state| state.is_healthy(now, self.failure_threshold))
    }

    /// Records a successful request.
    pub async fn record_success(&self, index: usize, elapsed: Duration) {
        let mut states = self.states.lock().await;
        let Some(state) = states.get_mut(index) else {
            return;
        };
        state.total += 1;
        state.successful += 1;
        state.consecutive_failures = 0;
        state.status = KeyStatus::Healthy;
        state.circuit_open_until = None;
        state.rate_limited_until = None;
        if state.response_times.len() == RESPONSE_WINDOW {
            state.response_times.pop_front();
        }
        state.response_times.push_back(elapsed);
    }

    /// Records a failed request and updates the breaker.
    pub async fn record_failure(&self, index: usize, message: &str) {
        let now = Instant::now();
        let mut states = self.states.lock().await;
        let Some(state) = states.get_mut(index) else {
            return;
        };
        state.total += 1;
        state.consecutive_failures += 1;

        let lowered = message.to_lowercase();
        if state.consecutive_failures >= self.failure_threshold {
            state.status = KeyStatus::CircuitOpen;
            state.circuit_open_until = Some(now + self.circuit_open);
            warn!(
                "Key {} opened its circuit after {} failures",
                index + 1,
                state.consecutive_failures
            );
        } else if lowered.contains("rate limit") || lowered.contains("429") {
            state.status = KeyStatus::RateLimited;
            state.rate_limited_until = Some(now + self.rate_limit);
        } else {
            state.status = KeyStatus::Failed;
        }
    }

    /// Copy of every key's state.
    pub async fn snapshot(&self) -> Vec<KeyState> {
        self.states.lock().await.clone()
    }
}
