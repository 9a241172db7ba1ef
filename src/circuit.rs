//! Three-state circuit breaker with jittered exponential backoff.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub base_cooldown: Duration,
    pub max_cooldown: Duration,
    pub jitter_ratio: f64,
    pub half_open_max_concurrent: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            base_cooldown: Duration::from_millis(10_000),
            max_cooldown: Duration::from_millis(120_000),
            jitter_ratio: 0.2,
            half_open_max_concurrent: 1,
        }
    }
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    open_count: u32,
    open_until: Option<Instant>,
    half_open_in_flight: u32,
}

/// Serializes every state transition behind a single async mutex: no
/// transition is ever observed half-applied.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                open_count: 0,
                open_until: None,
                half_open_in_flight: 0,
            }),
        }
    }

    pub async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        if inner.state != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            inner.half_open_in_flight = 0;
        }
    }

    pub async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;
        match inner.state {
            CircuitState::Closed if inner.consecutive_failures >= self.config.failure_threshold => {
                self.trip(&mut inner);
            }
            CircuitState::HalfOpen => {
                self.trip(&mut inner);
            }
            _ => {}
        }
    }

    pub async fn on_non_retryable(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
    }

    /// Returns the number of milliseconds the caller must wait before
    /// attempting a request; `0` means proceed immediately.
    pub async fn before_request(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => 0,
            CircuitState::Open => {
                let now = Instant::now();
                let until = inner.open_until.unwrap_or(now);
                if now >= until {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 0;
                    0
                } else {
                    (until - now).as_millis() as u64
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_max_concurrent {
                    200
                } else {
                    inner.half_open_in_flight += 1;
                    0
                }
            }
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Milliseconds remaining until the breaker leaves `Open`, or `0` if
    /// not currently open.
    pub async fn remaining_cooldown_ms(&self) -> u64 {
        let inner = self.inner.lock().await;
        match (inner.state, inner.open_until) {
            (CircuitState::Open, Some(until)) => {
                let now = Instant::now();
                if until > now {
                    (until - now).as_millis() as u64
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    /// Trip to Open and compute the next cooldown deadline. Caller must
    /// hold the lock.
    fn trip(&self, inner: &mut Inner) {
        inner.open_count += 1;
        inner.state = CircuitState::Open;
        let base_ms = self.config.base_cooldown.as_millis() as f64
            * 2f64.powi(inner.open_count as i32 - 1);
        let base_ms = base_ms.min(self.config.max_cooldown.as_millis() as f64);
        let jitter = base_ms * self.config.jitter_ratio;
        let delta = if jitter > 0.0 {
            rand::rng().random_range(-jitter..=jitter)
        } else {
            0.0
        };
        let delay_ms = (base_ms + delta).max(0.0) as u64;
        inner.open_until = Some(Instant::now() + Duration::from_millis(delay_ms));
        inner.consecutive_failures = 0;
        inner.half_open_in_flight = 0;
    }
}
