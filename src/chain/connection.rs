//! Connection resilience for NEAR JSON-RPC calls
//!
//! This module provides:
//! - Exponential backoff retry logic for transport failures
//! - Circuit breaker pattern to stop hammering an unreachable endpoint
//! - Request rate limiting so proposal scans cannot flood a public RPC node

use backoff::{future::retry, Error as BackoffError, ExponentialBackoff, ExponentialBackoffBuilder};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chain::Error as ChainError;
use crate::core::constants::DEFAULT_RATE_LIMIT_PER_SECOND;

/// Maximum number of retry attempts for RPC operations
pub const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds
pub const INITIAL_RETRY_DELAY_MS: u64 = 100;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Maximum retry elapsed time in seconds
pub const MAX_RETRY_ELAPSED_SECS: u64 = 30;

/// Circuit breaker failure threshold
pub const CIRCUIT_BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// Circuit breaker reset timeout in seconds
pub const CIRCUIT_BREAKER_RESET_TIMEOUT_SECS: u64 = 30;

/// Per-request HTTP timeout
pub const RPC_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    /// Requests flow through
    Closed,
    /// Requests fail fast until the reset timeout elapses
    Open,
    /// Probing: successes close the circuit, a failure reopens it
    HalfOpen,
}

/// Successes needed in `HalfOpen` before the circuit closes again
const HALF_OPEN_PROBES: u32 = 2;

#[derive(Debug)]
struct BreakerState {
    state: CircuitBreakerState,
    consecutive_failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

/// Trips after repeated transport failures against one RPC endpoint
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerState>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(
            CIRCUIT_BREAKER_FAILURE_THRESHOLD,
            CIRCUIT_BREAKER_RESET_TIMEOUT_SECS,
        )
    }

    pub fn with_config(failure_threshold: u32, reset_timeout_secs: u64) -> Self {
        Self::with_reset_timeout(failure_threshold, Duration::from_secs(reset_timeout_secs))
    }

    pub fn with_reset_timeout(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerState {
                state: CircuitBreakerState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
        }
    }

    /// Whether a request may be sent now. An open circuit whose reset
    /// timeout has elapsed moves to `HalfOpen`.
    pub async fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitBreakerState::Closed | CircuitBreakerState::HalfOpen => true,
            CircuitBreakerState::Open => {
                let cooled_down = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.reset_timeout);
                if cooled_down {
                    inner.state = CircuitBreakerState::HalfOpen;
                    inner.probe_successes = 0;
                    info!(endpoint_state = "half-open", "probing RPC endpoint");
                }
                cooled_down
            }
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitBreakerState::Closed => inner.consecutive_failures = 0,
            CircuitBreakerState::HalfOpen => {
                inner.probe_successes += 1;
                if inner.probe_successes >= HALF_OPEN_PROBES {
                    inner.state = CircuitBreakerState::Closed;
                    inner.consecutive_failures = 0;
                    inner.probe_successes = 0;
                    inner.opened_at = None;
                    info!("RPC endpoint recovered, circuit closed");
                }
            }
            CircuitBreakerState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;
        match inner.state {
            CircuitBreakerState::Closed if inner.consecutive_failures >= self.failure_threshold => {
                inner.state = CircuitBreakerState::Open;
                inner.opened_at = Some(Instant::now());
                error!(
                    failures = inner.consecutive_failures,
                    "RPC endpoint failing, circuit opened"
                );
            }
            CircuitBreakerState::HalfOpen => {
                inner.state = CircuitBreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_successes = 0;
                warn!("probe failed, circuit reopened");
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitBreakerState {
        self.inner.lock().await.state
    }

    /// Failures since the last success
    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }

    /// Close the circuit regardless of recent failures
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitBreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.probe_successes = 0;
        inner.opened_at = None;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry configuration for RPC operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_elapsed_secs: u64,
}

impl RetryConfig {
    /// A configuration that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Build the backoff schedule for this configuration
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_delay_ms))
            .with_max_interval(Duration::from_millis(self.max_delay_ms))
            .with_max_elapsed_time(Some(Duration::from_secs(self.max_elapsed_secs)))
            .build()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay_ms: INITIAL_RETRY_DELAY_MS,
            max_delay_ms: MAX_RETRY_DELAY_MS,
            max_elapsed_secs: MAX_RETRY_ELAPSED_SECS,
        }
    }
}

/// Build a direct rate limiter allowing `per_second` requests
pub fn rate_limiter(per_second: u32) -> DefaultDirectRateLimiter {
    let per_second = NonZeroU32::new(per_second)
        .or(NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_SECOND))
        .unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(per_second))
}

/// Run `operation` under the circuit breaker, retrying transient failures.
///
/// Permanent errors (contract panics, decoding failures) are returned
/// immediately; at most `config.max_retries` retries are attempted.
pub async fn execute_with_retry<F, Fut, T>(
    breaker: &CircuitBreaker,
    config: &RetryConfig,
    operation: F,
) -> Result<T, ChainError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ChainError>>,
{
    let attempts = &AtomicU32::new(0);
    let operation = &operation;

    retry(config.backoff(), || async move {
        if !breaker.can_execute().await {
            return Err(BackoffError::permanent(ChainError::CircuitOpen));
        }

        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        match operation().await {
            Ok(value) => {
                breaker.record_success().await;
                Ok(value)
            }
            Err(e) if e.is_transient() => {
                breaker.record_failure().await;
                if attempt >= config.max_retries {
                    warn!(attempt, "RPC operation failed, giving up: {}", e);
                    Err(BackoffError::permanent(e))
                } else {
                    debug!(attempt, "RPC operation failed, retrying: {}", e);
                    Err(BackoffError::transient(e))
                }
            }
            Err(e) => Err(BackoffError::permanent(e)),
        }
    })
    .await
}
