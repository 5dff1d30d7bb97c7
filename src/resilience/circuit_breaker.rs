//! Three-state circuit breaker (C1).

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ResilienceError;

/// The three circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls fail fast without invoking the guarded function.
    Open,
    /// A single trial call is allowed through to probe recovery.
    HalfOpen,
}

/// Configuration for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures that trips the breaker open.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a half-open trial.
    pub reset_timeout: Duration,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// A circuit breaker guarding a single fallible operation.
///
/// `execute` re-evaluates the state before every call: an `Open` breaker
/// whose `reset_timeout` has elapsed becomes `HalfOpen` and lets exactly one
/// call through. A single success while `HalfOpen` closes the breaker and
/// zeroes the failure counter; a failure anywhere reopens it once the
/// threshold is reached.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Construct a new breaker in the `Closed` state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
            }),
        }
    }

    /// Current state, after re-evaluating an `Open` breaker's reset timeout.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.reevaluate(&mut inner);
        inner.state
    }

    fn reevaluate(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            let elapsed_enough = inner
                .last_failure_time
                .is_some_and(|t| t.elapsed() >= self.config.reset_timeout);
            if elapsed_enough {
                inner.state = CircuitState::HalfOpen;
            }
        }
    }

    /// Invoke `f` through the breaker.
    ///
    /// Returns [`ResilienceError::CircuitOpen`] without calling `f` if the
    /// breaker is (still) open. Otherwise invokes `f` and records the
    /// outcome: success closes the breaker and resets the failure counter;
    /// failure increments the counter and opens the breaker once the
    /// threshold is reached.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitCallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            self.reevaluate(&mut inner);
            if inner.state == CircuitState::Open {
                return Err(CircuitCallError::Open);
            }
        }

        match f().await {
            Ok(value) => {
                let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                Ok(value)
            }
            Err(err) => {
                let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                inner.failure_count += 1;
                inner.last_failure_time = Some(Instant::now());
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                }
                Err(CircuitCallError::Inner(err))
            }
        }
    }

    /// Unconditionally return to `Closed` with a zeroed failure counter.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_time = None;
    }
}

/// Outcome of a guarded call: either the breaker rejected it, or the inner
/// future ran and failed with `E`.
#[derive(Debug)]
pub enum CircuitCallError<E> {
    /// The breaker was open; `f` was never invoked.
    Open,
    /// `f` ran and returned this error.
    Inner(E),
}

impl<E> CircuitCallError<E> {
    /// True if the breaker rejected the call without running it.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitCallError::Open)
    }
}

impl From<CircuitCallError<ResilienceError>> for ResilienceError {
    fn from(value: CircuitCallError<ResilienceError>) -> Self {
        match value {
            CircuitCallError::Open => ResilienceError::CircuitOpen,
            CircuitCallError::Inner(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_until_threshold_reached() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(100),
        });

        for _ in 0..2 {
            let result: Result<(), CircuitCallError<&str>> =
                breaker.execute(|| async { Err("boom") }).await;
            assert!(matches!(result, Err(CircuitCallError::Inner(_))));
            assert_eq!(breaker.state(), CircuitState::Closed);
        }

        let result: Result<(), CircuitCallError<&str>> =
            breaker.execute(|| async { Err("boom") }).await;
        assert!(matches!(result, Err(CircuitCallError::Inner(_))));
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn open_breaker_fails_fast_without_invoking_fn() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(100),
        });

        let _: Result<(), CircuitCallError<&str>> = breaker.execute(|| async { Err("boom") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let invoked = std::sync::atomic::AtomicBool::new(false);
        let result: Result<(), CircuitCallError<&str>> = breaker
            .execute(|| async {
                invoked.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CircuitCallError::Open)));
        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn half_open_success_closes_and_resets_counter() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(100),
        });

        for _ in 0..3 {
            let _: Result<(), CircuitCallError<&str>> =
                breaker.execute(|| async { Err("boom") }).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let result: Result<&str, CircuitCallError<&str>> =
            breaker.execute(|| async { Ok("ok") }).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn reset_clears_state_unconditionally() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_secs(60),
        });
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
