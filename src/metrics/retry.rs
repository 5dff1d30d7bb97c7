//! Bounded retry with exponential backoff (C2).

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Configuration for [`with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of invocations of the guarded function (at least 1).
    pub max_attempts: u32,
    /// Base delay; wait between attempt `n` and `n+1` is `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
    /// Hard cap on the computed backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// `max_attempts` invocations all failed; carries the last error.
    #[error("retry exhausted after {attempts} attempt(s)")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        source: E,
    },
    /// The cancellation token fired while waiting between attempts.
    #[error("cancelled")]
    Cancelled,
}

/// Invoke `f` up to `config.max_attempts` times, waiting an exponentially
/// growing delay (capped at `config.max_delay`) between attempts. If
/// `cancel` fires while waiting, the wait is short-circuited and
/// [`RetryError::Cancelled`] is returned immediately.
pub async fn with_retry<F, Fut, T, E>(
    mut f: F,
    config: RetryConfig,
    cancel: Option<&CancellationToken>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                if attempt == max_attempts {
                    break;
                }

                let delay = backoff_delay(config, attempt);
                if let Some(token) = cancel {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = token.cancelled() => return Err(RetryError::Cancelled),
                    }
                } else {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // Safety of `expect`: the loop above always assigns `last_err` before
    // breaking out on the final attempt.
    Err(RetryError::Exhausted {
        attempts: max_attempts,
        source: last_err.expect("at least one attempt recorded an error"),
    })
}

fn backoff_delay(config: RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let millis = config
        .base_delay
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
        .saturating_mul(multiplier);
    Duration::from_millis(millis).min(config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<_, RetryError<&str>> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>("ok")
            },
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            },
            None,
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_exhausts() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("fail")
            },
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            },
            None,
        )
        .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_wait() {
        let token = CancellationToken::new();
        token.cancel();
        let result = with_retry(
            || async { Err::<(), _>("fail") },
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
            },
            Some(&token),
        )
        .await;
        assert!(matches!(result, Err(RetryError::Cancelled)));
    }
}
