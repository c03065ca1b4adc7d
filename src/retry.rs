use std::{fmt::Display, future::Future, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, warn};

/// Last error of a retried operation and how many attempts were made.
#[derive(Debug, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryError<E> {
    pub attempts: u32,
    pub error: E,
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempts run out. The last error is returned together with
    /// the number of attempts made.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        what: &str,
        mut op: F,
        retryable: R,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(what, attempt, error = %e, "giving up");
                    return Err(RetryError {
                        attempts: attempt,
                        error: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn succeeds_after_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = fast(5)
            .run(
                "flaky",
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(format!("attempt {n}"))
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_when_attempts_run_out() {
        let calls = AtomicU32::new(0);
        let err = fast(3)
            .run(
                "always failing",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("nope".to_string())
                },
                |_| true,
            )
            .await
            .unwrap_err();
        assert_eq!(err.error, "nope");
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "nope (after 3 attempt(s))");
    }

    #[tokio::test]
    async fn non_retryable_error_is_returned_at_once() {
        let calls = AtomicU32::new(0);
        let err = fast(5)
            .run(
                "fatal",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("fatal".to_string())
                },
                |e: &String| e != "fatal",
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
