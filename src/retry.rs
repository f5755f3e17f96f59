use std::time::Duration;
use tracing::{error, warn};

/// Markers that identify the provider's anti-bot block page. The connector
/// surfaces the leading bytes of unparseable bodies in its error messages,
/// so an HTML interstitial shows up as one of these.
const BLOCKED_MARKERS: [&str; 4] = ["unexpected token", "is not valid json", "html", "doctype"];

/// Classifies an upstream failure message as an anti-bot block.
#[must_use]
pub fn is_blocked_response(message: &str) -> bool {
    let lower = message.to_lowercase();
    BLOCKED_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Retry parameters for upstream calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff base; the delay after attempt n is `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
    /// Added to the delay when the failure looks like an anti-bot block.
    pub blocked_penalty: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(5000),
            blocked_penalty: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay to sleep after a failed attempt (1-based).
    #[must_use]
    pub fn delay_after_failure(&self, attempt: u32, blocked: bool) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor);
        if blocked {
            delay.saturating_add(self.blocked_penalty)
        } else {
            delay
        }
    }
}

/// Failure after all attempts were exhausted. Carries the last underlying
/// message and how many attempts were made.
#[derive(Debug, thiserror::Error)]
#[error("failed after {attempts} attempts: {message}")]
pub struct RetryError {
    pub message: String,
    pub attempts: u32,
    pub blocked: bool,
}

/// Runs `op` until it succeeds or the policy's attempts run out, sleeping
/// the backoff delay between attempts. Blocked-looking failures get the
/// policy's penalty added to their delay but are otherwise retried the same
/// as any other failure.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_message = String::new();
    let mut last_blocked = false;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let message = format!("{err:#}");
                let blocked = is_blocked_response(&message);
                last_message = message;
                last_blocked = blocked;

                if attempt < max_attempts {
                    let delay = policy.delay_after_failure(attempt, blocked);
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        blocked,
                        delay_ms = delay.as_millis() as u64,
                        error = %last_message,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    error!(
                        label,
                        attempt,
                        max_attempts,
                        error = %last_message,
                        "All retry attempts exhausted"
                    );
                }
            }
        }
    }

    Err(RetryError {
        message: last_message,
        attempts: max_attempts,
        blocked: last_blocked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            blocked_penalty: Duration::from_millis(30),
        }
    }

    #[test]
    fn test_blocked_classification() {
        assert!(is_blocked_response("Unexpected token < in JSON"));
        assert!(is_blocked_response("body is not valid JSON"));
        assert!(is_blocked_response("<html><body>captcha</body></html>"));
        assert!(is_blocked_response("<!DOCTYPE html>"));
        assert!(!is_blocked_response("connection timed out"));
        assert!(!is_blocked_response("Trends API error: 500"));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 1..=5 {
            let delay = policy.delay_after_failure(attempt, false);
            assert!(delay >= previous);
            previous = delay;
        }

        assert_eq!(
            policy.delay_after_failure(1, false),
            Duration::from_millis(5000)
        );
        assert_eq!(
            policy.delay_after_failure(2, false),
            Duration::from_millis(10000)
        );
    }

    #[test]
    fn test_blocked_penalty_is_added() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_after_failure(1, true),
            Duration::from_millis(8000)
        );
        assert_eq!(
            policy.delay_after_failure(2, true),
            Duration::from_millis(13000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_calls_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_policy(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_calls_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), RetryError> = with_retry(&fast_policy(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("connection refused")
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert!(!err.blocked);
        assert!(err.message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_policy(), "test", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("transient")
                }
                Ok::<_, anyhow::Error>("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_failure_is_reported() {
        let result: Result<(), RetryError> = with_retry(&fast_policy(), "test", || async {
            anyhow::bail!("<!DOCTYPE html><html>robot check</html>")
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.blocked);
        assert_eq!(err.attempts, 3);
    }
}
