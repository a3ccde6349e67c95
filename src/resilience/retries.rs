//! Bounded retry driver.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times
//! - Sleep with linear backoff between attempts (never after the last one)
//! - Report how many attempts were made alongside the final result

use std::fmt::Display;
use std::future::Future;

use crate::config::RetryPolicy;
use crate::resilience::backoff::linear_backoff;

/// Final result of a retried operation.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `op(attempt)` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) if attempt < max_attempts => {
                let delay = linear_backoff(attempt, policy.backoff_ms);
                tracing::debug!(operation = %label, attempt, delay = ?delay, error = %e, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryOutcome {
                    result: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = retry_with_backoff(policy(3), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("fail {}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), String> = retry_with_backoff(policy(3), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always".to_string()) }
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let outcome: RetryOutcome<(), String> =
            retry_with_backoff(policy(0), "test", |_| async { Err("no".to_string()) }).await;
        assert_eq!(outcome.attempts, 1);
    }
}
