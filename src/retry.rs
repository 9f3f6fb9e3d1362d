//! Bounded retry with fixed backoff.
//!
//! [`retry`] runs an async operation until it succeeds, the attempt ceiling
//! is reached, or the error is classified as not worth repeating. Between
//! attempts it sleeps for a fixed interval. Every attempt is logged with its
//! 1-based index.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use todo_service::retry::{RetryPolicy, retry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy::new(3, Duration::from_millis(1));
//! let value = retry(policy, "example", |_: &String| true, |attempt| async move {
//!     if attempt < 2 { Err(format!("attempt {attempt} failed")) } else { Ok(attempt) }
//! })
//! .await
//! .unwrap();
//! assert_eq!(value, 2);
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed wait between attempts (3 seconds).
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Attempt ceiling and the fixed wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub attempts: u32,

    /// Wait after a failed attempt before starting the next one (e.g. "3s").
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given ceiling and backoff.
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// A single attempt, never retried.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Effective ceiling. A zero ceiling still runs the operation once.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Failure of a retried operation: how many attempts ran and the last error.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of attempts performed.
    pub attempts: u32,
    /// Error returned by the final attempt.
    pub last: E,
}

/// Run `op` under `policy`.
///
/// `op` receives the 1-based attempt index. An error for which `is_retryable`
/// returns `false` stops the loop immediately. No sleep follows the final
/// attempt.
pub async fn retry<T, E, Op, Fut, P>(
    policy: RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: Op,
) -> Result<T, RetryError<E>>
where
    E: Display,
    P: Fn(&E) -> bool,
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                tracing::info!(operation, attempt, max_attempts, "Attempt succeeded");
                return Ok(value);
            }
            Err(error) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Attempt failed"
                );

                if attempt >= max_attempts || !is_retryable(&error) {
                    return Err(RetryError {
                        attempts: attempt,
                        last: error,
                    });
                }

                tracing::debug!(
                    operation,
                    backoff = %humantime::format_duration(policy.backoff),
                    "Retrying after backoff"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
