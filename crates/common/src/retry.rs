//! Bounded retry loop shared by backend calls and message dispatch

use crate::error::{BackendError, DispatchError, ErrorKind};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that carry a transient/permanent classification
pub trait Retryable: std::fmt::Display {
    fn kind(&self) -> ErrorKind;

    /// Error reported when a single attempt exceeds the call timeout
    fn timed_out(after: Duration) -> Self;
}

impl Retryable for BackendError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn timed_out(after: Duration) -> Self {
        BackendError::transient(format!("call timed out after {:?}", after))
    }
}

impl Retryable for DispatchError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn timed_out(after: Duration) -> Self {
        DispatchError::transient(format!("call timed out after {:?}", after))
    }
}

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per call, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,

    /// Upper bound for a single attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after a failed `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Successful value together with the number of attempts it took
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run `call` until it succeeds, fails permanently or runs out of attempts.
///
/// `call` receives the 1-based attempt number. Each attempt is bounded by
/// `policy.call_timeout`; an elapsed timeout counts as a transient failure.
/// On failure the last error is returned.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<Attempted<T>, E>
where
    E: Retryable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.call_timeout, call(attempt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(E::timed_out(policy.call_timeout)),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", operation, attempt, max_attempts);
                }
                return Ok(Attempted { value, attempts: attempt });
            }
            Err(e) if e.kind().is_transient() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation, attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} gave up after {} attempt(s): {}", operation, attempt, e);
                return Err(e);
            }
        }
    }
}
