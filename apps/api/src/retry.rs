//! Bounded retry with a fixed delay between attempts.
//!
//! The policy is a plain value so it can be tested without any network in the
//! loop. Callers classify their errors through [`Retryable`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Up to `max_attempts` tries, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// The operation returned an error classified as not retryable.
    Terminal { attempt: u32, error: E },
    /// Every allowed attempt failed with a retryable error.
    Exhausted { attempts: u32, error: E },
}

/// Runs `f` until it succeeds, returns a terminal error, or `policy` runs out
/// of attempts. `f` receives the 1-based attempt number.
pub async fn retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            warn!(operation, attempt, %error, "non-retryable error");
            return Err(RetryFailure::Terminal { attempt, error });
        }

        if attempt >= max_attempts {
            warn!(operation, attempts = attempt, %error, "retry attempts exhausted");
            return Err(RetryFailure::Exhausted {
                attempts: attempt,
                error,
            });
        }

        let delay = policy.delay;
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            %error,
            "retrying after error"
        );
        tokio::time::sleep(delay).await;
    }
}
