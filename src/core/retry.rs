//! Retry logic for network-bound steps.
//!
//! A flat policy: a fixed number of attempts with a constant delay between them.
//! Browser launch, page creation and every scraping provider run through [`retry`],
//! each with its own [`RetryPolicy`]. When attempts run out the last error is
//! returned unchanged so callers (the fallback chain in particular) can still
//! inspect its category.

use std::future::Future;
use std::time::Duration;

use crate::core::config;

/// Retry strategy: total attempts and the pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of tries, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Delay before each new attempt
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::browser()
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Policy for browser launch and page creation.
    pub fn browser() -> Self {
        Self::new(config::retry::BROWSER_ATTEMPTS, config::retry::delay())
    }

    /// Sets the number of attempts.
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the error should be retried.
    fn is_retryable(&self) -> bool;
}

/// Executes an async operation under a [`RetryPolicy`].
///
/// The operation is invoked again after `policy.delay` while it fails with a
/// retryable error and attempts remain. Non-retryable errors stop immediately.
/// The returned error is always the one produced by the final attempt.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    log::debug!("Succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                log::warn!(
                    "Attempt {}/{} failed (retrying in {:?}): {}",
                    attempt,
                    max_attempts,
                    policy.delay,
                    e
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                if attempt > 1 || max_attempts > 1 {
                    log::warn!("Giving up after attempt {}/{}: {}", attempt, max_attempts, e);
                }
                return Err(e);
            }
        }
    }
}
