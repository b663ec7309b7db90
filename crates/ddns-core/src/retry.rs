//! Fixed-count, fixed-delay retry policy
//!
//! Used by provider transports. There is no backoff growth and no jitter:
//! the provider's rate limits are coarse and the engine already paces
//! calls between records.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Total attempts made by [`RetryPolicy::default`] (one try plus two retries)
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Delay between attempts used by [`RetryPolicy::default`]
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Retry policy: how many attempts in total, and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (minimum 1)
    pub attempts: usize,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A policy that tries exactly once
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `attempt` until `succeeded` accepts its output or attempts run out
    ///
    /// `attempt` receives the 1-based attempt number. The output of the
    /// final attempt is returned whether it succeeded or not, so callers
    /// must inspect it instead of assuming success.
    pub async fn run<T, F, Fut, S>(&self, mut attempt: F, succeeded: S) -> T
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = T>,
        S: Fn(&T) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut n = 1;

        loop {
            let output = attempt(n).await;
            if succeeded(&output) || n >= attempts {
                return output;
            }

            warn!(
                "Attempt {}/{} failed, retrying in {:?}",
                n, attempts, self.delay
            );
            tokio::time::sleep(self.delay).await;
            n += 1;
        }
    }
}
