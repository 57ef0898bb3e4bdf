//! Bounded retry policy for transient backend failures
//!
//! Pure control-flow wrapper: given a fallible async operation, retry up to a
//! configured number of times with a fixed delay before each retry, but only
//! when the failure is transient ([`ClientError::is_transient`]). Permanent
//! errors propagate immediately without consuming attempts.

use crate::client::ClientError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy with a fixed per-retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt
    pub count: u32,
    /// Delay inserted before each retry attempt
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy with `count` retries and a fixed `delay` before each.
    pub fn new(count: u32, delay: Duration) -> Self {
        Self { count, delay }
    }

    /// Policy with `count` retries and no delay between attempts.
    pub fn no_delay(count: u32) -> Self {
        Self::new(count, Duration::ZERO)
    }

    /// Run `op`, retrying transient failures up to the configured count.
    ///
    /// `on_retry` is invoked once per retry attempt with the attempt number
    /// (1-based) and the error that triggered it, before the delay elapses.
    /// Non-transient errors and the last error after exhaustion propagate
    /// unchanged. `count = 0` means a single attempt.
    pub async fn run<T, F, Fut, R>(&self, mut op: F, mut on_retry: R) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        R: FnMut(u32, &ClientError),
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.count => {
                    attempt += 1;
                    warn!(
                        attempt = attempt,
                        max_retries = self.count,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    on_retry(attempt, &e);
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
