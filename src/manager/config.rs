//! Manager configuration and defaults

use crate::events::{JobEventSink, NullEventSink};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Retries for the job-creation call.
/// Three retries with a one-second delay rides out short backend hiccups
/// without holding a region in `STARTING` for long.
pub const CREATE_RETRIES: u32 = 3;

/// Delay before each job-creation retry, in milliseconds.
pub const CREATE_RETRY_DELAY_MS: u64 = 1000;

/// Retries for the result-download call.
/// Results are already materialized when this call runs, so retries are
/// issued back-to-back with no delay.
pub const DOWNLOAD_RETRIES: u32 = 3;

/// Interval between job status polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Environment variable selecting parallel (`1`/`true`) or sequential
/// region fan-out.
pub const PARALLEL_ENV_VAR: &str = "REEF_JOBS_PARALLEL";

/// Configuration for one manager instance.
///
/// Read once at construction; changing a config after a manager is built has
/// no effect on that manager.
#[derive(Clone)]
pub struct ManagerConfig {
    /// Run region pipelines concurrently (true) or one-at-a-time (false)
    pub parallel: bool,
    /// Interval between job status polls
    pub poll_interval: Duration,
    /// Retry policy for the job-creation call
    pub create_retry: RetryPolicy,
    /// Retry policy for the result-download call
    pub download_retry: RetryPolicy,
    /// Sink invoked on every transition and overview recomputation
    pub event_sink: Arc<dyn JobEventSink>,
}

impl ManagerConfig {
    /// Default configuration with the parallel flag taken from the
    /// `REEF_JOBS_PARALLEL` environment variable (defaults to parallel).
    pub fn from_env() -> Self {
        let parallel = std::env::var(PARALLEL_ENV_VAR)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);
        Self::default().with_parallel(parallel)
    }

    /// Set the fan-out mode.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the job-creation retry policy.
    pub fn with_create_retry(mut self, policy: RetryPolicy) -> Self {
        self.create_retry = policy;
        self
    }

    /// Override the result-download retry policy.
    pub fn with_download_retry(mut self, policy: RetryPolicy) -> Self {
        self.download_retry = policy;
        self
    }

    /// Attach an event sink for lifecycle observability.
    pub fn with_event_sink(mut self, sink: Arc<dyn JobEventSink>) -> Self {
        self.event_sink = sink;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            create_retry: RetryPolicy::new(
                CREATE_RETRIES,
                Duration::from_millis(CREATE_RETRY_DELAY_MS),
            ),
            download_retry: RetryPolicy::no_delay(DOWNLOAD_RETRIES),
            event_sink: Arc::new(NullEventSink),
        }
    }
}

impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("parallel", &self.parallel)
            .field("poll_interval", &self.poll_interval)
            .field("create_retry", &self.create_retry)
            .field("download_retry", &self.download_retry)
            .finish_non_exhaustive()
    }
}
