//! Observability hooks for lifecycle transitions.
//!
//! The manager invokes a [`JobEventSink`] on every state transition, overview
//! recomputation, and isolated region failure. The default sink is a no-op;
//! [`TracingEventSink`] bridges events into structured tracing output.

use crate::client::ClientError;
use crate::overview::JobsOverviewState;
use crate::RegionJobState;
use tracing::{debug, info, warn};

/// Sink for manager lifecycle events.
///
/// Implementations must be cheap: sinks are called inline from the state
/// store while its lock is held. A sink must not call back into the manager
/// (`get_job_state`, `get_current_overview`, `cancel_job`, ...) — re-entrant
/// calls deadlock. Every event already carries the relevant snapshot.
pub trait JobEventSink: Send + Sync {
    /// A region's state changed; `state` is the post-transition snapshot.
    fn on_transition(&self, state: &RegionJobState);

    /// The aggregate overview was recomputed.
    fn on_overview(&self, overview: &JobsOverviewState);

    /// A region's pipeline failed; the error was captured, not propagated.
    fn on_region_error(&self, region: &str, error: &ClientError);
}

/// Sink that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl JobEventSink for NullEventSink {
    fn on_transition(&self, _state: &RegionJobState) {}
    fn on_overview(&self, _overview: &JobsOverviewState) {}
    fn on_region_error(&self, _region: &str, _error: &ClientError) {}
}

/// Sink that emits structured tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl JobEventSink for TracingEventSink {
    fn on_transition(&self, state: &RegionJobState) {
        info!(
            region = %state.region,
            status = %state.status,
            job_id = state.job_id.as_deref().unwrap_or("-"),
            retry_count = state.retry_count,
            "Region job transition"
        );
    }

    fn on_overview(&self, overview: &JobsOverviewState) {
        debug!(
            total = overview.total_jobs,
            completed = overview.completed,
            failed = overview.failed,
            in_progress = overview.in_progress,
            pending = overview.pending,
            cancelled = overview.cancelled,
            eta_secs = overview.estimated_time_remaining,
            "Jobs overview updated"
        );
    }

    fn on_region_error(&self, region: &str, error: &ClientError) {
        warn!(region = %region, error = %error, "Region job error");
    }
}
