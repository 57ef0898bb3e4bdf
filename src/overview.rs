//! Aggregate overview projection.
//!
//! Pure function turning the set of per-region lifecycle states into summary
//! counters and an ETA estimate. Recomputed on every state transition; never
//! mutated independently.

use crate::{RegionJobState, RegionJobStatus};
use serde::{Deserialize, Serialize};

/// Summary counters across all regions of one manager instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobsOverviewState {
    /// Number of regions with a known state
    pub total_jobs: u64,
    /// Regions that succeeded
    pub completed: u64,
    /// Regions that failed
    pub failed: u64,
    /// Regions currently executing on the backend
    pub in_progress: u64,
    /// Regions queued on the backend
    pub pending: u64,
    /// Regions cancelled before completion
    pub cancelled: u64,
    /// Regions that timed out (reserved, currently always zero)
    pub timed_out: u64,
    /// Estimated seconds until all remaining jobs complete, when computable
    pub estimated_time_remaining: Option<u64>,
}

impl JobsOverviewState {
    /// Count of regions in a terminal state.
    pub fn terminal(&self) -> u64 {
        self.completed + self.failed + self.cancelled + self.timed_out
    }

    /// Whether every known region has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.terminal() == self.total_jobs
    }
}

/// Project region states into an aggregate overview.
///
/// The ETA is a naive linear extrapolation: the average wall-clock duration
/// of completed jobs multiplied by the count of remaining non-terminal jobs,
/// rounded to the nearest second. It is only produced when at least one job
/// has completed and at least one is still pending or in progress, and it is
/// deliberately approximate (no weighting by region size or job type).
pub fn compute_overview<'a, I>(states: I) -> JobsOverviewState
where
    I: IntoIterator<Item = &'a RegionJobState>,
{
    let mut overview = JobsOverviewState::default();
    let mut completed_duration_secs = 0.0f64;
    let mut remaining = 0u64;

    for state in states {
        overview.total_jobs += 1;
        match state.status {
            RegionJobStatus::Succeeded => {
                overview.completed += 1;
                completed_duration_secs += state.elapsed().num_milliseconds() as f64 / 1000.0;
            }
            RegionJobStatus::Failed => overview.failed += 1,
            RegionJobStatus::InProgress => overview.in_progress += 1,
            RegionJobStatus::Pending => overview.pending += 1,
            RegionJobStatus::Cancelled => overview.cancelled += 1,
            RegionJobStatus::TimedOut => overview.timed_out += 1,
            RegionJobStatus::Starting => {}
        }
        if !state.status.is_terminal() {
            remaining += 1;
        }
    }

    if overview.completed > 0 && (overview.pending + overview.in_progress) > 0 {
        let average = completed_duration_secs / overview.completed as f64;
        overview.estimated_time_remaining = Some((average * remaining as f64).round() as u64);
    }

    overview
}
