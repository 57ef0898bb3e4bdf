//! Region fan-out orchestration
//!
//! One [`RegionJobsManager`] instance owns one logical multi-region request:
//! it spawns a per-region pipeline for every (deduplicated) region, drives
//! each job from creation through its terminal state, and exposes the results
//! as streams.
//!
//! # Overview
//!
//! 1. **Construction**: [`RegionJobsManager::new`] validates the criteria
//!    payload, deduplicates the regions, and spawns the fan-out driver
//! 2. **Fan-out**: pipelines run concurrently or strictly one-at-a-time
//!    depending on [`config::ManagerConfig::parallel`]
//! 3. **Per-region pipeline**: create the backend job (with retry), poll it
//!    until terminal, then locate its result artifacts (with retry)
//! 4. **Aggregation**: every transition re-broadcasts the state snapshot and
//!    a recomputed [`crate::overview::JobsOverviewState`]
//! 5. **Cancellation**: individual regions or the whole request can be
//!    cancelled cooperatively at any suspension point
//!
//! # Error Handling
//!
//! Per-region failures are fully isolated: they terminate only that region's
//! pipeline and surface through the region's state and the event sink; they
//! never propagate out of the manager streams. Only construction errors
//! (malformed payload) are returned to the caller directly.
//!
//! # Related Modules
//!
//! - [`crate::client`] - Backend job API access
//! - [`crate::retry`] - Transient-failure retry policy
//! - [`crate::overview`] - Aggregate projection

pub mod config;
mod core;
mod pipeline;
mod store;

pub use config::{ManagerConfig, DEFAULT_POLL_INTERVAL_MS, PARALLEL_ENV_VAR};
pub use core::RegionJobsManager;

/// Manager construction errors
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The criteria payload is not a JSON object and cannot take a region field
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
