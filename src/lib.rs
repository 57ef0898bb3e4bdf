//! # Reef Analysis Jobs Library
//!
//! Orchestration layer for launching long-running reef-suitability analysis
//! jobs against a backend job API, one job per geographic region, and tracking
//! their lifecycles until results are ready to consume.
//!
//! ## Features
//!
//! - **Multi-Region Fan-Out**: One logical request spawns an independent
//!   backend job per region, run in parallel or strictly one-at-a-time
//! - **Bounded Retries**: Transient (5xx-equivalent) backend failures are
//!   retried with configurable count and delay; permanent errors fail fast
//! - **Live Aggregation**: Per-region lifecycle states roll up into summary
//!   counters and a wall-clock ETA estimate on every transition
//! - **Cooperative Cancellation**: Individual regions or the whole request can
//!   be cancelled; late backend responses are ignored after cancellation
//! - **Result Streaming**: Each region that succeeds emits a ready-to-consume
//!   download descriptor as soon as its results are available
//!
//! ## Quick Start
//!
//! ```no_run
//! use reef_analysis_jobs::client::HttpJobClient;
//! use reef_analysis_jobs::manager::{ManagerConfig, RegionJobsManager};
//! use reef_analysis_jobs::JobType;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpJobClient::new("https://api.example.org")?);
//!
//! let manager = RegionJobsManager::new(
//!     client,
//!     JobType::RegionalAssessment,
//!     json!({ "depth_min": -10.0, "depth_max": -2.0 }),
//!     ["townsville", "cairns", "mackay"].map(String::from),
//!     ManagerConfig::default(),
//! )?;
//!
//! let mut downloads = manager.take_downloads().expect("first take");
//! while let Some(ready) = downloads.recv().await {
//!     println!("{} -> {}", ready.region, ready.download_url);
//! }
//! manager.wait().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - Job API client trait, wire types, and HTTP implementation
//! - [`retry`] - Bounded retry wrapper for transient backend failures
//! - [`cancel`] - Cooperative cancellation tokens
//! - [`manager`] - Region fan-out orchestration and per-region pipelines
//! - [`overview`] - Pure aggregation of region states into summary counters
//! - [`criteria`] - Narrow ready-region view over the manager
//! - [`events`] - Optional observability hook for lifecycle transitions

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cooperative cancellation tokens
pub mod cancel;

/// CLI command implementations
pub mod cli;

/// Job API client trait and HTTP implementation
pub mod client;

/// Criteria request: narrow ready-region view over the manager
pub mod criteria;

/// Observability hooks for lifecycle transitions
pub mod events;

/// Region fan-out orchestration
pub mod manager;

/// Aggregate overview projection
pub mod overview;

/// Bounded retry policy for transient failures
pub mod retry;

// Re-export commonly used types
pub use manager::{ManagerConfig, ManagerError, RegionJobsManager};
pub use overview::JobsOverviewState;

/// Classification of backend analysis jobs.
///
/// Immutable for the lifetime of a manager instance; every region of one
/// logical request runs the same job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    /// Region-wide reef suitability assessment
    #[serde(rename = "REGIONAL_ASSESSMENT")]
    RegionalAssessment,
    /// Deployment site suitability within a region
    #[serde(rename = "SITE_SUITABILITY")]
    SiteSuitability,
    /// Raster data package export for a region
    #[serde(rename = "DATA_EXPORT")]
    DataExport,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobType::RegionalAssessment => "REGIONAL_ASSESSMENT",
            JobType::SiteSuitability => "SITE_SUITABILITY",
            JobType::DataExport => "DATA_EXPORT",
        };
        write!(f, "{s}")
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGIONAL_ASSESSMENT" => Ok(JobType::RegionalAssessment),
            "SITE_SUITABILITY" => Ok(JobType::SiteSuitability),
            "DATA_EXPORT" => Ok(JobType::DataExport),
            _ => Err(format!("Invalid job type: {s}")),
        }
    }
}

/// Lifecycle status of one region's job as seen by the manager.
///
/// `Succeeded`, `Failed`, `Cancelled`, and `TimedOut` are terminal: once a
/// region reaches one of them no further transitions are applied, except that
/// an external cancel may overwrite a non-terminal status with `Cancelled`.
///
/// `TimedOut` is part of the taxonomy for forward compatibility but is never
/// assigned by any current code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RegionJobStatus {
    /// Pipeline started, job not yet created on the backend
    #[default]
    #[serde(rename = "STARTING")]
    Starting,
    /// Job created, waiting to be picked up by the backend
    #[serde(rename = "PENDING")]
    Pending,
    /// Backend is executing the job
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    /// Job finished and results were located
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    /// Job failed, either on the backend or after retries were exhausted
    #[serde(rename = "FAILED")]
    Failed,
    /// Job was cancelled before completion
    #[serde(rename = "CANCELLED")]
    Cancelled,
    /// Reserved: job exceeded a time budget
    #[serde(rename = "TIMED_OUT")]
    TimedOut,
}

impl RegionJobStatus {
    /// Whether this status is terminal (no further transitions apply).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }

    /// Whether the region is still busy (work outstanding on the backend).
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Starting | Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for RegionJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegionJobStatus::Starting => "STARTING",
            RegionJobStatus::Pending => "PENDING",
            RegionJobStatus::InProgress => "IN_PROGRESS",
            RegionJobStatus::Succeeded => "SUCCEEDED",
            RegionJobStatus::Failed => "FAILED",
            RegionJobStatus::Cancelled => "CANCELLED",
            RegionJobStatus::TimedOut => "TIMED_OUT",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RegionJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(RegionJobStatus::Starting),
            "PENDING" => Ok(RegionJobStatus::Pending),
            "IN_PROGRESS" => Ok(RegionJobStatus::InProgress),
            "SUCCEEDED" => Ok(RegionJobStatus::Succeeded),
            "FAILED" => Ok(RegionJobStatus::Failed),
            "CANCELLED" => Ok(RegionJobStatus::Cancelled),
            "TIMED_OUT" => Ok(RegionJobStatus::TimedOut),
            _ => Err(format!("Invalid region job status: {s}")),
        }
    }
}

/// Lifecycle state of one region's job within a manager instance.
///
/// At most one state exists per region per manager. Consumers receive cloned
/// snapshots; the manager's state store is the only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionJobState {
    /// Region identifier, unique within the manager
    pub region: String,
    /// Backend-assigned job id; set once creation succeeds, never cleared
    pub job_id: Option<String>,
    /// Current lifecycle status
    pub status: RegionJobStatus,
    /// When the region's pipeline started
    pub start_time: DateTime<Utc>,
    /// Updated on every transition
    pub last_updated: DateTime<Utc>,
    /// Last-seen failure description, if any
    pub error: Option<String>,
    /// Result location; set if and only if status is `Succeeded`
    pub download_url: Option<String>,
    /// Classification of the backend job
    pub job_type: JobType,
    /// Transient-failure retries observed so far (monotonically non-decreasing)
    pub retry_count: u32,
}

impl RegionJobState {
    /// Create the initial `Starting` state for a region.
    pub fn starting(region: impl Into<String>, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            region: region.into(),
            job_id: None,
            status: RegionJobStatus::Starting,
            start_time: now,
            last_updated: now,
            error: None,
            download_url: None,
            job_type,
            retry_count: 0,
        }
    }

    /// Validate state invariants.
    ///
    /// `download_url` must be present exactly when the status is `Succeeded`.
    pub fn validate(&self) -> Result<(), String> {
        if self.region.is_empty() {
            return Err("Region cannot be empty".to_string());
        }

        match (self.status, self.download_url.is_some()) {
            (RegionJobStatus::Succeeded, false) => {
                Err("Succeeded state must carry a download URL".to_string())
            }
            (status, true) if status != RegionJobStatus::Succeeded => {
                Err(format!("Download URL set on non-succeeded status {status}"))
            }
            _ => Ok(()),
        }
    }

    /// Wall-clock duration between pipeline start and the last transition.
    pub fn elapsed(&self) -> chrono::Duration {
        self.last_updated - self.start_time
    }
}

/// Ready-to-consume result descriptor emitted when a region succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyDownload {
    /// Region whose job produced these results
    pub region: String,
    /// Backend job id
    pub job_id: String,
    /// Primary result artifact location (first file of the result set)
    pub download_url: String,
    /// All result artifacts by name
    pub files: std::collections::BTreeMap<String, String>,
}
