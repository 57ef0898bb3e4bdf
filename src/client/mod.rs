//! Job API client trait and wire types
//!
//! The backend exposes an opaque REST API for analysis jobs. This module owns
//! the client-side contract: create a job, poll it, and locate its result
//! artifacts once it succeeds. Errors carry enough classification for the
//! retry policy to tell transient server failures from permanent ones.

use crate::JobType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod http;

pub use http::HttpJobClient;

/// Client errors (classified for retry decisions)
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server-side error (5xx); safe to retry
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or status description
        message: String,
    },

    /// Client-side request error (4xx); not retried
    #[error("request error {status}: {message}")]
    Request {
        /// HTTP status code
        status: u16,
        /// Response body or status description
        message: String,
    },

    /// Transport-level failure (connection refused, timeout, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Response decoded but violated the API contract
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether the error is transient (5xx-equivalent) and safe to retry.
    ///
    /// Only server errors qualify; request, network, and decode failures
    /// propagate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Server { .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Backend-reported job status.
///
/// This is the backend's own lifecycle vocabulary, narrower than the
/// manager-side [`crate::RegionJobStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatusCode {
    /// Queued, not yet picked up by a worker
    #[serde(rename = "PENDING")]
    Pending,
    /// A worker is executing the job
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    /// Finished successfully; results are available
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    /// Finished unsuccessfully
    #[serde(rename = "FAILED")]
    Failed,
    /// Cancelled on the backend
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl JobStatusCode {
    /// Whether the backend considers the job finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatusCode::Pending => "PENDING",
            JobStatusCode::InProgress => "IN_PROGRESS",
            JobStatusCode::Succeeded => "SUCCEEDED",
            JobStatusCode::Failed => "FAILED",
            JobStatusCode::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Job record returned by the backend on creation and on poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque backend-assigned identifier
    pub id: String,
    /// Job classification
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Current backend status
    pub status: JobStatusCode,
}

/// Request body for job creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Job classification
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Criteria payload, region already injected
    pub payload: serde_json::Value,
}

/// Result artifact locations for a succeeded job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultsPayload {
    /// The job the artifacts belong to
    pub job: JobRecord,
    /// Artifact name to download URL
    pub files: BTreeMap<String, String>,
}

impl JobResultsPayload {
    /// The primary download URL: the first file of the result set.
    pub fn primary_url(&self) -> Option<&str> {
        self.files.values().next().map(String::as_str)
    }
}

/// Client for the backend job API (T: create, poll, locate results).
///
/// Implementations must be cheap to share across per-region pipelines.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Create a job on the backend.
    ///
    /// # Arguments
    /// * `job_type` - Job classification
    /// * `payload` - Criteria payload with the target region injected
    async fn start_job(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> ClientResult<JobRecord>;

    /// Fetch the current record for a job.
    async fn get_job(&self, job_id: &str) -> ClientResult<JobRecord>;

    /// Locate result artifacts for a succeeded job.
    async fn download_job_results(&self, job_id: &str) -> ClientResult<JobResultsPayload>;
}
