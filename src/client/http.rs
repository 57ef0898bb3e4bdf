//! HTTP implementation of the job API client
//!
//! Thin reqwest wrapper around the backend job endpoints. Status codes are
//! classified into [`ClientError`] variants so callers (the retry policy in
//! particular) can distinguish transient server failures from permanent ones.
//! Retrying itself is a pipeline concern and does not happen here.

use super::{ClientError, ClientResult, JobClient, JobRecord, JobRequest, JobResultsPayload};
use crate::JobType;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Client for the backend job REST API.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: String,
}

impl HttpJobClient {
    /// Create a client for the given API base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing reqwest [`Client`].
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify a non-success response into a [`ClientError`].
    async fn classify_error(response: Response) -> ClientError {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());

        if status.is_server_error() {
            ClientError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            ClientError::Request {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// Decode a response, routing failures through the error taxonomy.
    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Parse(e.to_string()))
        } else {
            Err(Self::classify_error(response).await)
        }
    }
}

#[async_trait]
impl JobClient for HttpJobClient {
    async fn start_job(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> ClientResult<JobRecord> {
        let url = format!("{}/api/jobs", self.base_url);
        debug!(%url, %job_type, "Creating job");

        let response = self
            .client
            .post(&url)
            .json(&JobRequest { job_type, payload })
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn get_job(&self, job_id: &str) -> ClientResult<JobRecord> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        debug!(%url, "Polling job");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn download_job_results(&self, job_id: &str) -> ClientResult<JobResultsPayload> {
        let url = format!("{}/api/jobs/{}/results", self.base_url, job_id);
        debug!(%url, "Fetching job results");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let results: JobResultsPayload = Self::decode(response).await?;
        if results.files.is_empty() {
            return Err(ClientError::InvalidResponse(format!(
                "job {job_id} reported success but returned no result files"
            )));
        }
        Ok(results)
    }
}
