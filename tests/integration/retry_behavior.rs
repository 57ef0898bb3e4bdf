//! Retry and failure-classification tests for the region pipelines

use super::mock_client::{fast_config, MockJobClient, RegionScript};
use reef_analysis_jobs::{JobType, RegionJobStatus, RegionJobsManager};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_create_retries_transient_then_succeeds() {
    let client = Arc::new(MockJobClient::new().script(
        "a",
        RegionScript::succeeds("https://example.org/a.tif").with_create_transient_failures(2),
    ));

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Succeeded);
    assert_eq!(state.retry_count, 2);
    assert_eq!(client.create_calls("a"), 3);
}

#[tokio::test]
async fn test_create_retries_exhausted_fails_region() {
    let client = Arc::new(MockJobClient::new().script(
        "a",
        RegionScript::succeeds("unused").with_create_transient_failures(u32::MAX),
    ));

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Failed);
    assert_eq!(state.retry_count, 3);
    assert!(state.error.unwrap().contains("job creation failed"));
    // Initial attempt plus three retries
    assert_eq!(client.create_calls("a"), 4);
    assert_eq!(client.poll_calls("a"), 0);
}

#[tokio::test]
async fn test_create_permanent_error_fails_fast() {
    let client = Arc::new(
        MockJobClient::new().script("a", RegionScript::succeeds("unused").with_create_permanent()),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Failed);
    assert_eq!(state.retry_count, 0);
    assert_eq!(client.create_calls("a"), 1);
}

#[tokio::test]
async fn test_transient_poll_errors_do_not_consume_retries() {
    let client = Arc::new(MockJobClient::new().script(
        "a",
        RegionScript::succeeds("https://example.org/a.tif").with_poll_transient_failures(2),
    ));

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();

    let mut downloads = manager.take_downloads().unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Succeeded);
    assert_eq!(state.retry_count, 0);
    assert!(downloads.recv().await.is_some());
}

#[tokio::test]
async fn test_permanent_poll_error_fails_region() {
    let client = Arc::new(
        MockJobClient::new().script("a", RegionScript::succeeds("unused").with_poll_permanent()),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Failed);
    assert!(state.error.unwrap().contains("job poll failed"));
}

#[tokio::test]
async fn test_retry_count_accumulates_across_create_and_download() {
    let client = Arc::new(MockJobClient::new().script(
        "a",
        RegionScript::succeeds("https://example.org/a.tif")
            .with_create_transient_failures(1)
            .with_download_transient_failures(2),
    ));

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Succeeded);
    // One creation retry plus two download retries
    assert_eq!(state.retry_count, 3);
    assert_eq!(state.download_url.as_deref(), Some("https://example.org/a.tif"));
    assert_eq!(client.download_calls("a"), 3);
}

#[tokio::test]
async fn test_download_retries_exhausted_fails_region() {
    let client = Arc::new(MockJobClient::new().script(
        "a",
        RegionScript::succeeds("unused").with_download_transient_failures(u32::MAX),
    ));

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();

    let mut downloads = manager.take_downloads().unwrap();
    manager.wait().await;

    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Failed);
    assert_eq!(state.retry_count, 3);
    assert!(state.error.unwrap().contains("result download failed"));
    assert!(state.download_url.is_none());
    assert!(downloads.recv().await.is_none());
    assert_eq!(client.download_calls("a"), 4);
}
