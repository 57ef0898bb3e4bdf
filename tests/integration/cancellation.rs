//! Cancellation tests: single-region, whole-request, and idempotence

use super::mock_client::{fast_config, wait_for_status, MockJobClient, RegionScript};
use reef_analysis_jobs::{JobType, RegionJobStatus, RegionJobsManager};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_cancel_single_region_leaves_others_running() {
    let client = Arc::new(
        MockJobClient::new()
            .script("slow", RegionScript::never_finishes())
            .script("fast", RegionScript::succeeds("https://example.org/fast.tif")),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        ["slow", "fast"].map(String::from),
        fast_config(),
    )
    .unwrap();

    let mut downloads = manager.take_downloads().unwrap();
    wait_for_status(&manager, "slow", RegionJobStatus::InProgress).await;

    manager.cancel_job("slow");
    manager.wait().await;

    let slow = manager.get_job_state("slow").unwrap();
    assert_eq!(slow.status, RegionJobStatus::Cancelled);
    assert!(slow.download_url.is_none());

    let fast = manager.get_job_state("fast").unwrap();
    assert_eq!(fast.status, RegionJobStatus::Succeeded);

    let ready = downloads.recv().await.unwrap();
    assert_eq!(ready.region, "fast");
    assert!(downloads.recv().await.is_none());

    let overview = manager.get_current_overview();
    assert_eq!(overview.completed, 1);
    assert_eq!(overview.cancelled, 1);
    assert!(overview.is_settled());
}

#[tokio::test]
async fn test_cancel_unknown_or_terminal_region_is_noop() {
    let client = Arc::new(
        MockJobClient::new().script("a", RegionScript::succeeds("https://example.org/a.tif")),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();

    // Unknown region is logged and ignored
    manager.cancel_job("ghost");

    manager.wait().await;

    // Cancelling a succeeded region must not overwrite its terminal state
    manager.cancel_job("a");
    let state = manager.get_job_state("a").unwrap();
    assert_eq!(state.status, RegionJobStatus::Succeeded);
    assert!(state.download_url.is_some());
}

#[tokio::test]
async fn test_cancel_all_is_idempotent_and_closes_streams() {
    let client = Arc::new(
        MockJobClient::new()
            .script("a", RegionScript::never_finishes())
            .script("b", RegionScript::never_finishes()),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::SiteSuitability,
        json!({}),
        ["a", "b"].map(String::from),
        fast_config(),
    )
    .unwrap();

    let state_rx = manager.subscribe_states();
    let mut downloads = manager.take_downloads().unwrap();
    wait_for_status(&manager, "a", RegionJobStatus::InProgress).await;
    wait_for_status(&manager, "b", RegionJobStatus::InProgress).await;

    manager.cancel();
    manager.cancel();
    manager.wait().await;

    for region in ["a", "b"] {
        let state = manager.get_job_state(region).unwrap();
        assert_eq!(state.status, RegionJobStatus::Cancelled);
        assert!(state.download_url.is_none());
    }

    assert!(state_rx.has_changed().is_err());
    assert!(downloads.recv().await.is_none());
    assert!(manager.busy_regions().is_empty());

    let overview = manager.get_current_overview();
    assert_eq!(overview.cancelled, 2);
    assert!(overview.is_settled());
}

#[tokio::test]
async fn test_cancel_immediately_after_start() {
    let client = Arc::new(
        MockJobClient::new()
            .script("a", RegionScript::succeeds("https://example.org/a.tif"))
            .script("b", RegionScript::succeeds("https://example.org/b.tif")),
    );

    let manager = RegionJobsManager::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        ["a", "b"].map(String::from),
        fast_config(),
    )
    .unwrap();

    let mut downloads = manager.take_downloads().unwrap();
    manager.cancel();
    manager.wait().await;

    // No region may be left non-terminal, whether or not its pipeline started
    for state in manager.states().values() {
        assert!(state.status.is_terminal());
    }
    assert!(manager.busy_regions().is_empty());
    assert!(downloads.recv().await.is_none());
}
