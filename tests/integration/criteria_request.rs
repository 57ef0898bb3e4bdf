//! Tests for the narrow criteria-request view

use super::mock_client::{fast_config, wait_for_status, MockJobClient, RegionScript};
use reef_analysis_jobs::criteria::CriteriaRequest;
use reef_analysis_jobs::{JobType, RegionJobStatus};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_ready_regions_streamed_as_jobs_succeed() {
    let client = Arc::new(
        MockJobClient::new()
            .script("townsville", RegionScript::succeeds("https://example.org/tsv.tif"))
            .script("cairns", RegionScript::succeeds("https://example.org/crn.tif")),
    );

    let request = CriteriaRequest::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({ "depth_min": -10.0 }),
        ["townsville", "cairns"].map(String::from),
        fast_config(),
    )
    .unwrap();

    let mut ready_rx = request.take_ready().unwrap();
    request.wait().await;

    let mut ready = Vec::new();
    while let Some(region) = ready_rx.recv().await {
        ready.push(region);
    }
    ready.sort_by(|a, b| a.region.cmp(&b.region));
    assert_eq!(ready.len(), 2);
    assert_eq!(ready[0].region, "cairns");
    assert_eq!(ready[0].url, "https://example.org/crn.tif");
    assert_eq!(ready[1].region, "townsville");
    assert_eq!(ready[1].url, "https://example.org/tsv.tif");

    assert!(request.busy_regions().is_empty());
}

#[tokio::test]
async fn test_take_ready_once() {
    let client = Arc::new(
        MockJobClient::new().script("a", RegionScript::succeeds("https://example.org/a.tif")),
    );

    let request = CriteriaRequest::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();

    assert!(request.take_ready().is_some());
    assert!(request.take_ready().is_none());
    request.cancel();
    request.wait().await;
}

#[tokio::test]
async fn test_busy_regions_track_the_state_map() {
    let client = Arc::new(
        MockJobClient::new()
            .script("slow", RegionScript::never_finishes())
            .script("fast", RegionScript::succeeds("https://example.org/fast.tif")),
    );

    let request = CriteriaRequest::new(
        Arc::clone(&client) as _,
        JobType::SiteSuitability,
        json!({}),
        ["slow", "fast"].map(String::from),
        fast_config(),
    )
    .unwrap();

    wait_for_status(request.manager(), "slow", RegionJobStatus::InProgress).await;
    wait_for_status(request.manager(), "fast", RegionJobStatus::Succeeded).await;

    let busy = request.busy_regions();
    assert!(busy.contains("slow"));
    assert!(!busy.contains("fast"));

    request.cancel();
    request.wait().await;
    assert!(request.busy_regions().is_empty());
    assert_eq!(
        request.manager().get_job_state("slow").unwrap().status,
        RegionJobStatus::Cancelled
    );
}

#[tokio::test]
async fn test_failed_region_never_reported_ready() {
    let client = Arc::new(
        MockJobClient::new().script("a", RegionScript::backend_fails()),
    );

    let request = CriteriaRequest::new(
        Arc::clone(&client) as _,
        JobType::RegionalAssessment,
        json!({}),
        vec!["a".to_string()],
        fast_config(),
    )
    .unwrap();

    let mut ready_rx = request.take_ready().unwrap();
    request.wait().await;
    assert!(ready_rx.recv().await.is_none());
}
