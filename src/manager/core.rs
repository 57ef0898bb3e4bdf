//! Region jobs manager: the public orchestration contract.

use super::config::ManagerConfig;
use super::pipeline::{run_region_pipeline, PipelineContext};
use super::store::{CancelOutcome, StateStore};
use super::ManagerError;
use crate::cancel::CancelToken;
use crate::client::JobClient;
use crate::overview::JobsOverviewState;
use crate::{JobType, ReadyDownload, RegionJobState};
use futures::StreamExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Orchestrator for one logical multi-region job request.
///
/// Construction deduplicates the supplied regions and immediately spawns the
/// fan-out driver (parallel or sequential per the configuration, read once).
/// The manager owns all per-region state; consumers observe it through the
/// state, overview, and ready-download streams, all of which close when the
/// request completes or is cancelled.
///
/// Must be constructed within a tokio runtime.
pub struct RegionJobsManager {
    store: Arc<StateStore>,
    cancel: CancelToken,
    region_tokens: HashMap<String, CancelToken>,
    region_count: usize,
    state_rx: watch::Receiver<HashMap<String, RegionJobState>>,
    overview_rx: watch::Receiver<JobsOverviewState>,
    downloads: Mutex<Option<mpsc::UnboundedReceiver<ReadyDownload>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl RegionJobsManager {
    /// Start a multi-region request.
    ///
    /// `payload` must be a JSON object; it is cloned per region with the
    /// region identifier injected under the `region` key. Duplicate region
    /// identifiers are processed at most once, in first-seen order.
    pub fn new(
        client: Arc<dyn JobClient>,
        job_type: JobType,
        payload: Value,
        regions: impl IntoIterator<Item = String>,
        config: ManagerConfig,
    ) -> Result<Self, ManagerError> {
        let payload = match payload {
            Value::Object(map) => map,
            other => {
                return Err(ManagerError::InvalidPayload(format!(
                    "criteria payload must be a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        // Deduplicate while preserving first-seen order
        let mut seen = HashSet::new();
        let regions: Vec<String> = regions
            .into_iter()
            .filter(|region| seen.insert(region.clone()))
            .collect();

        let (store, state_rx, overview_rx, download_rx) =
            StateStore::new(Arc::clone(&config.event_sink));
        let cancel = CancelToken::new();
        let region_tokens: HashMap<String, CancelToken> = regions
            .iter()
            .map(|region| (region.clone(), CancelToken::new()))
            .collect();

        info!(
            job_type = %job_type,
            regions = regions.len(),
            parallel = config.parallel,
            "Starting multi-region job request"
        );

        let parallel = config.parallel;
        let ctx = Arc::new(PipelineContext {
            client,
            store: Arc::clone(&store),
            job_type,
            payload,
            config,
            manager_cancel: cancel.clone(),
        });
        let tokens = region_tokens.clone();
        let region_count = regions.len();
        let driver_store = Arc::clone(&store);

        let driver = tokio::spawn(async move {
            if parallel {
                futures::stream::iter(regions)
                    .for_each_concurrent(None, |region| {
                        let ctx = Arc::clone(&ctx);
                        let token = tokens.get(&region).cloned().unwrap_or_default();
                        async move { run_region_pipeline(&ctx, region, token).await }
                    })
                    .await;
            } else {
                for region in regions {
                    if ctx.manager_cancel.is_cancelled() {
                        break;
                    }
                    let token = tokens.get(&region).cloned().unwrap_or_default();
                    run_region_pipeline(&ctx, region, token).await;
                }
            }
            // All pipelines terminal: no further updates are possible
            driver_store.close();
        });

        Ok(Self {
            store,
            cancel,
            region_tokens,
            region_count,
            state_rx,
            overview_rx,
            downloads: Mutex::new(Some(download_rx)),
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Number of distinct regions in this request.
    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Latest lifecycle state for a region, or `None` if its pipeline has
    /// not started (or the region is unknown).
    pub fn get_job_state(&self, region: &str) -> Option<RegionJobState> {
        self.store.get(region)
    }

    /// Snapshot of all known region states.
    pub fn states(&self) -> HashMap<String, RegionJobState> {
        self.store.snapshot()
    }

    /// Regions still busy (starting, pending, or in progress), derived from
    /// the state map.
    pub fn busy_regions(&self) -> HashSet<String> {
        self.store
            .snapshot()
            .into_iter()
            .filter(|(_, state)| state.status.is_busy())
            .map(|(region, _)| region)
            .collect()
    }

    /// Synchronous snapshot of the aggregate counters.
    pub fn get_current_overview(&self) -> JobsOverviewState {
        self.store.overview()
    }

    /// Subscribe to the per-region state snapshot stream.
    ///
    /// The full snapshot map is re-emitted on every applied transition;
    /// equal consecutive states are coalesced. The stream closes when the
    /// request completes or is cancelled.
    pub fn subscribe_states(&self) -> watch::Receiver<HashMap<String, RegionJobState>> {
        self.state_rx.clone()
    }

    /// Subscribe to the aggregate overview stream, recomputed on every
    /// applied transition.
    pub fn subscribe_overview(&self) -> watch::Receiver<JobsOverviewState> {
        self.overview_rx.clone()
    }

    /// Take the ready-download receiver. One event is emitted per region
    /// that reaches `Succeeded`. Returns `None` after the first call.
    pub fn take_downloads(&self) -> Option<mpsc::UnboundedReceiver<ReadyDownload>> {
        self.downloads.lock().expect("downloads receiver poisoned").take()
    }

    /// Cancel a single region's job.
    ///
    /// Forces the region to `Cancelled` if it is currently non-terminal.
    /// Cancelling an unknown or already-terminal region is a logged no-op.
    pub fn cancel_job(&self, region: &str) {
        match self.store.cancel_region(region) {
            CancelOutcome::Cancelled => {
                info!(region = %region, "Region job cancelled");
                if let Some(token) = self.region_tokens.get(region) {
                    token.cancel();
                }
            }
            CancelOutcome::AlreadyTerminal => {
                warn!(region = %region, "Cancel requested for already-terminal region, ignoring");
            }
            CancelOutcome::Unknown => {
                warn!(region = %region, "Cancel requested for unknown region, ignoring");
            }
        }
    }

    /// Cancel the whole request.
    ///
    /// Every non-terminal region transitions to `Cancelled` and all streams
    /// close permanently; responses to in-flight backend calls are ignored.
    /// Idempotent: repeated calls are no-ops.
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Cancelling multi-region job request");
        self.cancel.cancel();
        for token in self.region_tokens.values() {
            token.cancel();
        }
        self.store.cancel_all();
    }

    /// Wait until every region pipeline has reached a terminal state.
    pub async fn wait(&self) {
        let driver = self.driver.lock().expect("driver handle poisoned").take();
        if let Some(driver) = driver {
            let _ = driver.await;
        }
    }
}

impl std::fmt::Debug for RegionJobsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionJobsManager")
            .field("region_count", &self.region_count)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
