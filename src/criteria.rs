//! Criteria request: narrow ready-region view over the manager.
//!
//! Predecessor interface to [`RegionJobsManager`] kept for consumers that
//! only care about which regions have a usable resource URL and which are
//! still busy. The busy set is derived by filtering the richer state map
//! rather than being tracked separately, so the two views can never drift.

use crate::client::JobClient;
use crate::manager::{ManagerConfig, ManagerError, RegionJobsManager};
use crate::JobType;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A region whose analysis resource is ready to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyRegion {
    /// Region identifier
    pub region: String,
    /// Resource location for the region's results
    pub url: String,
}

/// Multi-region request exposing only ready-region events and a busy set.
pub struct CriteriaRequest {
    manager: Arc<RegionJobsManager>,
    ready: Mutex<Option<mpsc::UnboundedReceiver<ReadyRegion>>>,
}

impl CriteriaRequest {
    /// Start a request over the given regions with shared criteria.
    ///
    /// Must be constructed within a tokio runtime.
    pub fn new(
        client: Arc<dyn JobClient>,
        job_type: JobType,
        payload: Value,
        regions: impl IntoIterator<Item = String>,
        config: ManagerConfig,
    ) -> Result<Self, ManagerError> {
        let manager = Arc::new(RegionJobsManager::new(
            client, job_type, payload, regions, config,
        )?);

        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        if let Some(mut downloads) = manager.take_downloads() {
            tokio::spawn(async move {
                while let Some(download) = downloads.recv().await {
                    let ready = ReadyRegion {
                        region: download.region,
                        url: download.download_url,
                    };
                    if ready_tx.send(ready).is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self {
            manager,
            ready: Mutex::new(Some(ready_rx)),
        })
    }

    /// Take the ready-region receiver. Returns `None` after the first call.
    pub fn take_ready(&self) -> Option<mpsc::UnboundedReceiver<ReadyRegion>> {
        self.ready.lock().expect("ready receiver poisoned").take()
    }

    /// Regions still being processed, derived from the state map.
    pub fn busy_regions(&self) -> HashSet<String> {
        self.manager.busy_regions()
    }

    /// Access the underlying manager for richer state queries.
    pub fn manager(&self) -> &RegionJobsManager {
        &self.manager
    }

    /// Cancel the whole request. Idempotent.
    pub fn cancel(&self) {
        self.manager.cancel();
    }

    /// Wait until every region has reached a terminal state.
    pub async fn wait(&self) {
        self.manager.wait().await;
    }
}

impl std::fmt::Debug for CriteriaRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaRequest")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
