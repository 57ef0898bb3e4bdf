//! Shared region state store.
//!
//! Sole owner of the region-to-state map for one manager instance. Pipelines
//! never touch the map directly; every mutation funnels through [`StateStore`]
//! so the single-writer and terminal-monotonicity invariants hold, and so
//! every applied transition re-broadcasts the snapshot map and a recomputed
//! overview. Consumers only ever see cloned snapshots.

use crate::client::ClientError;
use crate::events::JobEventSink;
use crate::overview::{compute_overview, JobsOverviewState};
use crate::{JobType, ReadyDownload, RegionJobState, RegionJobStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Outcome of a region cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelOutcome {
    /// The region was non-terminal and is now `Cancelled`
    Cancelled,
    /// The region had already reached a terminal state; nothing changed
    AlreadyTerminal,
    /// No state exists for the region
    Unknown,
}

struct StoreInner {
    states: HashMap<String, RegionJobState>,
    state_tx: Option<watch::Sender<HashMap<String, RegionJobState>>>,
    overview_tx: Option<watch::Sender<JobsOverviewState>>,
    download_tx: Option<mpsc::UnboundedSender<ReadyDownload>>,
}

/// Exclusive owner of per-region job state for one manager instance.
pub(crate) struct StateStore {
    inner: Mutex<StoreInner>,
    sink: Arc<dyn JobEventSink>,
}

impl StateStore {
    /// Create a store plus the receiving ends of its three streams.
    pub(crate) fn new(
        sink: Arc<dyn JobEventSink>,
    ) -> (
        Arc<Self>,
        watch::Receiver<HashMap<String, RegionJobState>>,
        watch::Receiver<JobsOverviewState>,
        mpsc::UnboundedReceiver<ReadyDownload>,
    ) {
        let (state_tx, state_rx) = watch::channel(HashMap::new());
        let (overview_tx, overview_rx) = watch::channel(JobsOverviewState::default());
        let (download_tx, download_rx) = mpsc::unbounded_channel();

        let store = Arc::new(Self {
            inner: Mutex::new(StoreInner {
                states: HashMap::new(),
                state_tx: Some(state_tx),
                overview_tx: Some(overview_tx),
                download_tx: Some(download_tx),
            }),
            sink,
        });

        (store, state_rx, overview_rx, download_rx)
    }

    /// Insert the initial `Starting` state for a region.
    ///
    /// Returns false if the store is closed or the region already has a
    /// state (one state per region per manager instance).
    pub(crate) fn begin_region(&self, region: &str, job_type: JobType) -> bool {
        let mut inner = self.inner.lock().expect("state store poisoned");
        if inner.state_tx.is_none() || inner.states.contains_key(region) {
            return false;
        }

        let state = RegionJobState::starting(region, job_type);
        inner.states.insert(region.to_string(), state.clone());
        Self::broadcast(&mut inner, &*self.sink, &state);
        true
    }

    /// Apply a transition to a region's state.
    ///
    /// Skipped (returning false) when the store is closed, the region is
    /// unknown, the region is already terminal, or the mutation produces no
    /// observable change (equal consecutive states are coalesced).
    pub(crate) fn apply<F>(&self, region: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut RegionJobState),
    {
        let mut inner = self.inner.lock().expect("state store poisoned");
        if inner.state_tx.is_none() {
            return false;
        }

        let Some(state) = inner.states.get_mut(region) else {
            return false;
        };
        if state.status.is_terminal() {
            debug!(region = %region, status = %state.status, "Dropping transition for terminal region");
            return false;
        }

        let before = state.clone();
        mutate(state);
        if *state == before {
            return false;
        }
        state.last_updated = chrono::Utc::now();

        let snapshot = state.clone();
        Self::broadcast(&mut inner, &*self.sink, &snapshot);
        true
    }

    /// Force a single region to `Cancelled` if it is non-terminal.
    pub(crate) fn cancel_region(&self, region: &str) -> CancelOutcome {
        let mut inner = self.inner.lock().expect("state store poisoned");
        let Some(state) = inner.states.get_mut(region) else {
            return CancelOutcome::Unknown;
        };
        if state.status.is_terminal() {
            return CancelOutcome::AlreadyTerminal;
        }

        state.status = RegionJobStatus::Cancelled;
        state.last_updated = chrono::Utc::now();
        let snapshot = state.clone();
        Self::broadcast(&mut inner, &*self.sink, &snapshot);
        CancelOutcome::Cancelled
    }

    /// Force every non-terminal region to `Cancelled`, then close all
    /// streams. Safe to call more than once.
    pub(crate) fn cancel_all(&self) {
        let mut inner = self.inner.lock().expect("state store poisoned");
        let now = chrono::Utc::now();
        let mut changed = Vec::new();
        for state in inner.states.values_mut() {
            if !state.status.is_terminal() {
                state.status = RegionJobStatus::Cancelled;
                state.last_updated = now;
                changed.push(state.clone());
            }
        }
        for snapshot in &changed {
            Self::broadcast(&mut inner, &*self.sink, snapshot);
        }
        Self::close_inner(&mut inner);
    }

    /// Close all streams without touching region states. Idempotent.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock().expect("state store poisoned");
        Self::close_inner(&mut inner);
    }

    /// Emit a ready-download event. Dropped silently once closed.
    pub(crate) fn emit_download(&self, download: ReadyDownload) {
        let inner = self.inner.lock().expect("state store poisoned");
        if let Some(tx) = &inner.download_tx {
            let _ = tx.send(download);
        }
    }

    /// Report an isolated region failure to the event sink.
    pub(crate) fn region_error(&self, region: &str, error: &ClientError) {
        warn!(region = %region, error = %error, "Region pipeline failed");
        self.sink.on_region_error(region, error);
    }

    /// Snapshot of one region's state.
    pub(crate) fn get(&self, region: &str) -> Option<RegionJobState> {
        self.inner
            .lock()
            .expect("state store poisoned")
            .states
            .get(region)
            .cloned()
    }

    /// Snapshot of all region states.
    pub(crate) fn snapshot(&self) -> HashMap<String, RegionJobState> {
        self.inner
            .lock()
            .expect("state store poisoned")
            .states
            .clone()
    }

    /// Overview recomputed from the current states.
    pub(crate) fn overview(&self) -> JobsOverviewState {
        let inner = self.inner.lock().expect("state store poisoned");
        compute_overview(inner.states.values())
    }

    fn broadcast(inner: &mut StoreInner, sink: &dyn JobEventSink, transitioned: &RegionJobState) {
        sink.on_transition(transitioned);

        let snapshot = inner.states.clone();
        let overview = compute_overview(snapshot.values());
        sink.on_overview(&overview);

        if let Some(tx) = &inner.state_tx {
            tx.send_replace(snapshot);
        }
        if let Some(tx) = &inner.overview_tx {
            tx.send_replace(overview);
        }
    }

    fn close_inner(inner: &mut StoreInner) {
        inner.state_tx.take();
        inner.overview_tx.take();
        inner.download_tx.take();
    }
}
