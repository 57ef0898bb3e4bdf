//! Per-region job pipeline.
//!
//! Drives exactly one region's backend job from submission to a terminal
//! state: create (with retry) -> poll until the backend reports a terminal
//! status -> locate results (with retry) -> emit the ready download. All
//! failures are captured into the region's state; nothing propagates out of
//! the pipeline task, so one region's failure never aborts the others.

use super::config::ManagerConfig;
use super::store::StateStore;
use crate::cancel::CancelToken;
use crate::client::{ClientError, JobClient, JobStatusCode};
use crate::{JobType, ReadyDownload, RegionJobStatus};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Shared inputs for every region pipeline of one manager instance.
pub(crate) struct PipelineContext {
    pub(crate) client: Arc<dyn JobClient>,
    pub(crate) store: Arc<StateStore>,
    pub(crate) job_type: JobType,
    /// Base criteria payload; `region` is injected per pipeline
    pub(crate) payload: serde_json::Map<String, Value>,
    pub(crate) config: ManagerConfig,
    pub(crate) manager_cancel: CancelToken,
}

/// Map a non-terminal backend status onto the region lifecycle.
fn observed_status(code: JobStatusCode) -> Option<RegionJobStatus> {
    match code {
        JobStatusCode::Pending => Some(RegionJobStatus::Pending),
        JobStatusCode::InProgress => Some(RegionJobStatus::InProgress),
        _ => None,
    }
}

/// Wait until either the manager or this region is cancelled.
async fn cancelled(manager: &CancelToken, region: &CancelToken) {
    tokio::select! {
        _ = manager.cancelled() => {}
        _ = region.cancelled() => {}
    }
}

/// Mark a region failed and report the isolated error.
fn fail_region(ctx: &PipelineContext, region: &str, error: &ClientError, what: &str) {
    let message = format!("{what}: {error}");
    let applied = ctx.store.apply(region, |s| {
        s.status = RegionJobStatus::Failed;
        s.error = Some(message.clone());
    });
    if applied {
        ctx.store.region_error(region, error);
    }
}

/// Drive one region's job to a terminal state.
pub(crate) async fn run_region_pipeline(
    ctx: &PipelineContext,
    region: String,
    region_cancel: CancelToken,
) {
    let span = tracing::info_span!("region_pipeline", region = %region, job_type = %ctx.job_type);
    drive(ctx, region, region_cancel).instrument(span).await
}

async fn drive(ctx: &PipelineContext, region: String, region_cancel: CancelToken) {
    if ctx.manager_cancel.is_cancelled() || region_cancel.is_cancelled() {
        return;
    }
    if !ctx.store.begin_region(&region, ctx.job_type) {
        return;
    }
    debug!("Region pipeline started");

    // Inject the region into the shared criteria payload
    let mut payload = ctx.payload.clone();
    payload.insert("region".to_string(), Value::String(region.clone()));
    let payload = Value::Object(payload);

    // Create the backend job, retrying transient failures
    let create = {
        let client = Arc::clone(&ctx.client);
        let job_type = ctx.job_type;
        ctx.config.create_retry.run(
            move || {
                let client = Arc::clone(&client);
                let payload = payload.clone();
                async move { client.start_job(job_type, payload).await }
            },
            |_, error| {
                ctx.store.apply(&region, |s| {
                    s.retry_count += 1;
                    s.error = Some(error.to_string());
                });
            },
        )
    };
    let record = tokio::select! {
        _ = cancelled(&ctx.manager_cancel, &region_cancel) => return,
        result = create => match result {
            Ok(record) => record,
            Err(e) => {
                fail_region(ctx, &region, &e, "job creation failed");
                return;
            }
        },
    };

    let job_id = record.id.clone();
    let mut status = record.status;
    ctx.store.apply(&region, |s| {
        s.job_id = Some(job_id.clone());
        if let Some(mapped) = observed_status(status) {
            s.status = mapped;
        }
    });
    debug!(job_id = %job_id, backend_status = %status, "Job created");

    // Poll until the backend reports a terminal status
    while !status.is_terminal() {
        tokio::select! {
            _ = cancelled(&ctx.manager_cancel, &region_cancel) => return,
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
        }

        let polled = tokio::select! {
            _ = cancelled(&ctx.manager_cancel, &region_cancel) => return,
            result = ctx.client.get_job(&job_id) => result,
        };
        match polled {
            Ok(current) => {
                status = current.status;
                if let Some(mapped) = observed_status(status) {
                    ctx.store.apply(&region, |s| s.status = mapped);
                }
            }
            Err(e) if e.is_transient() => {
                // Transient poll failure: the job is still running, keep watching
                debug!(error = %e, "Job poll failed, will poll again");
            }
            Err(e) => {
                fail_region(ctx, &region, &e, "job poll failed");
                return;
            }
        }
    }

    match status {
        JobStatusCode::Succeeded => {
            fetch_results(ctx, &region, &region_cancel, job_id).await;
        }
        JobStatusCode::Failed => {
            ctx.store.apply(&region, |s| {
                s.status = RegionJobStatus::Failed;
                s.error = Some("backend reported job failure".to_string());
            });
        }
        JobStatusCode::Cancelled => {
            ctx.store
                .apply(&region, |s| s.status = RegionJobStatus::Cancelled);
        }
        JobStatusCode::Pending | JobStatusCode::InProgress => unreachable!("status is terminal"),
    }
}

/// Locate result artifacts for a succeeded job and emit the ready download.
async fn fetch_results(
    ctx: &PipelineContext,
    region: &str,
    region_cancel: &CancelToken,
    job_id: String,
) {
    let download = {
        let client = Arc::clone(&ctx.client);
        let job_id = job_id.clone();
        ctx.config.download_retry.run(
            move || {
                let client = Arc::clone(&client);
                let job_id = job_id.clone();
                async move { client.download_job_results(&job_id).await }
            },
            |_, error| {
                ctx.store.apply(region, |s| {
                    s.retry_count += 1;
                    s.error = Some(error.to_string());
                });
            },
        )
    };
    let results = tokio::select! {
        _ = cancelled(&ctx.manager_cancel, region_cancel) => return,
        result = download => match result {
            Ok(results) => results,
            Err(e) => {
                fail_region(ctx, region, &e, "result download failed");
                return;
            }
        },
    };

    let Some(url) = results.primary_url().map(str::to_string) else {
        let error = ClientError::InvalidResponse(format!(
            "job {job_id} reported success but returned no result files"
        ));
        fail_region(ctx, region, &error, "result download failed");
        return;
    };

    // Single transition carries both the terminal status and the URL so the
    // download-url-iff-succeeded invariant holds for every emitted snapshot
    let applied = ctx.store.apply(region, |s| {
        s.status = RegionJobStatus::Succeeded;
        s.download_url = Some(url.clone());
    });
    if applied {
        info!(job_id = %job_id, url = %url, "Region job succeeded");
        ctx.store.emit_download(ReadyDownload {
            region: region.to_string(),
            job_id,
            download_url: url,
            files: results.files,
        });
    }
}
