//! Run command implementation

use crate::client::HttpJobClient;
use crate::events::TracingEventSink;
use crate::manager::{ManagerConfig, RegionJobsManager};
use crate::JobType;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Parse and validate a job type argument
fn parse_job_type(s: &str) -> Result<JobType, String> {
    JobType::from_str(s)
}

/// Reef Analysis Jobs CLI
#[derive(Parser, Debug)]
#[command(name = "reef-analysis-jobs")]
#[command(about = "Launch and track multi-region reef analysis jobs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the backend job API
    #[arg(long, global = true, default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Interval between job status polls in milliseconds (range: 100-60000)
    #[arg(long, global = true, default_value = "2000", value_parser = clap::value_parser!(u64).range(100..=60_000))]
    pub poll_interval_ms: u64,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one analysis job per region and stream ready results
    Run(RunArgs),
}

/// Run command arguments
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Job type: REGIONAL_ASSESSMENT, SITE_SUITABILITY, or DATA_EXPORT
    #[arg(long, default_value = "REGIONAL_ASSESSMENT", value_parser = parse_job_type)]
    pub job_type: JobType,

    /// Comma-separated region identifiers
    #[arg(long, required = true, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Path to a JSON file holding the shared criteria payload (a JSON object)
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Run regions strictly one at a time instead of concurrently
    #[arg(long, default_value_t = false)]
    pub sequential: bool,
}

impl RunArgs {
    /// Execute the run command: fan out one job per region, render progress,
    /// and print each ready download URL as it arrives.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let payload = match &self.payload {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => serde_json::json!({}),
        };

        let client = Arc::new(HttpJobClient::new(&cli.api_url)?);
        let config = ManagerConfig::from_env()
            .with_parallel(!self.sequential)
            .with_poll_interval(Duration::from_millis(cli.poll_interval_ms))
            .with_event_sink(Arc::new(TracingEventSink));

        let manager = Arc::new(RegionJobsManager::new(
            client,
            self.job_type,
            payload,
            self.regions.clone(),
            config,
        )?);

        // Ctrl+C cancels the whole request
        tokio::spawn({
            let manager = Arc::clone(&manager);
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Ctrl+C received - cancelling remaining jobs...");
                    manager.cancel();
                }
            }
        });

        // Print each ready download as soon as its region succeeds
        let printer = manager.take_downloads().map(|mut downloads| {
            tokio::spawn(async move {
                while let Some(ready) = downloads.recv().await {
                    println!("{}\t{}", ready.region, ready.download_url);
                }
            })
        });

        let progress = create_progress_bar(manager.region_count() as u64);
        let mut overview_rx = manager.subscribe_overview();
        loop {
            let overview = overview_rx.borrow_and_update().clone();
            progress.set_position(overview.terminal());
            match overview.estimated_time_remaining {
                Some(secs) => progress.set_message(format!("ETA {secs}s")),
                None => progress.set_message(""),
            }
            // The overview stream closes once every region is terminal
            if overview_rx.changed().await.is_err() {
                break;
            }
        }
        progress.finish_and_clear();

        manager.wait().await;
        if let Some(printer) = printer {
            let _ = printer.await;
        }

        let overview = manager.get_current_overview();
        info!(
            completed = overview.completed,
            failed = overview.failed,
            cancelled = overview.cancelled,
            "Run finished"
        );
        println!(
            "Completed: {} Failed: {} Cancelled: {} (of {} regions)",
            overview.completed, overview.failed, overview.cancelled, overview.total_jobs
        );

        Ok(())
    }
}

/// Create the region progress bar
fn create_progress_bar(total_regions: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_regions);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} regions {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb
}
