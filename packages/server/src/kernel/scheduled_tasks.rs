//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The only periodic task is job ingestion. It is enabled by `INGEST_CRON`;
//! without it an external scheduler is expected to call `GET /jobs/fetch`.
//!
//! ```text
//! Scheduler (INGEST_CRON)
//!     │
//!     └─► ingest_jobs()
//!             └─► fetch → filter → upsert → notify
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::jobs::activities::ingest_jobs;
use crate::kernel::ServerDeps;

/// Start the ingestion schedule. `cron` uses the six-field form
/// (`sec min hour day month weekday`).
pub async fn start_scheduler(cron: &str, deps: Arc<ServerDeps>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let ingest_job = Job::new_async(cron, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            run_scheduled_ingest(&deps).await;
        })
    })
    .with_context(|| format!("Invalid INGEST_CRON expression: {}", cron))?;

    scheduler.add(ingest_job).await?;
    scheduler.start().await?;

    tracing::info!(cron = %cron, "Scheduled job ingestion started");
    Ok(scheduler)
}

async fn run_scheduled_ingest(deps: &ServerDeps) {
    tracing::info!("Running scheduled job ingestion");

    match ingest_jobs(deps).await {
        Ok(summary) => tracing::info!(
            inserted = summary.inserted(),
            delivered = summary.notifications.delivered,
            "Scheduled job ingestion finished"
        ),
        Err(e) => tracing::error!(error = %e, "Scheduled job ingestion failed"),
    }
}
