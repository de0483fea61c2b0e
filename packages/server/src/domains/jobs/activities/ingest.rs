//! Job ingestion pipeline
//!
//! Walks every configured source in order: fetch, keep postings of interest,
//! upsert each one on its own, and collect a notification for every newly
//! inserted posting whose source notifies. The collected notifications are
//! then fanned out to every current subscription.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info};

use crate::domains::notifications::activities::{notify_subscribers, DispatchSummary};
use crate::domains::notifications::models::NotificationPayload;
use crate::kernel::{BaseJobSource, LastIngestion, ServerDeps};

/// Counters for one source within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: String,
    pub fetched: usize,
    pub of_interest: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    /// Set when the whole source could not be fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceSummary {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub sources: Vec<SourceSummary>,
    pub notifications: DispatchSummary,
}

impl IngestSummary {
    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn source(&self, name: &str) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.source == name)
    }

    fn as_last_ingestion(&self) -> LastIngestion {
        LastIngestion {
            finished_at: Utc::now(),
            inserted: self.inserted(),
            updated: self.sources.iter().map(|s| s.updated).sum(),
            failed_sources: self.sources.iter().filter(|s| s.error.is_some()).count(),
            delivered: self.notifications.delivered,
        }
    }
}

/// Fetch, upsert and notify for one source. Urls already handled earlier in
/// the run are skipped so a repeated posting is stored and announced once.
async fn ingest_source(
    source: &dyn BaseJobSource,
    seen_urls: &mut HashSet<String>,
    payloads: &mut Vec<NotificationPayload>,
    deps: &ServerDeps,
) -> SourceSummary {
    let mut summary = SourceSummary::new(source.name());

    let inputs = match source.fetch().await {
        Ok(inputs) => inputs,
        Err(e) => {
            error!(source = source.name(), error = %e, "Error fetching jobs from source");
            summary.error = Some(e.to_string());
            return summary;
        }
    };
    summary.fetched = inputs.len();

    for input in inputs.iter().filter(|input| source.is_of_interest(input)) {
        summary.of_interest += 1;

        if !seen_urls.insert(input.url.clone()) {
            continue;
        }

        match deps.jobs.upsert_job(input).await {
            Ok(outcome) if outcome.inserted => {
                summary.inserted += 1;
                if let Some(payload) = source.notification_for(input) {
                    payloads.push(payload);
                }
            }
            Ok(_) => summary.updated += 1,
            Err(e) => {
                error!(source = source.name(), url = %input.url, error = %e, "Failed to save job");
                summary.failed += 1;
            }
        }
    }

    info!(
        source = %summary.source,
        fetched = summary.fetched,
        of_interest = summary.of_interest,
        inserted = summary.inserted,
        updated = summary.updated,
        failed = summary.failed,
        "Source ingested"
    );

    summary
}

/// Run the whole pipeline once.
///
/// Runs are serialized within the process; a concurrent call waits for the
/// running one. Errors only when subscriptions cannot be loaded.
pub async fn ingest_jobs(deps: &ServerDeps) -> Result<IngestSummary> {
    let _guard = deps.ingest_lock.lock().await;
    info!(sources = deps.job_sources.len(), "Starting job ingestion");

    let mut seen_urls = HashSet::new();
    let mut payloads = Vec::new();
    let mut summary = IngestSummary::default();

    for source in &deps.job_sources {
        let source_summary =
            ingest_source(source.as_ref(), &mut seen_urls, &mut payloads, deps).await;
        summary.sources.push(source_summary);
    }

    summary.notifications = notify_subscribers(&payloads, deps).await?;
    *deps.last_ingestion.write().await = Some(summary.as_last_ingestion());

    info!(
        inserted = summary.inserted(),
        delivered = summary.notifications.delivered,
        pruned = summary.notifications.pruned,
        failed = summary.notifications.failed,
        "Job ingestion complete"
    );

    Ok(summary)
}
