//! Web3Career job source. Stored silently; never notifies.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::domains::jobs::models::{JobInput, JobMetadataMap, JobSource, MetadataKey};
use crate::kernel::{BaseJobSource, BaseWeb3CareerClient};

pub const SOURCE_NAME: &str = "web3career";

pub struct Web3CareerJobSource {
    client: Arc<dyn BaseWeb3CareerClient>,
}

impl Web3CareerJobSource {
    pub fn new(client: Arc<dyn BaseWeb3CareerClient>) -> Self {
        Self { client }
    }
}

fn str_field(job: &Value, name: &str) -> Option<String> {
    job.get(name).and_then(Value::as_str).map(str::to_string)
}

/// JavaScript-style truthiness, as the API mixes booleans, numbers and strings.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Scalar as text; falsy values become "".
fn scalar_text(value: Option<&Value>) -> String {
    if !truthy(value) {
        return String::new();
    }
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn parse_date(job: &Value) -> Option<DateTime<Utc>> {
    if let Some(raw) = job.get("date").and_then(Value::as_str) {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    let epoch = match job.get("date_epoch") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }?;
    Utc.timestamp_opt(epoch, 0).single()
}

/// Normalize one raw job. Jobs without an apply url cannot be keyed and are skipped.
pub fn job_input_from_raw(job: &Value) -> Option<JobInput> {
    let url = str_field(job, "apply_url").filter(|u| !u.is_empty())?;

    let tags = job
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let metadata = JobMetadataMap::new()
        .with(MetadataKey::Country, scalar_text(job.get("country")))
        .with(MetadataKey::City, scalar_text(job.get("city")))
        .with(MetadataKey::DateEpoch, scalar_text(job.get("date_epoch")));

    let external_id = truthy(job.get("id")).then(|| scalar_text(job.get("id")));

    Some(JobInput {
        title: str_field(job, "title").unwrap_or_default(),
        company: str_field(job, "company"),
        author: Some(String::new()),
        location: str_field(job, "location"),
        url,
        posted_at: parse_date(job),
        description: str_field(job, "description"),
        is_remote: Some(truthy(job.get("is_remote"))),
        tags,
        metadata,
        source: JobSource {
            name: SOURCE_NAME.to_string(),
            external_id,
            data: Some(job.clone()),
        },
    })
}

/// Listing shape served by the live `/web3career` proxy.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Web3CareerListing {
    pub id: Value,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: String,
    pub date: Option<Value>,
    pub date_epoch: Option<Value>,
    pub is_remote: Option<Value>,
    pub apply_url: Option<String>,
    pub description: Option<String>,
}

/// Jobs without an id are dropped. Location falls back to city, then country, then "Remote".
pub fn listings_from_raw(jobs: &[Value]) -> Vec<Web3CareerListing> {
    jobs.iter()
        .filter(|job| truthy(job.get("id")))
        .map(|job| {
            let location = ["location", "city", "country"]
                .iter()
                .filter_map(|field| str_field(job, field))
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| "Remote".to_string());

            Web3CareerListing {
                id: job.get("id").cloned().unwrap_or(Value::Null),
                title: str_field(job, "title"),
                company: str_field(job, "company"),
                location,
                date: job.get("date").cloned(),
                date_epoch: job.get("date_epoch").cloned(),
                is_remote: job.get("is_remote").cloned(),
                apply_url: str_field(job, "apply_url"),
                description: str_field(job, "description"),
            }
        })
        .collect()
}

#[async_trait]
impl BaseJobSource for Web3CareerJobSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<JobInput>> {
        let raw = self.client.fetch_jobs().await?;

        let mut inputs = Vec::with_capacity(raw.len());
        for job in &raw {
            match job_input_from_raw(job) {
                Some(input) => inputs.push(input),
                None => {
                    let id = job.get("id").cloned().unwrap_or(Value::Null);
                    warn!(id = %id, "Skipping Web3Career job without apply_url");
                }
            }
        }
        Ok(inputs)
    }
}
