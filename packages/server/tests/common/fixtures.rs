//! Test fixtures for creating test data.

use jobboard_core::domains::jobs::models::{JobInput, JobMetadataMap, JobSource, MetadataKey};
use serde_json::json;
use uuid::Uuid;

/// A url no other test uses; the shared database is never truncated.
pub fn unique_url(prefix: &str) -> String {
    format!("https://jobs.test/{}/{}", prefix, Uuid::new_v4())
}

pub fn job_input(title: &str, url: &str) -> JobInput {
    JobInput {
        title: title.to_string(),
        company: Some("Acme".to_string()),
        author: Some("u1".to_string()),
        location: Some("Remote".to_string()),
        url: url.to_string(),
        description: Some("Build things".to_string()),
        is_remote: Some(true),
        tags: vec!["rust".to_string(), "backend".to_string()],
        metadata: JobMetadataMap::new()
            .with(MetadataKey::Country, "US")
            .with(MetadataKey::City, "Minneapolis"),
        source: JobSource {
            name: "web3career".to_string(),
            external_id: Some("42".to_string()),
            data: Some(json!({"id": 42})),
        },
        ..JobInput::default()
    }
}
