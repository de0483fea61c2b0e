use anyhow::{Context, Result};
use async_trait::async_trait;

use super::BaseWeb3CareerClient;

const WEB3CAREER_API_URL: &str = "https://web3.career/api/v1";

/// Web3Career jobs API client. Without a token the source is disabled.
pub struct Web3CareerClient {
    token: Option<String>,
    client: reqwest::Client,
}

impl Web3CareerClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { token, client })
    }
}

/// The list endpoint answers with a JSON array whose third element holds the jobs.
pub fn extract_jobs(body: serde_json::Value) -> Vec<serde_json::Value> {
    match body {
        serde_json::Value::Array(mut items) if items.len() > 2 => match items.swap_remove(2) {
            serde_json::Value::Array(jobs) => jobs,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[async_trait]
impl BaseWeb3CareerClient for Web3CareerClient {
    async fn fetch_jobs(&self) -> Result<Vec<serde_json::Value>> {
        let Some(token) = self.token.as_deref() else {
            tracing::warn!("WEB3CAREER_API_TOKEN not set, skipping Web3Career");
            return Ok(Vec::new());
        };

        let response = self
            .client
            .get(WEB3CAREER_API_URL)
            .query(&[("token", token)])
            .send()
            .await
            .context("Failed to send Web3Career request")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Web3Career API request failed with status: {}", status);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Web3Career response")?;

        let jobs = extract_jobs(body);
        tracing::info!(count = jobs.len(), "Web3Career jobs fetched");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jobs_live_at_index_two() {
        let body = json!(["meta", {"x": 1}, [{"id": 1}, {"id": 2}]]);
        assert_eq!(extract_jobs(body).len(), 2);
    }

    #[test]
    fn unexpected_shapes_yield_nothing() {
        assert!(extract_jobs(json!(["a", "b", "not-an-array"])).is_empty());
        assert!(extract_jobs(json!(["a"])).is_empty());
        assert!(extract_jobs(json!({"jobs": []})).is_empty());
    }

    #[tokio::test]
    async fn missing_token_disables_source() {
        let client = Web3CareerClient::new(None).unwrap();
        assert!(client.fetch_jobs().await.unwrap().is_empty());
    }
}
