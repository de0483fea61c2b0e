//! Reddit job source: `[Hiring]` submissions from a list of subreddits.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reddit::Post;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domains::jobs::models::{JobInput, JobMetadataMap, JobSource, MetadataKey};
use crate::domains::notifications::models::NotificationPayload;
use crate::kernel::{BaseJobSource, BaseRedditClient};

pub const SOURCE_NAME: &str = "reddit";
pub const POSTS_PER_SUBREDDIT: u32 = 10;

pub struct RedditJobSource {
    client: Arc<dyn BaseRedditClient>,
    subreddits: Vec<String>,
    hiring_marker: String,
    icon_url: String,
}

impl RedditJobSource {
    pub fn new(
        client: Arc<dyn BaseRedditClient>,
        subreddits: Vec<String>,
        hiring_marker: impl Into<String>,
        icon_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            subreddits,
            hiring_marker: hiring_marker.into(),
            icon_url: icon_url.into(),
        }
    }
}

/// Fetch the newest posts of every subreddit in order. A failing subreddit is
/// logged and skipped.
pub async fn fetch_posts(client: &dyn BaseRedditClient, subreddits: &[String]) -> Vec<Post> {
    let mut posts = Vec::new();
    debug!(count = subreddits.len(), "Fetching posts from subreddits");

    for subreddit in subreddits {
        match client.fetch_new_posts(subreddit, POSTS_PER_SUBREDDIT).await {
            Ok(found) => {
                debug!(subreddit = %subreddit, count = found.len(), "Fetched subreddit");
                posts.extend(found);
            }
            Err(e) => {
                error!(subreddit = %subreddit, error = %e, "Error fetching subreddit");
            }
        }
    }

    posts
}

/// `created_utc` seconds to a timestamp.
pub fn posted_at(created_utc: f64) -> Option<DateTime<Utc>> {
    if !created_utc.is_finite() || created_utc <= 0.0 {
        return None;
    }
    Utc.timestamp_opt(created_utc.trunc() as i64, 0).single()
}

fn count_or_zero(count: Option<i64>) -> String {
    count.unwrap_or(0).to_string()
}

/// Normalize one submission into a job input.
pub fn job_input_from_post(post: &Post) -> JobInput {
    let metadata = JobMetadataMap::new()
        .with(MetadataKey::Subreddit, post.subreddit.clone())
        .with(
            MetadataKey::BodyHtml,
            post.selftext_html.clone().unwrap_or_default(),
        )
        .with(MetadataKey::Upvotes, count_or_zero(post.ups))
        .with(MetadataKey::Downvotes, count_or_zero(post.downs));

    JobInput {
        title: post.title.clone(),
        company: None,
        author: Some(post.author.clone()),
        location: Some(String::new()),
        url: post.url.clone(),
        posted_at: posted_at(post.created_utc),
        description: Some(post.selftext.clone().unwrap_or_default()),
        is_remote: None,
        tags: vec![post.subreddit.clone()],
        metadata,
        source: JobSource {
            name: SOURCE_NAME.to_string(),
            external_id: Some(post.url.clone()),
            data: serde_json::to_value(post).ok(),
        },
    }
}

#[async_trait]
impl BaseJobSource for RedditJobSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<JobInput>> {
        let posts = fetch_posts(self.client.as_ref(), &self.subreddits).await;
        Ok(posts.iter().map(job_input_from_post).collect())
    }

    fn is_of_interest(&self, posting: &JobInput) -> bool {
        posting.title.contains(&self.hiring_marker)
    }

    fn notification_for(&self, posting: &JobInput) -> Option<NotificationPayload> {
        let subreddit = posting
            .metadata
            .get(&MetadataKey::Subreddit)
            .unwrap_or_default();
        let author = posting.author.as_deref().unwrap_or_default();

        Some(
            NotificationPayload::new(
                format!("{} ({})", posting.title, subreddit),
                format!("Posted by /u/{}", author),
                posting.url.clone(),
            )
            .with_icon(&self.icon_url),
        )
    }
}
