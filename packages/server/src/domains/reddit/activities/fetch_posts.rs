//! Legacy post fetch: archive hiring posts into `reddit_posts` and announce
//! the ones not seen before.

use anyhow::Result;
use reddit::Post;
use serde::Serialize;
use tracing::{info, warn};

use crate::domains::notifications::activities::{notify_subscribers, DispatchSummary};
use crate::domains::notifications::models::NotificationPayload;
use crate::domains::reddit::models::RedditPost;
use crate::domains::sources::reddit::fetch_posts;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFetchSummary {
    pub fetched: usize,
    pub hiring: usize,
    pub stored: usize,
    pub notifications: DispatchSummary,
}

pub fn post_notification(post: &Post) -> NotificationPayload {
    NotificationPayload::new(
        format!("New [Hiring] post in {}", post.subreddit),
        post.title.clone(),
        post.url.clone(),
    )
}

/// Posts whose title carries the hiring marker, first occurrence of each url.
pub fn hiring_posts<'a>(posts: &'a [Post], marker: &str) -> Vec<&'a Post> {
    let mut seen = std::collections::HashSet::new();
    posts
        .iter()
        .filter(|post| post.title.contains(marker))
        .filter(|post| seen.insert(post.url.as_str()))
        .collect()
}

pub async fn fetch_and_store_posts(deps: &ServerDeps) -> Result<PostFetchSummary> {
    let posts = fetch_posts(deps.reddit.as_ref(), &deps.job_subreddits).await;
    let hiring = hiring_posts(&posts, &deps.hiring_marker);

    let mut summary = PostFetchSummary {
        fetched: posts.len(),
        hiring: hiring.len(),
        ..PostFetchSummary::default()
    };
    let mut payloads = Vec::new();

    for post in hiring {
        match RedditPost::insert_from_post(post, &deps.db_pool).await {
            Ok(Some(_)) => {
                summary.stored += 1;
                payloads.push(post_notification(post));
            }
            Ok(None) => {}
            Err(e) => warn!(url = %post.url, error = %e, "Error storing reddit post"),
        }
    }

    summary.notifications = notify_subscribers(&payloads, deps).await?;
    info!(
        fetched = summary.fetched,
        stored = summary.stored,
        "Reddit posts fetched"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::reddit_post;

    #[test]
    fn only_marked_posts_are_kept_once() {
        let posts = vec![
            reddit_post("forhire", "[Hiring] Rust", "https://x/1", "a"),
            reddit_post("forhire", "[For Hire] Me", "https://x/2", "b"),
            reddit_post("remotejs", "[Hiring] Rust", "https://x/1", "a"),
        ];

        let kept = hiring_posts(&posts, "[Hiring]");

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://x/1");
    }

    #[test]
    fn notification_names_the_subreddit() {
        let post = reddit_post("remotejs", "[Hiring] Frontend", "https://x/3", "c");

        let payload = post_notification(&post);

        assert_eq!(payload.title, "New [Hiring] post in remotejs");
        assert_eq!(payload.body, "[Hiring] Frontend");
        assert_eq!(payload.url, "https://x/3");
    }
}
