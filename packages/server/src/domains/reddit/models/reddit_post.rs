use anyhow::Result;
use chrono::{DateTime, Utc};
use reddit::Post;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{RedditPostId, ValidatedPageArgs};
use crate::domains::sources::reddit::posted_at;

/// Hiring post archived by the legacy post fetch. Append-only, unique by `url`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub id: RedditPostId,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub url: String,
    pub body: Option<String>,
    pub body_html: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RedditPost {
    /// Insert unless the url is already archived. Returns `None` for a known url.
    pub async fn insert_from_post(post: &Post, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO reddit_posts (
                id, title, author, subreddit, url, body, body_html, upvotes, downvotes, posted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(RedditPostId::new())
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.subreddit)
        .bind(&post.url)
        .bind(&post.selftext)
        .bind(&post.selftext_html)
        .bind(post.ups.unwrap_or(0))
        .bind(post.downs.unwrap_or(0))
        .bind(posted_at(post.created_utc))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_page(args: &ValidatedPageArgs, pool: &PgPool) -> Result<(Vec<Self>, i64)> {
        let posts = sqlx::query_as::<_, Self>(
            "SELECT * FROM reddit_posts ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(args.limit())
        .bind(args.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reddit_posts")
            .fetch_one(pool)
            .await?;

        Ok((posts, total))
    }
}
