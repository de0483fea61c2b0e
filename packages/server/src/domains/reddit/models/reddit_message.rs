use anyhow::Result;
use chrono::{DateTime, Utc};
use reddit::InboxItem;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{RedditMessageId, ValidatedPageArgs};

pub const DELETED_AUTHOR: &str = "[deleted]";
const REDDIT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    PrivateMessage,
    Comment,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::PrivateMessage => write!(f, "private_message"),
            MessageType::Comment => write!(f, "comment"),
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private_message" => Ok(MessageType::PrivateMessage),
            "comment" => Ok(MessageType::Comment),
            _ => Err(anyhow::anyhow!("Invalid message type: {}", s)),
        }
    }
}

/// Inbox item archived from the authenticated account. Append-only, unique by `reddit_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedditMessage {
    pub id: RedditMessageId,
    /// Reddit fullname (`t4_…` or `t1_…`)
    pub reddit_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub message_type: String,
    pub author: String,
    pub content: String,
    pub body_html: Option<String>,
    pub subreddit: Option<String>,
    pub parent_id: Option<String>,
    pub context_url: Option<String>,
    pub is_read: bool,
    pub raw_data: Option<serde_json::Value>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row to insert for an inbox item
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedditMessage {
    pub reddit_id: String,
    pub message_type: MessageType,
    pub author: String,
    pub content: String,
    pub body_html: Option<String>,
    pub subreddit: Option<String>,
    pub parent_id: Option<String>,
    pub context_url: Option<String>,
    pub is_read: bool,
    pub raw_data: serde_json::Value,
    pub sent_at: Option<DateTime<Utc>>,
}

impl NewRedditMessage {
    pub fn from_inbox_item(item: &InboxItem) -> Self {
        let is_message = item.is_private_message();
        let message_type = if is_message {
            MessageType::PrivateMessage
        } else {
            MessageType::Comment
        };

        let context_url = if is_message {
            item.context.clone().filter(|c| !c.is_empty())
        } else {
            item.permalink
                .as_deref()
                .map(|permalink| format!("{}{}", REDDIT_BASE_URL, permalink))
        };

        Self {
            reddit_id: item.name.clone(),
            message_type,
            author: item
                .author
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DELETED_AUTHOR.to_string()),
            content: item.body.clone(),
            body_html: item.body_html.clone(),
            subreddit: item.subreddit.clone(),
            parent_id: item.parent_id.clone(),
            context_url,
            // Only private messages carry a read flag
            is_read: is_message && item.new == Some(false),
            raw_data: serde_json::to_value(item).unwrap_or(serde_json::Value::Null),
            sent_at: crate::domains::sources::reddit::posted_at(item.created_utc),
        }
    }
}

impl RedditMessage {
    /// Insert unless already archived. Returns `None` for a known `reddit_id`.
    pub async fn insert(input: &NewRedditMessage, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO reddit_messages (
                id, reddit_id, type, author, content, body_html, subreddit,
                parent_id, context_url, is_read, raw_data, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (reddit_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(RedditMessageId::new())
        .bind(&input.reddit_id)
        .bind(input.message_type.to_string())
        .bind(&input.author)
        .bind(&input.content)
        .bind(&input.body_html)
        .bind(&input.subreddit)
        .bind(&input.parent_id)
        .bind(&input.context_url)
        .bind(input.is_read)
        .bind(&input.raw_data)
        .bind(input.sent_at)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Newest first, optionally restricted to one type. The total honours the filter.
    pub async fn find_page(
        args: &ValidatedPageArgs,
        message_type: Option<MessageType>,
        pool: &PgPool,
    ) -> Result<(Vec<Self>, i64)> {
        let type_filter = message_type.map(|t| t.to_string());

        let messages = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM reddit_messages
            WHERE ($1::text IS NULL OR type = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&type_filter)
        .bind(args.limit())
        .bind(args.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reddit_messages WHERE ($1::text IS NULL OR type = $1)",
        )
        .bind(&type_filter)
        .fetch_one(pool)
        .await?;

        Ok((messages, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::inbox_item;

    #[test]
    fn private_message_uses_context_and_read_flag() {
        let mut item = inbox_item("t4_abc", Some("alice"), "hello");
        item.new = Some(false);

        let message = NewRedditMessage::from_inbox_item(&item);

        assert_eq!(message.message_type, MessageType::PrivateMessage);
        assert_eq!(message.context_url.as_deref(), Some("/message/messages/t4_abc"));
        assert!(message.is_read);
    }

    #[test]
    fn comment_reply_links_to_permalink_and_is_unread() {
        let item = inbox_item("t1_xyz", Some("bob"), "nice post");

        let message = NewRedditMessage::from_inbox_item(&item);

        assert_eq!(message.message_type, MessageType::Comment);
        assert_eq!(
            message.context_url.as_deref(),
            Some("https://www.reddit.com/r/forhire/comments/t1_xyz/")
        );
        assert!(!message.is_read);
    }

    #[test]
    fn missing_author_becomes_deleted() {
        let item = inbox_item("t4_gone", None, "who am i");

        assert_eq!(NewRedditMessage::from_inbox_item(&item).author, "[deleted]");
    }

    #[test]
    fn message_type_round_trips_through_text() {
        assert_eq!(
            "private_message".parse::<MessageType>().unwrap(),
            MessageType::PrivateMessage
        );
        assert_eq!(MessageType::Comment.to_string(), "comment");
        assert!("chat".parse::<MessageType>().is_err());
    }
}
