//! Inbox check: archive new private messages and comment replies, then
//! announce each one to every subscriber.

use anyhow::Result;
use futures::future::try_join;
use reddit::InboxFilter;
use tracing::{debug, info, warn};

use crate::domains::notifications::activities::notify_subscribers;
use crate::domains::notifications::models::NotificationPayload;
use crate::domains::reddit::models::{NewRedditMessage, RedditMessage};
use crate::kernel::ServerDeps;

pub fn message_notification(message: &NewRedditMessage) -> NotificationPayload {
    NotificationPayload::new(
        format!("New {} from /u/{}", message.message_type, message.author),
        message.content.clone(),
        message.context_url.clone().unwrap_or_default(),
    )
}

/// Fetch both inbox folders and store what is new. Fails when the account
/// is not configured or the inbox cannot be read; a single bad item is
/// logged and skipped.
pub async fn check_messages(deps: &ServerDeps) -> Result<Vec<RedditMessage>> {
    if !deps.reddit.has_credentials() {
        anyhow::bail!("Reddit credentials are not configured");
    }

    let (messages, comments) = try_join(
        deps.reddit.fetch_inbox(InboxFilter::Messages),
        deps.reddit.fetch_inbox(InboxFilter::Comments),
    )
    .await?;
    debug!(
        messages = messages.len(),
        comments = comments.len(),
        "Fetched reddit inbox"
    );

    let mut stored = Vec::new();
    let mut payloads = Vec::new();

    for item in messages.iter().chain(comments.iter()) {
        let input = NewRedditMessage::from_inbox_item(item);

        match RedditMessage::insert(&input, &deps.db_pool).await {
            Ok(Some(message)) => {
                debug!(reddit_id = %message.reddit_id, author = %message.author, "Stored new {}", message.message_type);
                payloads.push(message_notification(&input));
                stored.push(message);
            }
            Ok(None) => {}
            Err(e) => warn!(reddit_id = %item.name, error = %e, "Error processing message"),
        }
    }

    let notifications = notify_subscribers(&payloads, deps).await?;
    info!(
        stored = stored.len(),
        delivered = notifications.delivered,
        "Reddit inbox checked"
    );

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{inbox_item, MockRedditClient, TestDependencies};

    #[test]
    fn notification_names_type_and_author() {
        let input = NewRedditMessage::from_inbox_item(&inbox_item("t4_1", Some("alice"), "hi"));

        let payload = message_notification(&input);

        assert_eq!(payload.title, "New private_message from /u/alice");
        assert_eq!(payload.body, "hi");
        assert_eq!(payload.url, "/message/messages/t4_1");
    }

    #[tokio::test]
    async fn missing_credentials_is_an_error() {
        let deps = TestDependencies::new()
            .mock_reddit(MockRedditClient::new().without_credentials())
            .into_deps();

        let err = check_messages(&deps).await.unwrap_err();

        assert!(err.to_string().contains("credentials"));
    }

    #[tokio::test]
    async fn unreadable_inbox_is_an_error() {
        let deps = TestDependencies::new()
            .mock_reddit(MockRedditClient::new().with_inbox_failure())
            .into_deps();

        assert!(check_messages(&deps).await.is_err());
    }
}
