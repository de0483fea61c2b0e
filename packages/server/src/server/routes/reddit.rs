use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::{Page, PageArgs};
use crate::domains::reddit::activities::{check_messages, fetch_and_store_posts, PostFetchSummary};
use crate::domains::reddit::models::{MessageType, RedditMessage, RedditPost};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

impl MessageQuery {
    fn type_filter(&self) -> ApiResult<Option<MessageType>> {
        match self.message_type.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request("Invalid message type.")),
        }
    }
}

/// GET /reddit/messages
pub async fn list_messages(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<Json<Page<RedditMessage>>> {
    let message_type = query.type_filter()?;
    let args = PageArgs {
        page: query.page,
        page_size: query.page_size,
    }
    .validate();

    let (messages, total) = RedditMessage::find_page(&args, message_type, &state.deps.db_pool)
        .await
        .map_err(|e| ApiError::internal("Failed to load messages.", e))?;

    Ok(Json(Page::new(messages, total, &args)))
}

#[derive(Serialize)]
pub struct CheckMessagesResponse {
    pub success: bool,
    pub count: usize,
    pub messages: Vec<RedditMessage>,
}

/// GET /reddit/messages/fetch - archive new inbox items
pub async fn fetch_messages(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Json<CheckMessagesResponse>> {
    let messages = check_messages(&state.deps).await.map_err(|e| {
        let message = format!("Failed to check Reddit messages: {}", e);
        ApiError::internal(message, e)
    })?;

    Ok(Json(CheckMessagesResponse {
        success: true,
        count: messages.len(),
        messages,
    }))
}

/// GET /reddit/posts
pub async fn list_posts(
    Extension(state): Extension<AxumAppState>,
    Query(args): Query<PageArgs>,
) -> ApiResult<Json<Page<RedditPost>>> {
    let args = args.validate();

    let (posts, total) = RedditPost::find_page(&args, &state.deps.db_pool)
        .await
        .map_err(|e| ApiError::internal("Failed to load posts.", e))?;

    Ok(Json(Page::new(posts, total, &args)))
}

#[derive(Serialize)]
pub struct FetchPostsResponse {
    pub message: &'static str,
    pub summary: PostFetchSummary,
}

/// GET /reddit/posts/fetch - archive new hiring posts
pub async fn fetch_posts(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Json<FetchPostsResponse>> {
    let summary = fetch_and_store_posts(&state.deps)
        .await
        .map_err(|e| ApiError::internal("An error occurred while fetching posts.", e))?;

    Ok(Json(FetchPostsResponse {
        message: "Posts fetched and stored successfully.",
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_type_means_no_filter() {
        let query = MessageQuery {
            message_type: Some(" ".to_string()),
            ..MessageQuery::default()
        };
        assert_eq!(query.type_filter().unwrap(), None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let query = MessageQuery {
            message_type: Some("chat".to_string()),
            ..MessageQuery::default()
        };
        assert!(query.type_filter().is_err());

        let query = MessageQuery {
            message_type: Some("comment".to_string()),
            ..MessageQuery::default()
        };
        assert_eq!(query.type_filter().unwrap(), Some(MessageType::Comment));
    }
}
