use axum::{body::Bytes, extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::domains::notifications::activities::{notify_all_subscribers, DispatchSummary};
use crate::domains::notifications::models::{NewSubscription, NotificationPayload, Subscription};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::ClientIp;

/// Parse a JSON body without the extractor's plain-text rejections.
pub(crate) fn json_body(body: &Bytes, invalid: &'static str) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request(invalid))
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
    pub data: Subscription,
}

/// POST /notifications/subscribe
pub async fn subscribe(
    Extension(state): Extension<AxumAppState>,
    client_ip: Option<Extension<ClientIp>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SubscribeResponse>)> {
    let body = json_body(&body, "Invalid subscription data.")?;
    let ip_address = client_ip.map(|Extension(ClientIp(ip))| ip.to_string());

    let input = NewSubscription::from_request(&body, ip_address).map_err(ApiError::bad_request)?;

    let subscription = state
        .deps
        .subscriptions
        .upsert(&input)
        .await
        .map_err(|e| ApiError::internal("Failed to save subscription.", e))?;

    tracing::info!(
        subscription_id = %subscription.id,
        subscription_type = %subscription.subscription_type,
        "Subscription saved"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            message: "Subscription added.",
            data: subscription,
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

/// GET /notifications/get-public-key
pub async fn get_public_key(Extension(state): Extension<AxumAppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.deps.vapid_public_key.clone(),
    })
}

#[derive(Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: &'static str,
    pub summary: DispatchSummary,
}

fn required_text<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// POST /notifications/send - mass notification
pub async fn send_notification(
    Extension(state): Extension<AxumAppState>,
    body: Bytes,
) -> ApiResult<Json<SendResponse>> {
    const MISSING: &str = "Missing required fields";

    let body = json_body(&body, MISSING)?;
    let (Some(title), Some(text), Some(url)) = (
        required_text(&body, "title"),
        required_text(&body, "body"),
        required_text(&body, "url"),
    ) else {
        return Err(ApiError::bad_request(MISSING));
    };

    let payload = NotificationPayload::new(title, text, url);
    let summary = notify_all_subscribers(&payload, &state.deps)
        .await
        .map_err(|e| ApiError::internal("Internal Server Error", e))?;

    Ok(Json(SendResponse {
        success: true,
        message: "Notifications sent successfully",
        summary,
    }))
}
