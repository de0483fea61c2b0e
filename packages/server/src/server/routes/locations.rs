use axum::{body::Bytes, extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::domains::locations::models::{Location, LocationReport};
use crate::domains::notifications::models::Subscription;
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::ClientIp;
use crate::server::routes::notifications::json_body;

const INVALID_LOCATION: &str = "Invalid location data.";

#[derive(Serialize)]
pub struct LocationResponse {
    pub message: &'static str,
    pub location: Location,
}

/// POST /location - device location for an FCM subscription
pub async fn report_location(
    Extension(state): Extension<AxumAppState>,
    client_ip: Option<Extension<ClientIp>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<LocationResponse>)> {
    let body = json_body(&body, INVALID_LOCATION)?;
    let report = LocationReport::from_body(&body).map_err(ApiError::bad_request)?;

    let Some(token) = report.token() else {
        return Err(ApiError::not_found("Subscription not found."));
    };

    let pool = &state.deps.db_pool;
    let subscription = Subscription::find_by_token(token, pool)
        .await
        .map_err(|e| ApiError::internal("Failed to save location.", e))?;

    let Some(subscription) = subscription else {
        tracing::info!(token = %token, "Subscription not found for location report");
        return Err(ApiError::not_found("Subscription not found."));
    };

    let ip_address = client_ip.map(|Extension(ClientIp(ip))| ip.to_string());
    let location = Location::create(subscription.id, &report, ip_address.as_deref(), pool)
        .await
        .map_err(|e| ApiError::internal("Failed to save location.", e))?;

    tracing::debug!(location_id = %location.id, subscription_id = %subscription.id, "Location added");

    Ok((
        StatusCode::CREATED,
        Json(LocationResponse {
            message: "Location added successfully.",
            location,
        }),
    ))
}
