use axum::{body::Bytes, extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::common::ErrorReportId;
use crate::domains::error_reports::models::{ErrorReport, NewErrorReport};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::routes::notifications::json_body;

const INVALID_REPORT: &str = "Invalid error report payload. \"message\" is required.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReportResponse {
    pub message: &'static str,
    pub report_id: ErrorReportId,
}

/// POST /errors - client error report
pub async fn report_error(
    Extension(state): Extension<AxumAppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ErrorReportResponse>)> {
    let body = json_body(&body, INVALID_REPORT)?;
    let input = NewErrorReport::from_payload(&body).map_err(ApiError::bad_request)?;

    let report = ErrorReport::create(&input, &state.deps.db_pool)
        .await
        .map_err(|e| ApiError::internal("Internal server error while saving error report.", e))?;

    tracing::info!(report_id = %report.id, platform = ?report.platform, "Error report logged");

    Ok((
        StatusCode::CREATED,
        Json(ErrorReportResponse {
            message: "Error logged successfully.",
            report_id: report.id,
        }),
    ))
}
