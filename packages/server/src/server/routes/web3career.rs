use axum::{extract::Extension, Json};

use crate::domains::sources::web3career::{listings_from_raw, Web3CareerListing};
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};

/// GET /web3career - live, unsaved view of the upstream list
pub async fn list_web3career_jobs(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Json<Vec<Web3CareerListing>>> {
    let raw = state
        .deps
        .web3career
        .fetch_jobs()
        .await
        .map_err(|e| ApiError::internal("An error occurred while fetching data", e))?;

    Ok(Json(listings_from_raw(&raw)))
}
