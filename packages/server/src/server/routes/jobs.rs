use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Serialize;

use crate::common::{JobId, Page, PageArgs};
use crate::domains::jobs::activities::{ingest_jobs, IngestSummary};
use crate::domains::jobs::models::JobWithRelations;
use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};

/// GET /jobs - newest first, with company, tags and metadata
pub async fn list_jobs(
    Extension(state): Extension<AxumAppState>,
    Query(args): Query<PageArgs>,
) -> ApiResult<Json<Page<JobWithRelations>>> {
    let args = args.validate();
    let page = state
        .deps
        .jobs
        .find_page(&args)
        .await
        .map_err(|e| ApiError::internal("Failed to load jobs.", e))?;
    Ok(Json(page))
}

/// GET /jobs/:id
pub async fn get_job(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobWithRelations>> {
    let id = JobId::parse(&id).map_err(|_| ApiError::bad_request("Invalid job id."))?;

    let job = state
        .deps
        .jobs
        .find_by_id(id)
        .await
        .map_err(|e| ApiError::internal("Failed to load job.", e))?;

    job.map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found."))
}

#[derive(Serialize)]
pub struct FetchJobsResponse {
    pub message: &'static str,
    pub summary: IngestSummary,
}

/// GET /jobs/fetch - run the ingestion pipeline now
pub async fn fetch_jobs(
    Extension(state): Extension<AxumAppState>,
) -> ApiResult<Json<FetchJobsResponse>> {
    tracing::info!("Starting the job fetch route");

    let summary = ingest_jobs(&state.deps)
        .await
        .map_err(|e| ApiError::internal("An error occurred while fetching jobs.", e))?;

    Ok(Json(FetchJobsResponse {
        message: "All jobs fetched and stored successfully.",
        summary,
    }))
}
