use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::kernel::LastIngestion;
use crate::server::app::AxumAppState;

const DB_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub database: DatabaseCheck,
    pub pool: PoolStats,
    /// Absent until this process has completed an ingestion run
    pub last_ingestion: Option<LastIngestion>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolStats {
    fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
            max: pool.options().get_max_connections(),
        }
    }
}

async fn ping(pool: &PgPool) -> Result<(), String> {
    match tokio::time::timeout(DB_PING_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(format!("Query failed: {}", e)),
        Err(_) => Err(format!("Query timeout (>{}s)", DB_PING_TIMEOUT.as_secs())),
    }
}

/// 503 whenever the database does not answer; ingestion history never fails the check.
pub fn health_report(
    database: Result<(), String>,
    pool: PoolStats,
    last_ingestion: Option<LastIngestion>,
) -> (StatusCode, HealthReport) {
    let (status_code, status) = match database {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status_code,
        HealthReport {
            status,
            database: DatabaseCheck {
                ok: database.is_ok(),
                error: database.err(),
            },
            pool,
            last_ingestion,
        },
    )
}

/// GET /health - database ping, pool usage and the last ingestion run
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthReport>) {
    let pool = &state.deps.db_pool;
    let database = ping(pool).await;
    let last_ingestion = state.deps.last_ingestion.read().await.clone();

    let (status_code, report) = health_report(database, PoolStats::of(pool), last_ingestion);
    if status_code != StatusCode::OK {
        tracing::warn!(error = ?report.database.error, "Health check failed");
    }

    (status_code, Json(report))
}
