use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::CompanyId;

/// Employer named by a posting. Unique by name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Normalize a raw company name. Blank names mean "no company".
    pub fn normalize_name(raw: Option<&str>) -> Option<String> {
        raw.map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// Find or create a company by name (handles concurrent writers)
    pub async fn find_or_create(name: &str, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO companies (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(CompanyId::new())
        .bind(name)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_ids(ids: &[CompanyId], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM companies WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
