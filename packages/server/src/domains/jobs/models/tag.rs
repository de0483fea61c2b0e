use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{JobId, JobTagId, TagId};

/// Free-form label attached to jobs (a subreddit, a skill, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Job <-> Tag link. Unique on (job_id, tag_id).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobTag {
    pub id: JobTagId,
    pub job_id: JobId,
    pub tag_id: TagId,
    pub created_at: DateTime<Utc>,
}

/// Helper struct for batch-loading tags with their job id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagWithJobId {
    pub job_id: JobId,
    #[sqlx(flatten)]
    pub tag: Tag,
}

impl Tag {
    /// Normalize tag names: trimmed, non-empty, first occurrence wins.
    pub fn normalize_names(raw: &[String]) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(raw.len());
        for name in raw.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub async fn find_or_create(name: &str, conn: &mut PgConnection) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO tags (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(TagId::new())
        .bind(name)
        .fetch_one(conn)
        .await
        .map_err(Into::into)
    }

    /// Batch-load tags for several jobs. Returns (job_id, Tag) pairs.
    pub async fn find_for_job_ids(job_ids: &[JobId], pool: &PgPool) -> Result<Vec<TagWithJobId>> {
        sqlx::query_as::<_, TagWithJobId>(
            r#"
            SELECT jt.job_id, t.*
            FROM tags t
            INNER JOIN job_tags jt ON jt.tag_id = t.id
            WHERE jt.job_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(job_ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

impl JobTag {
    /// Link a tag to a job. Existing links are left alone.
    pub async fn link(job_id: JobId, tag_id: TagId, conn: &mut PgConnection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_tags (id, job_id, tag_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id, tag_id) DO NOTHING
            "#,
        )
        .bind(JobTagId::new())
        .bind(job_id)
        .bind(tag_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_names_dedupes_and_trims() {
        let raw = vec![
            "forhire".to_string(),
            " rust ".to_string(),
            "".to_string(),
            "forhire".to_string(),
            "rust".to_string(),
        ];
        assert_eq!(
            Tag::normalize_names(&raw),
            vec!["forhire".to_string(), "rust".to_string()]
        );
    }
}
