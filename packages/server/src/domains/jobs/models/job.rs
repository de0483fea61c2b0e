use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::common::{CompanyId, JobId, ValidatedPageArgs};

use super::company::Company;
use super::job_metadata::{JobMetadata, JobMetadataMap};
use super::tag::{JobTag, Tag};

/// Job posting - unique by url, created on first sighting and updated in place afterwards
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company_id: Option<CompanyId>,
    pub author: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_remote: Option<bool>, // None = unknown
    pub source: Option<String>,
    pub external_id: Option<String>,
    pub data: Option<serde_json::Value>, // raw source payload
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a posting came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSource {
    pub name: String,
    pub external_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Normalized posting produced by a source. `None` fields leave stored values untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: String,
    pub company: Option<String>,
    pub author: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_remote: Option<bool>,
    pub tags: Vec<String>,
    pub metadata: JobMetadataMap,
    pub source: JobSource,
}

/// Result of `Job::upsert`
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub job: Job,
    /// true on first sighting of the url
    pub inserted: bool,
}

#[derive(sqlx::FromRow)]
struct UpsertedJobRow {
    #[sqlx(flatten)]
    job: Job,
    inserted: bool,
}

/// Job with company, tags and metadata attached (API shape)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobWithRelations {
    #[serde(flatten)]
    pub job: Job,
    pub company: Option<Company>,
    pub tags: Vec<Tag>,
    pub metadata: Vec<JobMetadata>,
}

impl JobWithRelations {
    /// Typed view of the stored metadata rows.
    pub fn metadata_map(&self) -> JobMetadataMap {
        JobMetadataMap::from_rows(&self.metadata)
    }

    /// Stitch batch-loaded relations onto their jobs, keeping job order.
    pub fn assemble(
        jobs: Vec<Job>,
        companies: Vec<Company>,
        tags: Vec<(JobId, Tag)>,
        metadata: Vec<JobMetadata>,
    ) -> Vec<Self> {
        let companies: HashMap<CompanyId, Company> =
            companies.into_iter().map(|c| (c.id, c)).collect();

        let mut tags_by_job: HashMap<JobId, Vec<Tag>> = HashMap::new();
        for (job_id, tag) in tags {
            tags_by_job.entry(job_id).or_default().push(tag);
        }

        let mut metadata_by_job: HashMap<JobId, Vec<JobMetadata>> = HashMap::new();
        for row in metadata {
            metadata_by_job.entry(row.job_id).or_default().push(row);
        }

        jobs.into_iter()
            .map(|job| Self {
                company: job.company_id.and_then(|id| companies.get(&id).cloned()),
                tags: tags_by_job.remove(&job.id).unwrap_or_default(),
                metadata: metadata_by_job.remove(&job.id).unwrap_or_default(),
                job,
            })
            .collect()
    }
}

// =============================================================================
// Queries
// =============================================================================

impl Job {
    /// Create or update the job for `input.url` together with its company, tags
    /// and metadata. All writes share one transaction.
    pub async fn upsert(input: &JobInput, pool: &PgPool) -> Result<UpsertOutcome> {
        let mut tx = pool.begin().await?;

        let company = match Company::normalize_name(input.company.as_deref()) {
            Some(name) => Some(
                Company::find_or_create(&name, &mut *tx)
                    .await
                    .context("Failed to upsert company")?,
            ),
            None => None,
        };

        let row = sqlx::query_as::<_, UpsertedJobRow>(
            r#"
            INSERT INTO jobs (
                id, title, company_id, author, location, url, posted_at,
                description, is_remote, source, external_id, data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (url) DO UPDATE SET
                title = EXCLUDED.title,
                company_id = COALESCE(EXCLUDED.company_id, jobs.company_id),
                author = COALESCE(EXCLUDED.author, jobs.author),
                location = COALESCE(EXCLUDED.location, jobs.location),
                posted_at = COALESCE(EXCLUDED.posted_at, jobs.posted_at),
                description = COALESCE(EXCLUDED.description, jobs.description),
                is_remote = COALESCE(EXCLUDED.is_remote, jobs.is_remote),
                source = COALESCE(EXCLUDED.source, jobs.source),
                external_id = COALESCE(EXCLUDED.external_id, jobs.external_id),
                data = COALESCE(EXCLUDED.data, jobs.data),
                updated_at = NOW()
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(JobId::new())
        .bind(&input.title)
        .bind(company.as_ref().map(|c| c.id))
        .bind(&input.author)
        .bind(&input.location)
        .bind(&input.url)
        .bind(input.posted_at)
        .bind(&input.description)
        .bind(input.is_remote)
        .bind(Some(&input.source.name).filter(|name| !name.is_empty()))
        .bind(&input.source.external_id)
        .bind(&input.source.data)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to upsert job")?;

        for name in Tag::normalize_names(&input.tags) {
            let tag = Tag::find_or_create(&name, &mut *tx).await?;
            JobTag::link(row.job.id, tag.id, &mut *tx).await?;
        }

        for (key, value) in input.metadata.iter() {
            JobMetadata::upsert(row.job.id, key, value, &mut *tx).await?;
        }

        tx.commit().await?;

        Ok(UpsertOutcome {
            job: row.job,
            inserted: row.inserted,
        })
    }

    pub async fn find_by_id(id: JobId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_url(url: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE url = $1")
            .bind(url)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// One page of jobs, newest first, plus the total row count.
    pub async fn find_page(args: &ValidatedPageArgs, pool: &PgPool) -> Result<(Vec<Self>, i64)> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM jobs
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(args.limit())
        .bind(args.offset())
        .fetch_all(pool)
        .await?;

        let total = Self::count(pool).await?;
        Ok((jobs, total))
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Batch-load company, tags and metadata for a list of jobs.
    pub async fn load_relations(jobs: Vec<Self>, pool: &PgPool) -> Result<Vec<JobWithRelations>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let job_ids: Vec<JobId> = jobs.iter().map(|j| j.id).collect();
        let company_ids: Vec<CompanyId> = jobs.iter().filter_map(|j| j.company_id).collect();

        let companies = if company_ids.is_empty() {
            Vec::new()
        } else {
            Company::find_by_ids(&company_ids, pool).await?
        };
        let tags = Tag::find_for_job_ids(&job_ids, pool)
            .await?
            .into_iter()
            .map(|row| (row.job_id, row.tag))
            .collect();
        let metadata = JobMetadata::find_for_job_ids(&job_ids, pool).await?;

        Ok(JobWithRelations::assemble(jobs, companies, tags, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::jobs::models::MetadataKey;
    use crate::common::{JobMetadataId, TagId};

    fn job(title: &str, company_id: Option<CompanyId>) -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(),
            title: title.to_string(),
            company_id,
            author: None,
            location: None,
            url: format!("https://example.com/{}", title),
            posted_at: None,
            description: None,
            is_remote: None,
            source: Some("reddit".to_string()),
            external_id: None,
            data: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn assemble_attaches_relations_in_job_order() {
        let now = Utc::now();
        let company = Company {
            id: CompanyId::new(),
            name: "Acme".to_string(),
            created_at: now,
            updated_at: now,
        };
        let first = job("first", Some(company.id));
        let second = job("second", None);
        let tag = Tag {
            id: TagId::new(),
            name: "forhire".to_string(),
            created_at: now,
        };
        let meta = JobMetadata {
            id: JobMetadataId::new(),
            job_id: second.id,
            name: "upvotes".to_string(),
            value: "3".to_string(),
            created_at: now,
            updated_at: now,
        };

        let assembled = JobWithRelations::assemble(
            vec![first.clone(), second.clone()],
            vec![company.clone()],
            vec![(first.id, tag.clone())],
            vec![meta],
        );

        assert_eq!(assembled.len(), 2);
        assert_eq!(assembled[0].job.id, first.id);
        assert_eq!(assembled[0].company.as_ref().map(|c| &c.name), Some(&company.name));
        assert_eq!(assembled[0].tags, vec![tag]);
        assert!(assembled[0].metadata.is_empty());

        assert!(assembled[1].company.is_none());
        assert_eq!(
            assembled[1].metadata_map().get(&MetadataKey::Upvotes),
            Some("3")
        );
    }

    #[test]
    fn relations_serialize_flat_in_camel_case() {
        let with = JobWithRelations {
            job: job("flat", None),
            company: None,
            tags: vec![],
            metadata: vec![],
        };
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["title"], "flat");
        assert!(json.get("isRemote").is_some());
        assert!(json.get("company").is_some());
        assert!(json["tags"].as_array().unwrap().is_empty());
    }
}
