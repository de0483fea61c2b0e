use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;

use crate::common::{JobId, JobMetadataId};

/// Name of a metadata entry. Known keys get a variant; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    Subreddit,
    BodyHtml,
    Upvotes,
    Downvotes,
    Country,
    City,
    DateEpoch,
    Other(String),
}

impl MetadataKey {
    pub fn as_str(&self) -> &str {
        match self {
            MetadataKey::Subreddit => "subreddit",
            MetadataKey::BodyHtml => "bodyHtml",
            MetadataKey::Upvotes => "upvotes",
            MetadataKey::Downvotes => "downvotes",
            MetadataKey::Country => "country",
            MetadataKey::City => "city",
            MetadataKey::DateEpoch => "date_epoch",
            MetadataKey::Other(name) => name,
        }
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MetadataKey {
    fn from(s: &str) -> Self {
        match s {
            "subreddit" => MetadataKey::Subreddit,
            "bodyHtml" => MetadataKey::BodyHtml,
            "upvotes" => MetadataKey::Upvotes,
            "downvotes" => MetadataKey::Downvotes,
            "country" => MetadataKey::Country,
            "city" => MetadataKey::City,
            "date_epoch" => MetadataKey::DateEpoch,
            other => MetadataKey::Other(other.to_string()),
        }
    }
}

impl Serialize for MetadataKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetadataKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MetadataKey::from(raw.as_str()))
    }
}

/// Metadata carried by a job input, one value per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobMetadataMap(BTreeMap<MetadataKey, String>);

impl JobMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: MetadataKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &MetadataKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetadataKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Rebuild the typed map from stored rows.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a JobMetadata>) -> Self {
        rows.into_iter()
            .map(|row| (row.key(), row.value.clone()))
            .collect()
    }
}

impl FromIterator<(MetadataKey, String)> for JobMetadataMap {
    fn from_iter<I: IntoIterator<Item = (MetadataKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stored (job, name, value) row. Unique on (job_id, name).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    pub id: JobMetadataId,
    pub job_id: JobId,
    pub name: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobMetadata {
    pub fn key(&self) -> MetadataKey {
        MetadataKey::from(self.name.as_str())
    }

    /// Insert or overwrite one entry.
    pub async fn upsert(
        job_id: JobId,
        key: &MetadataKey,
        value: &str,
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_metadata (id, job_id, name, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id, name) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(JobMetadataId::new())
        .bind(job_id)
        .bind(key.as_str())
        .bind(value)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_for_job_ids(job_ids: &[JobId], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM job_metadata WHERE job_id = ANY($1) ORDER BY name",
        )
        .bind(job_ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_use_their_wire_names() {
        assert_eq!(MetadataKey::BodyHtml.as_str(), "bodyHtml");
        assert_eq!(MetadataKey::DateEpoch.as_str(), "date_epoch");
        assert_eq!(MetadataKey::from("upvotes"), MetadataKey::Upvotes);
        assert_eq!(
            MetadataKey::from("salary"),
            MetadataKey::Other("salary".to_string())
        );
    }

    #[test]
    fn map_serializes_as_plain_object() {
        let map = JobMetadataMap::new()
            .with(MetadataKey::Subreddit, "forhire")
            .with(MetadataKey::Other("salary".into()), "100k");

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["subreddit"], "forhire");
        assert_eq!(json["salary"], "100k");

        let back: JobMetadataMap = serde_json::from_value(json).unwrap();
        assert_eq!(back.get(&MetadataKey::Subreddit), Some("forhire"));
    }

    #[test]
    fn inserting_same_key_overwrites() {
        let mut map = JobMetadataMap::new();
        map.insert(MetadataKey::Upvotes, "1");
        map.insert(MetadataKey::Upvotes, "5");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&MetadataKey::Upvotes), Some("5"));
    }
}
