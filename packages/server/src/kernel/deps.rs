//! Server dependencies (using traits for testability)
//!
//! `ServerDeps` is the container every route and pipeline receives. Clients
//! are built once at startup and injected here; tests swap in the doubles
//! from `test_dependencies`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reddit::{InboxFilter, InboxItem, Post, RedditService};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::common::{JobId, Page, SubscriptionId, ValidatedPageArgs};
use crate::domains::jobs::models::{Job, JobInput, JobWithRelations, UpsertOutcome};
use crate::domains::notifications::models::{NewSubscription, Subscription};
use crate::kernel::{
    BaseFcmService, BaseJobSource, BaseJobStore, BaseRedditClient, BaseSubscriptionStore,
    BaseWeb3CareerClient, BaseWebPushService,
};

// =============================================================================
// RedditService Adapter (implements BaseRedditClient trait)
// =============================================================================

/// Wrapper around RedditService that implements BaseRedditClient trait
pub struct RedditAdapter(pub Arc<RedditService>);

impl RedditAdapter {
    pub fn new(service: Arc<RedditService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseRedditClient for RedditAdapter {
    async fn fetch_new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>> {
        self.0
            .fetch_new_posts(subreddit, limit)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn fetch_inbox(&self, filter: InboxFilter) -> Result<Vec<InboxItem>> {
        self.0
            .fetch_inbox(filter)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    fn has_credentials(&self) -> bool {
        self.0.has_credentials()
    }
}

// =============================================================================
// Postgres stores (delegate to the models)
// =============================================================================

pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseJobStore for PostgresJobStore {
    async fn upsert_job(&self, input: &JobInput) -> Result<UpsertOutcome> {
        Job::upsert(input, &self.pool).await
    }

    async fn find_page(&self, args: &ValidatedPageArgs) -> Result<Page<JobWithRelations>> {
        let (jobs, total) = Job::find_page(args, &self.pool).await?;
        let jobs = Job::load_relations(jobs, &self.pool).await?;
        Ok(Page::new(jobs, total, args))
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<JobWithRelations>> {
        let Some(job) = Job::find_by_id(id, &self.pool).await? else {
            return Ok(None);
        };
        Ok(Job::load_relations(vec![job], &self.pool).await?.pop())
    }
}

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseSubscriptionStore for PostgresSubscriptionStore {
    async fn find_all(&self) -> Result<Vec<Subscription>> {
        Subscription::find_all(&self.pool).await
    }

    async fn upsert(&self, input: &NewSubscription) -> Result<Subscription> {
        Subscription::upsert(input, &self.pool).await
    }

    async fn delete(&self, id: SubscriptionId) -> Result<bool> {
        Subscription::delete(id, &self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// What the most recent ingestion run in this process did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastIngestion {
    pub finished_at: DateTime<Utc>,
    pub inserted: usize,
    pub updated: usize,
    /// Sources that could not be fetched at all
    pub failed_sources: usize,
    pub delivered: usize,
}

/// Server dependencies accessible to routes and pipelines (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub jobs: Arc<dyn BaseJobStore>,
    pub subscriptions: Arc<dyn BaseSubscriptionStore>,
    pub reddit: Arc<dyn BaseRedditClient>,
    pub web3career: Arc<dyn BaseWeb3CareerClient>,
    /// Sources walked by the ingestion pipeline, in order
    pub job_sources: Vec<Arc<dyn BaseJobSource>>,
    pub web_push: Arc<dyn BaseWebPushService>,
    pub fcm: Arc<dyn BaseFcmService>,
    pub vapid_public_key: String,
    pub notification_icon_url: String,
    pub job_subreddits: Vec<String>,
    pub hiring_marker: String,
    /// Serializes ingestion runs within this process
    pub ingest_lock: Arc<Mutex<()>>,
    /// `None` until the first run completes
    pub last_ingestion: Arc<RwLock<Option<LastIngestion>>>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        jobs: Arc<dyn BaseJobStore>,
        subscriptions: Arc<dyn BaseSubscriptionStore>,
        reddit: Arc<dyn BaseRedditClient>,
        web3career: Arc<dyn BaseWeb3CareerClient>,
        job_sources: Vec<Arc<dyn BaseJobSource>>,
        web_push: Arc<dyn BaseWebPushService>,
        fcm: Arc<dyn BaseFcmService>,
        vapid_public_key: String,
        notification_icon_url: String,
        job_subreddits: Vec<String>,
        hiring_marker: String,
    ) -> Self {
        Self {
            db_pool,
            jobs,
            subscriptions,
            reddit,
            web3career,
            job_sources,
            web_push,
            fcm,
            vapid_public_key,
            notification_icon_url,
            job_subreddits,
            hiring_marker,
            ingest_lock: Arc::new(Mutex::new(())),
            last_ingestion: Arc::new(RwLock::new(None)),
        }
    }
}
