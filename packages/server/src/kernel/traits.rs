// Trait definitions for dependency injection
//
// Stores, upstream clients and push providers sit behind these traits so the
// ingestion pipeline and the routes can run against in-memory doubles.
//
// Naming convention: Base* for trait names (e.g., BaseJobStore, BaseFcmService)

use anyhow::Result;
use async_trait::async_trait;
use reddit::{InboxFilter, InboxItem, Post};

use crate::common::{JobId, Page, SubscriptionId, ValidatedPageArgs};
use crate::domains::jobs::models::{JobInput, JobWithRelations, UpsertOutcome};
use crate::domains::notifications::models::{NewSubscription, NotificationPayload, Subscription};

// =============================================================================
// Job Store
// =============================================================================

#[async_trait]
pub trait BaseJobStore: Send + Sync {
    /// Create or update the job for `input.url` (company, tags and metadata included)
    async fn upsert_job(&self, input: &JobInput) -> Result<UpsertOutcome>;

    /// Jobs newest first, with relations
    async fn find_page(&self, args: &ValidatedPageArgs) -> Result<Page<JobWithRelations>>;

    async fn find_by_id(&self, id: JobId) -> Result<Option<JobWithRelations>>;
}

// =============================================================================
// Subscription Store
// =============================================================================

#[async_trait]
pub trait BaseSubscriptionStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Subscription>>;

    /// Create or refresh by (endpoint, type)
    async fn upsert(&self, input: &NewSubscription) -> Result<Subscription>;

    /// Returns whether a row was removed
    async fn delete(&self, id: SubscriptionId) -> Result<bool>;
}

// =============================================================================
// Upstream Clients
// =============================================================================

#[async_trait]
pub trait BaseRedditClient: Send + Sync {
    /// Newest submissions of one subreddit (public listing)
    async fn fetch_new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>>;

    /// One folder of the authenticated inbox
    async fn fetch_inbox(&self, filter: InboxFilter) -> Result<Vec<InboxItem>>;

    fn has_credentials(&self) -> bool;
}

#[async_trait]
pub trait BaseWeb3CareerClient: Send + Sync {
    /// Raw job objects from the list endpoint. Empty when the client has no token.
    async fn fetch_jobs(&self) -> Result<Vec<serde_json::Value>>;
}

// =============================================================================
// Job Sources
// =============================================================================

/// A feed of postings the ingestion pipeline pulls from.
#[async_trait]
pub trait BaseJobSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch and normalize postings. Partial upstream failures are handled inside;
    /// an `Err` means the whole source produced nothing.
    async fn fetch(&self) -> Result<Vec<JobInput>>;

    fn is_of_interest(&self, _posting: &JobInput) -> bool {
        true
    }

    /// Payload announcing a newly stored posting, or `None` for sources that stay quiet.
    fn notification_for(&self, _posting: &JobInput) -> Option<NotificationPayload> {
        None
    }
}

// =============================================================================
// Push Providers
// =============================================================================

/// Delivery failure, classified so the dispatcher knows when to prune.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// Provider says the endpoint or token is permanently invalid
    #[error("subscription is no longer valid")]
    Gone,

    #[error("invalid subscription keys: {0}")]
    InvalidKeys(String),

    #[error("push provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("push transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BaseWebPushService: Send + Sync {
    /// Encrypt (aes128gcm) and deliver `payload` to a browser push endpoint
    async fn send(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        payload: &[u8],
    ) -> std::result::Result<(), PushError>;
}

#[async_trait]
pub trait BaseFcmService: Send + Sync {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        url: &str,
    ) -> std::result::Result<(), PushError>;
}
