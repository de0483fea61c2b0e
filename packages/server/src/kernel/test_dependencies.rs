// TestDependencies - in-memory stores and mock clients for testing
//
// Provides doubles that can be injected into ServerDeps so the ingestion
// pipeline, the dispatcher and the routes run without Postgres or network.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reddit::{InboxFilter, InboxItem, Post};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{
    BaseFcmService, BaseJobSource, BaseJobStore, BaseRedditClient, BaseSubscriptionStore,
    BaseWeb3CareerClient, BaseWebPushService, PushError, ServerDeps,
};
use crate::common::{
    CompanyId, JobId, JobMetadataId, Page, SubscriptionId, TagId, ValidatedPageArgs,
};
use crate::config::DEFAULT_ICON_URL;
use crate::domains::jobs::models::{
    Company, Job, JobInput, JobMetadata, JobWithRelations, Tag, UpsertOutcome,
};
use crate::domains::notifications::models::{NewSubscription, Subscription};
use crate::domains::sources::{RedditJobSource, Web3CareerJobSource};

// =============================================================================
// Fixtures
// =============================================================================

/// A subreddit submission as the listing endpoint would return it
pub fn reddit_post(subreddit: &str, title: &str, url: &str, author: &str) -> Post {
    Post {
        title: title.to_string(),
        author: author.to_string(),
        subreddit: subreddit.to_string(),
        url: url.to_string(),
        created_utc: 1_700_000_000.0,
        selftext: Some(format!("{} body", title)),
        selftext_html: None,
        ups: Some(1),
        downs: Some(0),
        extra: Default::default(),
    }
}

/// An inbox item; `t4_` names are private messages, anything else a comment reply
pub fn inbox_item(name: &str, author: Option<&str>, body: &str) -> InboxItem {
    let was_comment = !name.starts_with("t4_");
    InboxItem {
        name: name.to_string(),
        author: author.map(str::to_string),
        body: body.to_string(),
        body_html: None,
        subreddit: was_comment.then(|| "forhire".to_string()),
        created_utc: 1_700_000_000.0,
        parent_id: None,
        new: Some(true),
        context: if was_comment {
            None
        } else {
            Some(format!("/message/messages/{}", name))
        },
        permalink: was_comment.then(|| format!("/r/forhire/comments/{}/", name)),
        was_comment,
        extra: Default::default(),
    }
}

fn subscription(kind: &str, endpoint: &str, keys: serde_json::Value) -> Subscription {
    let now = Utc::now();
    Subscription {
        id: SubscriptionId::new(),
        subscription_type: kind.to_string(),
        endpoint: endpoint.to_string(),
        keys,
        ip_address: Some("127.0.0.1".to_string()),
        created_at: now,
        updated_at: now,
    }
}

pub fn web_subscription(endpoint: &str) -> Subscription {
    subscription(
        "web",
        endpoint,
        serde_json::json!({"p256dh": "test-p256dh", "auth": "test-auth"}),
    )
}

pub fn fcm_subscription(token: &str) -> Subscription {
    subscription(
        "fcm",
        &format!("fcm:{}", token),
        serde_json::json!({ "token": token }),
    )
}

// =============================================================================
// In-memory Job Store
// =============================================================================

#[derive(Default)]
struct JobTables {
    jobs: Vec<Job>,
    companies: Vec<Company>,
    tags: Vec<Tag>,
    job_tags: Vec<(JobId, TagId)>,
    metadata: Vec<JobMetadata>,
}

impl JobTables {
    fn company_id(&mut self, name: &str) -> CompanyId {
        if let Some(existing) = self.companies.iter().find(|c| c.name == name) {
            return existing.id;
        }
        let now = Utc::now();
        let company = Company {
            id: CompanyId::new(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = company.id;
        self.companies.push(company);
        id
    }

    fn tag_id(&mut self, name: &str) -> TagId {
        if let Some(existing) = self.tags.iter().find(|t| t.name == name) {
            return existing.id;
        }
        let tag = Tag {
            id: TagId::new(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let id = tag.id;
        self.tags.push(tag);
        id
    }

    fn with_relations(&self, jobs: Vec<Job>) -> Vec<JobWithRelations> {
        let ids: HashSet<JobId> = jobs.iter().map(|j| j.id).collect();
        let tags = self
            .job_tags
            .iter()
            .filter(|(job_id, _)| ids.contains(job_id))
            .filter_map(|(job_id, tag_id)| {
                self.tags
                    .iter()
                    .find(|t| t.id == *tag_id)
                    .map(|t| (*job_id, t.clone()))
            })
            .collect();
        let metadata = self
            .metadata
            .iter()
            .filter(|m| ids.contains(&m.job_id))
            .cloned()
            .collect();
        JobWithRelations::assemble(jobs, self.companies.clone(), tags, metadata)
    }
}

/// Mirrors the Postgres upsert rules: unique url, title always refreshed,
/// other fields only overwritten by present values.
pub struct InMemoryJobStore {
    tables: Arc<Mutex<JobTables>>,
    failing_urls: Arc<Mutex<HashSet<String>>>,
    upsert_calls: Arc<Mutex<Vec<String>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(JobTables::default())),
            failing_urls: Arc::new(Mutex::new(HashSet::new())),
            upsert_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make upserts of this url fail as a database error would
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn find_by_url(&self, url: &str) -> Option<JobWithRelations> {
        let tables = self.tables.lock().unwrap();
        let job = tables.jobs.iter().find(|j| j.url == url).cloned()?;
        tables.with_relations(vec![job]).pop()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn upsert_calls(&self) -> Vec<String> {
        self.upsert_calls.lock().unwrap().clone()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseJobStore for InMemoryJobStore {
    async fn upsert_job(&self, input: &JobInput) -> Result<UpsertOutcome> {
        self.upsert_calls.lock().unwrap().push(input.url.clone());
        if self.failing_urls.lock().unwrap().contains(&input.url) {
            anyhow::bail!("simulated database error for {}", input.url);
        }

        let mut tables = self.tables.lock().unwrap();
        let company_id = Company::normalize_name(input.company.as_deref())
            .map(|name| tables.company_id(&name));
        let now = Utc::now();
        let source_name = Some(input.source.name.clone()).filter(|n| !n.is_empty());

        let (job, inserted) = match tables.jobs.iter_mut().find(|j| j.url == input.url) {
            Some(existing) => {
                existing.title = input.title.clone();
                existing.company_id = company_id.or(existing.company_id);
                existing.author = input.author.clone().or(existing.author.take());
                existing.location = input.location.clone().or(existing.location.take());
                existing.posted_at = input.posted_at.or(existing.posted_at);
                existing.description = input.description.clone().or(existing.description.take());
                existing.is_remote = input.is_remote.or(existing.is_remote);
                existing.source = source_name.or(existing.source.take());
                existing.external_id =
                    input.source.external_id.clone().or(existing.external_id.take());
                existing.data = input.source.data.clone().or(existing.data.take());
                existing.updated_at = now;
                (existing.clone(), false)
            }
            None => {
                let job = Job {
                    id: JobId::new(),
                    title: input.title.clone(),
                    company_id,
                    author: input.author.clone(),
                    location: input.location.clone(),
                    url: input.url.clone(),
                    posted_at: input.posted_at,
                    description: input.description.clone(),
                    is_remote: input.is_remote,
                    source: source_name,
                    external_id: input.source.external_id.clone(),
                    data: input.source.data.clone(),
                    created_at: now,
                    updated_at: now,
                };
                tables.jobs.push(job.clone());
                (job, true)
            }
        };

        for name in Tag::normalize_names(&input.tags) {
            let tag_id = tables.tag_id(&name);
            if !tables.job_tags.contains(&(job.id, tag_id)) {
                tables.job_tags.push((job.id, tag_id));
            }
        }

        for (key, value) in input.metadata.iter() {
            match tables
                .metadata
                .iter_mut()
                .find(|m| m.job_id == job.id && m.name == key.as_str())
            {
                Some(existing) => {
                    existing.value = value.to_string();
                    existing.updated_at = now;
                }
                None => tables.metadata.push(JobMetadata {
                    id: JobMetadataId::new(),
                    job_id: job.id,
                    name: key.as_str().to_string(),
                    value: value.to_string(),
                    created_at: now,
                    updated_at: now,
                }),
            }
        }

        Ok(UpsertOutcome { job, inserted })
    }

    async fn find_page(&self, args: &ValidatedPageArgs) -> Result<Page<JobWithRelations>> {
        let tables = self.tables.lock().unwrap();
        // Newest first: insertion order reversed
        let newest_first: Vec<Job> = tables.jobs.iter().rev().cloned().collect();
        let page = args.slice(&newest_first);
        Ok(Page::new(
            tables.with_relations(page),
            newest_first.len() as i64,
            args,
        ))
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<JobWithRelations>> {
        let tables = self.tables.lock().unwrap();
        let Some(job) = tables.jobs.iter().find(|j| j.id == id).cloned() else {
            return Ok(None);
        };
        Ok(tables.with_relations(vec![job]).pop())
    }
}

// =============================================================================
// In-memory Subscription Store
// =============================================================================

pub struct InMemorySubscriptionStore {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    fail_loads: Arc<Mutex<bool>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            fail_loads: Arc::new(Mutex::new(false)),
        }
    }

    /// Seed a subscription; returns it for convenience
    pub fn insert(&self, subscription: Subscription) -> Subscription {
        self.subscriptions.lock().unwrap().push(subscription.clone());
        subscription
    }

    /// Make `find_all` fail as a database error would
    pub fn fail_loads(&self) {
        *self.fail_loads.lock().unwrap() = true;
    }

    pub fn all(&self) -> Vec<Subscription> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSubscriptionStore for InMemorySubscriptionStore {
    async fn find_all(&self) -> Result<Vec<Subscription>> {
        if *self.fail_loads.lock().unwrap() {
            anyhow::bail!("simulated database error loading subscriptions");
        }
        Ok(self.all())
    }

    async fn upsert(&self, input: &NewSubscription) -> Result<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let kind = input.subscription_type.to_string();

        if let Some(existing) = subscriptions
            .iter_mut()
            .find(|s| s.endpoint == input.endpoint && s.subscription_type == kind)
        {
            existing.keys = input.keys.clone();
            existing.ip_address = input.ip_address.clone();
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let created = Subscription {
            id: SubscriptionId::new(),
            subscription_type: kind,
            endpoint: input.endpoint.clone(),
            keys: input.keys.clone(),
            ip_address: input.ip_address.clone(),
            created_at: now,
            updated_at: now,
        };
        subscriptions.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: SubscriptionId) -> Result<bool> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        Ok(subscriptions.len() < before)
    }
}

// =============================================================================
// Mock Reddit Client
// =============================================================================

pub struct MockRedditClient {
    posts: Arc<Mutex<HashMap<String, Vec<Post>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    inbox: Arc<Mutex<HashMap<&'static str, Vec<InboxItem>>>>,
    inbox_fails: Arc<Mutex<bool>>,
    has_credentials: bool,
    listing_calls: Arc<Mutex<Vec<String>>>,
}

fn inbox_key(filter: InboxFilter) -> &'static str {
    filter.path()
}

impl MockRedditClient {
    pub fn new() -> Self {
        Self {
            posts: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            inbox: Arc::new(Mutex::new(HashMap::new())),
            inbox_fails: Arc::new(Mutex::new(false)),
            has_credentials: true,
            listing_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Posts returned for a subreddit listing
    pub fn with_posts(self, subreddit: &str, posts: Vec<Post>) -> Self {
        self.posts
            .lock()
            .unwrap()
            .insert(subreddit.to_string(), posts);
        self
    }

    /// Make a subreddit listing fail
    pub fn with_failure(self, subreddit: &str) -> Self {
        self.failing.lock().unwrap().insert(subreddit.to_string());
        self
    }

    pub fn with_inbox(self, filter: InboxFilter, items: Vec<InboxItem>) -> Self {
        self.inbox.lock().unwrap().insert(inbox_key(filter), items);
        self
    }

    pub fn with_inbox_failure(self) -> Self {
        *self.inbox_fails.lock().unwrap() = true;
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.has_credentials = false;
        self
    }

    /// Subreddits requested, in call order
    pub fn listing_calls(&self) -> Vec<String> {
        self.listing_calls.lock().unwrap().clone()
    }
}

impl Default for MockRedditClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRedditClient for MockRedditClient {
    async fn fetch_new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>> {
        self.listing_calls
            .lock()
            .unwrap()
            .push(subreddit.to_string());

        if self.failing.lock().unwrap().contains(subreddit) {
            anyhow::bail!("simulated timeout fetching /r/{}", subreddit);
        }

        Ok(self
            .posts
            .lock()
            .unwrap()
            .get(subreddit)
            .map(|posts| posts.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_inbox(&self, filter: InboxFilter) -> Result<Vec<InboxItem>> {
        if !self.has_credentials {
            anyhow::bail!("reddit credentials are not configured");
        }
        if *self.inbox_fails.lock().unwrap() {
            anyhow::bail!("simulated inbox failure");
        }
        Ok(self
            .inbox
            .lock()
            .unwrap()
            .get(inbox_key(filter))
            .cloned()
            .unwrap_or_default())
    }

    fn has_credentials(&self) -> bool {
        self.has_credentials
    }
}

// =============================================================================
// Mock Web3Career Client
// =============================================================================

pub struct MockWeb3CareerClient {
    jobs: Arc<Mutex<Vec<serde_json::Value>>>,
    fails: Arc<Mutex<bool>>,
}

impl MockWeb3CareerClient {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            fails: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_jobs(self, jobs: Vec<serde_json::Value>) -> Self {
        *self.jobs.lock().unwrap() = jobs;
        self
    }

    pub fn with_failure(self) -> Self {
        *self.fails.lock().unwrap() = true;
        self
    }
}

impl Default for MockWeb3CareerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseWeb3CareerClient for MockWeb3CareerClient {
    async fn fetch_jobs(&self) -> Result<Vec<serde_json::Value>> {
        if *self.fails.lock().unwrap() {
            anyhow::bail!("Web3Career API request failed with status: 503");
        }
        Ok(self.jobs.lock().unwrap().clone())
    }
}

// =============================================================================
// Mock Push Services
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentWebPush {
    pub endpoint: String,
    pub payload: Vec<u8>,
}

pub struct MockWebPushService {
    sent: Arc<Mutex<Vec<SentWebPush>>>,
    failures: Arc<Mutex<HashMap<String, PushError>>>,
}

impl MockWebPushService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Answer every send to `endpoint` with `error`
    pub fn fail_endpoint(&self, endpoint: &str, error: PushError) {
        self.failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), error);
    }

    /// Successful deliveries
    pub fn sent(&self) -> Vec<SentWebPush> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockWebPushService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseWebPushService for MockWebPushService {
    async fn send(
        &self,
        endpoint: &str,
        _p256dh: &str,
        _auth: &str,
        payload: &[u8],
    ) -> std::result::Result<(), PushError> {
        if let Some(error) = self.failures.lock().unwrap().get(endpoint) {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push(SentWebPush {
            endpoint: endpoint.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentFcm {
    pub token: String,
    pub title: String,
    pub body: String,
    pub url: String,
}

pub struct MockFcmService {
    sent: Arc<Mutex<Vec<SentFcm>>>,
    failures: Arc<Mutex<HashMap<String, PushError>>>,
}

impl MockFcmService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn fail_token(&self, token: &str, error: PushError) {
        self.failures
            .lock()
            .unwrap()
            .insert(token.to_string(), error);
    }

    pub fn sent(&self) -> Vec<SentFcm> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockFcmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseFcmService for MockFcmService {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        url: &str,
    ) -> std::result::Result<(), PushError> {
        if let Some(error) = self.failures.lock().unwrap().get(token) {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push(SentFcm {
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub jobs: Arc<InMemoryJobStore>,
    pub subscriptions: Arc<InMemorySubscriptionStore>,
    pub reddit: Arc<MockRedditClient>,
    pub web3career: Arc<MockWeb3CareerClient>,
    pub web_push: Arc<MockWebPushService>,
    pub fcm: Arc<MockFcmService>,
    pub job_subreddits: Vec<String>,
    pub hiring_marker: String,
    pub vapid_public_key: String,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(InMemoryJobStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            reddit: Arc::new(MockRedditClient::new()),
            web3career: Arc::new(MockWeb3CareerClient::new()),
            web_push: Arc::new(MockWebPushService::new()),
            fcm: Arc::new(MockFcmService::new()),
            job_subreddits: vec!["forhire".to_string()],
            hiring_marker: "[Hiring]".to_string(),
            vapid_public_key: "test-vapid-public-key".to_string(),
        }
    }

    /// Set a mock reddit client
    pub fn mock_reddit(mut self, client: MockRedditClient) -> Self {
        self.reddit = Arc::new(client);
        self
    }

    /// Set a mock Web3Career client
    pub fn mock_web3career(mut self, client: MockWeb3CareerClient) -> Self {
        self.web3career = Arc::new(client);
        self
    }

    pub fn subreddits(mut self, subreddits: &[&str]) -> Self {
        self.job_subreddits = subreddits.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Lazy pool that never connects; only the trait-backed paths are usable
    pub fn unconnected_pool() -> PgPool {
        PgPoolOptions::new().connect_lazy_with(
            PgConnectOptions::new()
                .host("localhost")
                .database("jobboard_unconnected"),
        )
    }

    /// Wire the doubles into ServerDeps the same way main() wires real clients
    pub fn into_deps(self) -> ServerDeps {
        self.into_deps_with_pool(Self::unconnected_pool())
    }

    pub fn into_deps_with_pool(self, db_pool: PgPool) -> ServerDeps {
        let sources: Vec<Arc<dyn BaseJobSource>> = vec![
            Arc::new(RedditJobSource::new(
                self.reddit.clone(),
                self.job_subreddits.clone(),
                self.hiring_marker.clone(),
                DEFAULT_ICON_URL,
            )),
            Arc::new(Web3CareerJobSource::new(self.web3career.clone())),
        ];

        ServerDeps::new(
            db_pool,
            self.jobs,
            self.subscriptions,
            self.reddit,
            self.web3career,
            sources,
            self.web_push,
            self.fcm,
            self.vapid_public_key,
            DEFAULT_ICON_URL.to_string(),
            self.job_subreddits,
            self.hiring_marker,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
