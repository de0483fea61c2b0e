// Minimal Reddit API client: public subreddit listings and the OAuth inbox.
// https://github.com/reddit-archive/reddit/wiki/OAuth2

use std::time::{Duration, Instant};

pub mod models;

use reqwest::{header, Client, StatusCode};
use tokio::sync::Mutex;

pub use crate::models::{InboxFilter, InboxItem, Listing, Post, Thing};
use crate::models::AccessTokenResponse;

const PUBLIC_BASE_URL: &str = "https://www.reddit.com";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const LISTING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum RedditError {
    #[error("request to reddit failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reddit returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("reddit credentials are not configured")]
    MissingCredentials,
}

/// Script-app credentials for the password grant.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RedditOptions {
    pub user_agent: String,
    pub credentials: Option<RedditCredentials>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditService {
    options: RedditOptions,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl RedditService {
    pub fn new(options: RedditOptions) -> Result<Self, RedditError> {
        let client = Client::builder().user_agent(&options.user_agent).build()?;
        Ok(Self {
            options,
            client,
            token: Mutex::new(None),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.options.credentials.is_some()
    }

    /// Fetch the newest submissions of a subreddit (no auth required).
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<Post>, RedditError> {
        let url = format!("{}/r/{}/new.json", PUBLIC_BASE_URL, subreddit);

        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .timeout(LISTING_TIMEOUT)
            .send()
            .await?;

        let listing: Listing<Post> = Self::check(response).await?.json().await?;
        Ok(listing
            .into_children()
            .into_iter()
            .map(|thing| thing.data)
            .collect())
    }

    /// Read one inbox folder of the authenticated account.
    pub async fn fetch_inbox(&self, filter: InboxFilter) -> Result<Vec<InboxItem>, RedditError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", OAUTH_BASE_URL, filter.path());

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", "25")])
            .send()
            .await?;

        let listing: Listing<InboxItem> = Self::check(response).await?.json().await?;
        Ok(listing
            .into_children()
            .into_iter()
            .map(|thing| thing.data)
            .collect())
    }

    async fn access_token(&self) -> Result<String, RedditError> {
        let credentials = self
            .options
            .credentials
            .as_ref()
            .ok_or(RedditError::MissingCredentials)?;

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/api/v1/access_token", PUBLIC_BASE_URL))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let token: AccessTokenResponse = Self::check(response).await?.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained reddit access token");

        // Refresh a minute early
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RedditError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RedditError::Status { status, body })
    }
}
