use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use reddit::RedditCredentials;

/// Subreddits scanned for job postings when `JOB_SUBREDDITS` is unset.
pub const DEFAULT_SUBREDDITS: &[&str] = &[
    "forhire",
    "jobs4bitcoins",
    "freelance",
    "remotejs",
    "jobs4dogecoins",
    "jobs4crypto",
];

pub const DEFAULT_HIRING_MARKER: &str = "[Hiring]";
pub const DEFAULT_ICON_URL: &str = "https://new.codebuilder.org/images/logo2.png";
pub const DEFAULT_REDDIT_USER_AGENT: &str = "CodeBuilder by /u/taofullstack";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub vapid_subject: String,
    pub fcm_service_account_path: Option<String>,
    pub reddit_user_agent: String,
    pub reddit_credentials: Option<RedditCredentials>,
    pub job_subreddits: Vec<String>,
    pub hiring_marker: String,
    pub web3career_api_token: Option<String>,
    pub notification_icon_url: String,
    pub ingest_cron: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            vapid_public_key: env::var("VAPID_PUBLIC_KEY")
                .context("VAPID_PUBLIC_KEY must be set")?,
            vapid_private_key: env::var("VAPID_PRIVATE_KEY")
                .context("VAPID_PRIVATE_KEY must be set")?,
            vapid_subject: env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:admin@example.com".to_string()),
            fcm_service_account_path: non_empty_var("FCM_SERVICE_ACCOUNT_PATH"),
            reddit_user_agent: env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_REDDIT_USER_AGENT.to_string()),
            reddit_credentials: reddit_credentials_from_env(),
            job_subreddits: non_empty_var("JOB_SUBREDDITS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|| DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect()),
            hiring_marker: env::var("HIRING_MARKER")
                .unwrap_or_else(|_| DEFAULT_HIRING_MARKER.to_string()),
            web3career_api_token: non_empty_var("WEB3CAREER_API_TOKEN"),
            notification_icon_url: env::var("NOTIFICATION_ICON_URL")
                .unwrap_or_else(|_| DEFAULT_ICON_URL.to_string()),
            ingest_cron: non_empty_var("INGEST_CRON"),
            allowed_origins: non_empty_var("ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// All four reddit variables are needed for the password grant; a partial set disables the inbox.
fn reddit_credentials_from_env() -> Option<RedditCredentials> {
    Some(RedditCredentials {
        client_id: non_empty_var("REDDIT_CLIENT_ID")?,
        client_secret: non_empty_var("REDDIT_CLIENT_SECRET")?,
        username: non_empty_var("REDDIT_USERNAME")?,
        password: non_empty_var("REDDIT_PASSWORD")?,
    })
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
