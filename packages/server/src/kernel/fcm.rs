//! Firebase Cloud Messaging over the HTTP v1 API.
//!
//! Authenticates with a service account: a self-signed RS256 assertion is
//! exchanged for an OAuth2 access token, which is cached until shortly before
//! it expires.
//! https://firebase.google.com/docs/cloud-messaging/send-message

use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{BaseFcmService, PushError};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Fields of a Google service-account key file that FCM needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account {}", path.display()))?;
        serde_json::from_str(&raw).context("Invalid service account JSON")
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct FcmService {
    account: ServiceAccount,
    key: EncodingKey,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl FcmService {
    pub fn new(account: ServiceAccount) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("Service account private_key is not a valid RSA PEM")?;

        Ok(Self {
            account,
            key,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        })
    }

    fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.account.project_id
        )
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .context("Failed to sign service account assertion")?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Token exchange request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token exchange failed ({}): {}", status, body);
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained FCM access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

/// HTTP v1 message body for one device.
pub fn build_message(token: &str, title: &str, body: &str, url: &str) -> serde_json::Value {
    json!({
        "message": {
            "token": token,
            "notification": { "title": title, "body": body },
            "data": { "url": url },
            "android": { "notification": { "sound": "notification" } },
            "apns": { "payload": { "aps": { "sound": "notification" } } }
        }
    })
}

/// Map an FCM error response to a `PushError`.
///
/// `UNREGISTERED`, and `INVALID_ARGUMENT` complaining about the registration
/// token, mean the token will never work again.
pub fn classify_error(status: u16, body: &str) -> PushError {
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let error = &parsed["error"];
    let message = error["message"].as_str().unwrap_or(body).to_string();
    let error_status = error["status"].as_str().unwrap_or_default();

    let error_codes: Vec<&str> = error["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["errorCode"].as_str())
                .collect()
        })
        .unwrap_or_default();

    let unregistered = error_codes.contains(&"UNREGISTERED") || error_status == "UNREGISTERED";
    let bad_token = (error_codes.contains(&"INVALID_ARGUMENT") || error_status == "INVALID_ARGUMENT")
        && message.to_lowercase().contains("registration token");

    if unregistered || bad_token {
        PushError::Gone
    } else {
        PushError::Rejected { status, message }
    }
}

#[async_trait]
impl BaseFcmService for FcmService {
    async fn send(&self, token: &str, title: &str, body: &str, url: &str) -> Result<(), PushError> {
        let access_token = self
            .access_token()
            .await
            .map_err(|e| PushError::Transport(format!("{:#}", e)))?;

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&build_message(token, title, body, url))
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

/// Stand-in used when no service account is configured.
pub struct DisabledFcmService;

#[async_trait]
impl BaseFcmService for DisabledFcmService {
    async fn send(&self, _token: &str, _title: &str, _body: &str, _url: &str) -> Result<(), PushError> {
        Err(PushError::Transport("FCM is not configured".to_string()))
    }
}
