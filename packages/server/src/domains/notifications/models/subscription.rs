use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::SubscriptionId;

/// Push channel of a subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    Web,
    Fcm,
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionType::Web => write!(f, "web"),
            SubscriptionType::Fcm => write!(f, "fcm"),
        }
    }
}

impl std::str::FromStr for SubscriptionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "web" => Ok(SubscriptionType::Web),
            "fcm" => Ok(SubscriptionType::Fcm),
            _ => Err(anyhow::anyhow!("Invalid subscription type: {}", s)),
        }
    }
}

/// Browser or device opted in to notifications. Unique by (endpoint, type).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub subscription_type: String, // 'web' | 'fcm'
    pub endpoint: String,
    pub keys: serde_json::Value, // {auth, p256dh} or {token}
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated delivery target of a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    Web {
        endpoint: String,
        p256dh: String,
        auth: String,
    },
    Fcm {
        token: String,
    },
}

/// Subscription opt-in as received from a client
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub subscription_type: SubscriptionType,
    pub endpoint: String,
    pub keys: serde_json::Value,
    pub ip_address: Option<String>,
}

fn string_key<'a>(keys: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    keys.get(name).and_then(|v| v.as_str())
}

impl Subscription {
    pub fn kind(&self) -> Result<SubscriptionType> {
        self.subscription_type.parse()
    }

    /// Validate the stored keys for this subscription's channel.
    pub fn target(&self) -> Result<PushTarget> {
        match self.kind()? {
            SubscriptionType::Web => {
                match (string_key(&self.keys, "p256dh"), string_key(&self.keys, "auth")) {
                    (Some(p256dh), Some(auth)) => Ok(PushTarget::Web {
                        endpoint: self.endpoint.clone(),
                        p256dh: p256dh.to_string(),
                        auth: auth.to_string(),
                    }),
                    _ => Err(anyhow::anyhow!(
                        "Invalid keys for web subscription: {}",
                        self.keys
                    )),
                }
            }
            SubscriptionType::Fcm => match string_key(&self.keys, "token") {
                Some(token) => Ok(PushTarget::Fcm {
                    token: token.to_string(),
                }),
                None => Err(anyhow::anyhow!(
                    "Invalid keys for FCM subscription: {}",
                    self.keys
                )),
            },
        }
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM subscriptions ORDER BY created_at")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Find the subscription whose `keys.token` matches (FCM devices).
    pub async fn find_by_token(token: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM subscriptions WHERE keys->>'token' = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Create or refresh a subscription by (endpoint, type).
    pub async fn upsert(input: &NewSubscription, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO subscriptions (id, type, endpoint, keys, ip_address)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (endpoint, type) DO UPDATE SET
                keys = EXCLUDED.keys,
                ip_address = EXCLUDED.ip_address,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(SubscriptionId::new())
        .bind(input.subscription_type.to_string())
        .bind(&input.endpoint)
        .bind(&input.keys)
        .bind(&input.ip_address)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Returns whether a row was removed.
    pub async fn delete(id: SubscriptionId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl NewSubscription {
    /// Validate a subscribe request body. Returns the client-facing error message on failure.
    pub fn from_request(
        body: &serde_json::Value,
        ip_address: Option<String>,
    ) -> std::result::Result<Self, &'static str> {
        let endpoint = body
            .get("endpoint")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());
        let raw_type = body
            .get("type")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());

        let (Some(endpoint), Some(raw_type)) = (endpoint, raw_type) else {
            return Err("Invalid subscription data.");
        };

        let subscription_type: SubscriptionType = raw_type
            .parse()
            .map_err(|_| "Invalid subscription data.")?;

        let keys = body
            .get("keys")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let non_empty = |name: &str| string_key(&keys, name).is_some_and(|v| !v.is_empty());

        match subscription_type {
            SubscriptionType::Fcm if !non_empty("token") => {
                return Err("Invalid FCM subscription data: missing token.");
            }
            SubscriptionType::Web if !(non_empty("p256dh") && non_empty("auth")) => {
                return Err("Invalid web-push subscription data: missing keys.");
            }
            _ => {}
        }

        Ok(Self {
            subscription_type,
            endpoint: endpoint.to_string(),
            keys,
            ip_address,
        })
    }
}
