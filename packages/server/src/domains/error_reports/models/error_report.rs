use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::common::ErrorReportId;

/// Crash or error reported by a client app. The full request body is kept in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub id: ErrorReportId,
    pub message: String,
    pub stack: Option<String>,
    pub platform: Option<String>,
    pub is_fatal: Option<bool>,
    pub error_info: Option<Value>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewErrorReport {
    pub message: String,
    pub stack: Option<String>,
    pub platform: Option<String>,
    pub is_fatal: Option<bool>,
    pub error_info: Option<Value>,
    pub payload: Value,
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl NewErrorReport {
    /// Validate a report body: `{message, stack?, platform?, options?: {isFatal?, errorInfo?}}`.
    pub fn from_payload(payload: &Value) -> std::result::Result<Self, &'static str> {
        let Some(message) = payload.get("message").and_then(Value::as_str) else {
            return Err("Invalid error report payload. \"message\" is required.");
        };

        let options = payload.get("options");
        let is_fatal = options
            .and_then(|o| o.get("isFatal"))
            .and_then(Value::as_bool)
            // A false flag is stored as unknown, like a missing one
            .filter(|fatal| *fatal);
        let error_info = options
            .and_then(|o| o.get("errorInfo"))
            .filter(|info| !info.is_null())
            .cloned();

        Ok(Self {
            message: message.to_string(),
            stack: text(payload, "stack"),
            platform: text(payload, "platform"),
            is_fatal,
            error_info,
            payload: payload.clone(),
        })
    }
}

impl ErrorReport {
    pub async fn create(input: &NewErrorReport, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO error_reports (id, message, stack, platform, is_fatal, error_info, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(ErrorReportId::new())
        .bind(&input.message)
        .bind(&input.stack)
        .bind(&input.platform)
        .bind(input.is_fatal)
        .bind(&input.error_info)
        .bind(&input.payload)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
