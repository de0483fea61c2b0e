use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{LocationId, SubscriptionId};

/// Device position reported for a subscription (coordinates plus reverse-geocoded address)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub subscription_id: SubscriptionId,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub mocked: bool,
    pub city: Option<String>,
    pub country: Option<String>,
    pub district: Option<String>,
    pub formatted_address: Option<String>,
    pub iso_country_code: Option<String>,
    pub name: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub subregion: Option<String>,
    pub timezone: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Location body as posted by the mobile app. `subscription_id` is the FCM token.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    pub subscription_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub mocked: Option<bool>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub district: Option<String>,
    pub formatted_address: Option<String>,
    pub iso_country_code: Option<String>,
    pub name: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub subregion: Option<String>,
    pub timezone: Option<String>,
}

impl LocationReport {
    /// Parse a request body. Only JSON objects are accepted.
    pub fn from_body(body: &serde_json::Value) -> std::result::Result<Self, &'static str> {
        if !body.is_object() {
            return Err("Invalid location data.");
        }
        serde_json::from_value(body.clone()).map_err(|_| "Invalid location data.")
    }

    /// Token used to look up the owning subscription
    pub fn token(&self) -> Option<&str> {
        self.subscription_id.as_deref().filter(|t| !t.is_empty())
    }
}

impl Location {
    pub async fn create(
        subscription_id: SubscriptionId,
        report: &LocationReport,
        ip_address: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO locations (
                id, subscription_id, latitude, longitude, accuracy, altitude,
                altitude_accuracy, heading, speed, mocked, city, country, district,
                formatted_address, iso_country_code, name, postal_code, region,
                street, street_number, subregion, timezone, ip_address
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            RETURNING *
            "#,
        )
        .bind(LocationId::new())
        .bind(subscription_id)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.accuracy)
        .bind(report.altitude)
        .bind(report.altitude_accuracy)
        .bind(report.heading)
        .bind(report.speed)
        .bind(report.mocked.unwrap_or(false))
        .bind(&report.city)
        .bind(&report.country)
        .bind(&report.district)
        .bind(&report.formatted_address)
        .bind(&report.iso_country_code)
        .bind(&report.name)
        .bind(&report.postal_code)
        .bind(&report.region)
        .bind(&report.street)
        .bind(&report.street_number)
        .bind(&report.subregion)
        .bind(&report.timezone)
        .bind(ip_address)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_subscription(
        subscription_id: SubscriptionId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM locations WHERE subscription_id = $1 ORDER BY created_at DESC",
        )
        .bind(subscription_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
