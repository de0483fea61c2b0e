pub mod activities;
pub mod models;

pub use activities::{DeliveryOutcome, DispatchSummary};
pub use models::{NewSubscription, NotificationPayload, Subscription, SubscriptionType};
