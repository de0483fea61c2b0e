pub mod payload;
pub mod subscription;

pub use payload::NotificationPayload;
pub use subscription::{NewSubscription, PushTarget, Subscription, SubscriptionType};
