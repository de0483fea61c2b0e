//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod fcm;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;
pub mod web3career_client;
pub mod web_push;

pub use deps::{LastIngestion, PostgresJobStore, PostgresSubscriptionStore, RedditAdapter, ServerDeps};
pub use fcm::{DisabledFcmService, FcmService, ServiceAccount};
pub use test_dependencies::TestDependencies;
pub use traits::*;
pub use web3career_client::Web3CareerClient;
pub use web_push::{VapidKeys, WebPushService};
