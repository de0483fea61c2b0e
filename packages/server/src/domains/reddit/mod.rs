//! Legacy Reddit archive: inbox messages and hiring posts.

pub mod activities;
pub mod models;

pub use self::activities::{check_messages, fetch_and_store_posts, PostFetchSummary};
pub use self::models::{MessageType, RedditMessage, RedditPost};
