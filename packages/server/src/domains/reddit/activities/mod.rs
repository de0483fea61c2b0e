pub mod check_messages;
pub mod fetch_posts;

pub use check_messages::check_messages;
pub use fetch_posts::{fetch_and_store_posts, PostFetchSummary};
