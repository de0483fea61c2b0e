pub mod reddit_message;
pub mod reddit_post;

pub use reddit_message::{MessageType, NewRedditMessage, RedditMessage};
pub use reddit_post::RedditPost;
