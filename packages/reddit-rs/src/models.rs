use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reddit's listing envelope: `{ kind: "Listing", data: { children: [...] } }`
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    pub children: Vec<Thing<T>>,
    #[serde(default)]
    pub after: Option<String>,
}

/// A "thing" wrapper. `kind` is the type prefix (t1 = comment, t3 = link, t4 = message).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

impl<T> Listing<T> {
    pub fn into_children(self) -> Vec<Thing<T>> {
        self.data.children
    }
}

/// A submission from `/r/{subreddit}/new.json`.
///
/// Unknown fields are kept in `extra` so the full payload can be stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    pub url: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub selftext_html: Option<String>,
    #[serde(default)]
    pub ups: Option<i64>,
    #[serde(default)]
    pub downs: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which inbox folder to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxFilter {
    Messages,
    Comments,
}

impl InboxFilter {
    pub fn path(&self) -> &'static str {
        match self {
            InboxFilter::Messages => "/message/messages",
            InboxFilter::Comments => "/message/comments",
        }
    }
}

/// A private message or comment reply from the authenticated user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxItem {
    /// Fullname, e.g. `t4_2abcd`
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub new: Option<bool>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub was_comment: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboxItem {
    pub fn is_private_message(&self) -> bool {
        !self.was_comment && self.name.starts_with("t4_")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}
