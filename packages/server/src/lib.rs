// CodeBuilder job board - API Core
//
// Aggregates job postings from Reddit and Web3Career, serves them over a
// small REST API, and fans out push notifications (web-push + FCM) to
// subscribed clients.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
