// HTTP routes
pub mod errors;
pub mod health;
pub mod jobs;
pub mod locations;
pub mod notifications;
pub mod reddit;
pub mod web3career;

pub use health::health_handler;
