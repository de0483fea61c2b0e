// Business domains
pub mod error_reports;
pub mod jobs;
pub mod locations;
pub mod notifications;
pub mod reddit;
pub mod sources;
