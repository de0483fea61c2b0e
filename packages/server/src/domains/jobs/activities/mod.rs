pub mod ingest;

pub use ingest::{ingest_jobs, IngestSummary, SourceSummary};
