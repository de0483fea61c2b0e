pub mod activities;
pub mod models;

pub use activities::{ingest_jobs, IngestSummary, SourceSummary};
pub use models::{Company, Job, JobInput, JobMetadataMap, JobWithRelations, MetadataKey, Tag};
