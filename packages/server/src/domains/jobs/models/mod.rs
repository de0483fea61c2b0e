pub mod company;
pub mod job;
pub mod job_metadata;
pub mod tag;

pub use company::Company;
pub use job::{Job, JobInput, JobSource, JobWithRelations, UpsertOutcome};
pub use job_metadata::{JobMetadata, JobMetadataMap, MetadataKey};
pub use tag::{JobTag, Tag};
