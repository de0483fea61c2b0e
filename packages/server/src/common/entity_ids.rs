//! Typed ID aliases for every persisted entity.

pub use super::id::Id;

pub struct Job;
pub struct Company;
pub struct Tag;
pub struct JobTag;
pub struct JobMetadataEntry;
pub struct Subscription;
pub struct Location;
pub struct RedditMessage;
pub struct RedditPost;
pub struct ErrorReport;

pub type JobId = Id<Job>;
pub type CompanyId = Id<Company>;
pub type TagId = Id<Tag>;
pub type JobTagId = Id<JobTag>;
pub type JobMetadataId = Id<JobMetadataEntry>;
pub type SubscriptionId = Id<Subscription>;
pub type LocationId = Id<Location>;
pub type RedditMessageId = Id<RedditMessage>;
pub type RedditPostId = Id<RedditPost>;
pub type ErrorReportId = Id<ErrorReport>;
