//! Job sources feeding the ingestion pipeline.

pub mod reddit;
pub mod web3career;

pub use self::reddit::RedditJobSource;
pub use self::web3career::{Web3CareerJobSource, Web3CareerListing};
