pub mod models;

pub use models::{ErrorReport, NewErrorReport};
