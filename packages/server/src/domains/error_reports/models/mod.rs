pub mod error_report;

pub use error_report::{ErrorReport, NewErrorReport};
