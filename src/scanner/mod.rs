//! Content and persistence scanning.

pub mod content;
pub mod persistence;

pub use content::{ContentScanner, QUARANTINE_SUFFIX};
pub use persistence::PersistenceScanner;
