//! Monitor modules
//!
//! Each observer covers one aspect of host state; the baseline monitor
//! drives them on a fixed interval and diffs against the prior poll.

pub mod baseline;
pub mod connections;
pub mod files;
pub mod process;

pub use baseline::BaselineMonitor;
pub use connections::SessionStatus;
pub use files::{FileChange, FileChangeKind, FileWatch};
pub use process::{ProcessBaseline, ProcessRecord, ProcessSet};
