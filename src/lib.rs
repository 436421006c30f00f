//! hostguard
//!
//! A lightweight defense aid for time-boxed exercises: baselines host
//! state, re-checks it on an interval, and scans the usual persistence
//! vectors with optional auto-remediation.
//!
//! This library provides the monitoring and scanning functionality.
//! The binary in main.rs uses this library to run the commands.

pub mod config;
pub mod detection;
pub mod hardening;
pub mod monitors;
pub mod probe;
pub mod response;
pub mod scanner;

// Re-export commonly used types
pub use config::Config;
pub use detection::{Finding, FindingKind, FindingSource, Severity};
