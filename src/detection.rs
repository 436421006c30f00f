//! Common types for findings produced by monitors and scanners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What a finding is about. Remediation eligibility hangs off this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NewProcess,
    EstablishedConnection,
    FileModified,
    CronEntry,
    SystemdUnit,
    PrivilegedUser,
    RootAuthorizedKey,
    LdPreload,
    SuidBinary,
    SuspiciousContent,
}

impl FindingKind {
    /// Whether an automatic remedy exists for this kind.
    ///
    /// Only narrow, low-collateral actions qualify: locking one account,
    /// clearing one key file, deleting one anomalous config, cleaning one
    /// script. Killing processes, tearing down sessions, or disabling
    /// systemd units stay reporting-only.
    pub fn remediable(&self) -> bool {
        matches!(
            self,
            FindingKind::PrivilegedUser
                | FindingKind::RootAuthorizedKey
                | FindingKind::LdPreload
                | FindingKind::SuspiciousContent
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    Monitor,
    PersistenceScan,
}

impl std::fmt::Display for FindingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monitor => write!(f, "monitor"),
            Self::PersistenceScan => write!(f, "persistence"),
        }
    }
}

/// One observation from a monitor or scanner, consumed once by the
/// response handler and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source: FindingSource,
    pub kind: FindingKind,
    pub severity: Severity,
    /// Path or identifier the finding is about (file path, username, pid...).
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_signature: Option<String>,
    pub remediable: bool,
}

impl Finding {
    pub fn new(
        source: FindingSource,
        kind: FindingKind,
        severity: Severity,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: finding_id(),
            timestamp: Utc::now(),
            source,
            kind,
            severity,
            subject: subject.into(),
            detail: None,
            matched_signature: None,
            remediable: kind.remediable(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.matched_signature = Some(signature.into());
        self
    }
}

/// Generate a unique finding ID using timestamp, counter, and random bytes.
fn finding_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let random_part: u32 = {
        let mut buf = [0u8; 4];
        if getrandom::getrandom(&mut buf).is_ok() {
            u32::from_ne_bytes(buf)
        } else {
            // Fallback: mix counter, pid, and time
            let mix = counter
                .wrapping_mul(0x517cc1b727220a95)
                .wrapping_add(std::process::id() as u64)
                .wrapping_mul(0x2545f4914f6cdd1d);
            mix as u32
        }
    };

    format!(
        "fnd-{:012x}-{:04x}-{:08x}",
        now.as_nanos() as u64 & 0xFFFFFFFFFFFF,
        counter & 0xFFFF,
        random_part
    )
}
