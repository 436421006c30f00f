//! Finding reporting and the remediation decision table.

pub mod actions;

pub use actions::{ActionResult, RemediationActions};

use crate::config::LogFormat;
use crate::detection::{Finding, FindingKind};
use crate::probe::SystemProbe;
use crate::scanner::content::ContentScanner;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Consumes findings, reports each one, and applies the remediation
/// decision table.
///
/// Kinds with a narrow remedy (one account, one file) act when
/// auto-remediation is on; everything else is reporting-only in both
/// modes.
pub struct ResponseHandler {
    format: LogFormat,
    actions: RemediationActions,
}

impl ResponseHandler {
    pub fn new(
        format: LogFormat,
        auto_remediate: bool,
        probe: Arc<dyn SystemProbe>,
        scanner: ContentScanner,
    ) -> Self {
        Self {
            format,
            actions: RemediationActions::new(auto_remediate, probe, scanner),
        }
    }

    /// Drain the finding channel until every sender is gone.
    pub async fn run(&self, mut rx: mpsc::Receiver<Finding>) {
        info!("Response handler started");
        while let Some(finding) = rx.recv().await {
            self.handle(&finding);
        }
    }

    /// Report a finding and, where the decision table allows, remediate
    /// it. A failed action is reported once and never retried.
    pub fn handle(&self, finding: &Finding) -> Option<ActionResult> {
        self.report(finding);

        let result = match finding.kind {
            FindingKind::PrivilegedUser => Some(self.actions.lock_account(&finding.subject)),
            FindingKind::RootAuthorizedKey => {
                Some(self.actions.clear_authorized_keys(Path::new(&finding.subject)))
            }
            FindingKind::LdPreload => {
                Some(self.actions.remove_preload(Path::new(&finding.subject)))
            }
            FindingKind::SuspiciousContent => {
                Some(self.actions.quarantine_and_clean(Path::new(&finding.subject)))
            }
            // No remediation path exists for these kinds, in either mode.
            FindingKind::NewProcess
            | FindingKind::EstablishedConnection
            | FindingKind::FileModified
            | FindingKind::CronEntry
            | FindingKind::SystemdUnit
            | FindingKind::SuidBinary => None,
        };

        if let Some(ref outcome) = result {
            self.report_outcome(outcome);
        }

        result
    }

    fn report(&self, finding: &Finding) {
        match self.format {
            LogFormat::Json => {
                if let Ok(json) = serde_json::to_string(finding) {
                    println!("{}", json);
                }
            }
            LogFormat::Text => {
                let mut line = format!(
                    "[{}] {} {:?}/{:?}: {}",
                    finding.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    finding.source,
                    finding.severity,
                    finding.kind,
                    finding.subject
                );
                if let Some(ref sig) = finding.matched_signature {
                    line.push_str(&format!(" (matched '{}')", sig));
                }
                println!("{}", line);

                if let Some(ref detail) = finding.detail {
                    if !detail.is_empty() {
                        println!("  {}", detail.trim_end().replace('\n', "\n  "));
                    }
                }
            }
        }
    }

    fn report_outcome(&self, outcome: &ActionResult) {
        match outcome {
            ActionResult::Success { action, message } => {
                info!("{}: {}", action, message);
                if self.format == LogFormat::Text {
                    println!("  -> {}", message);
                }
            }
            ActionResult::ReportOnly { .. } => {}
            ActionResult::Failed { action, error } => {
                warn!("{} failed: {}", action, error);
                if self.format == LogFormat::Text {
                    println!("  -> FAILED: {}", error);
                }
            }
        }
    }
}
