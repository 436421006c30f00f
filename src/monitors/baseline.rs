//! Baseline monitor: diffs each poll against the previous observation.
//!
//! One census at startup becomes the baseline; every tick after that
//! runs the process diff, the session observation, and the critical-file
//! check strictly in that order, then sleeps. All cross-cycle state
//! lives in this struct and is touched only by this loop.

use crate::config::MonitorConfig;
use crate::detection::{Finding, FindingKind, FindingSource, Severity};
use crate::monitors::connections::{self, SessionStatus};
use crate::monitors::files::{FileChangeKind, FileWatch};
use crate::monitors::process::{self, ProcessBaseline};
use crate::probe::SystemProbe;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct BaselineMonitor {
    config: MonitorConfig,
    probe: Arc<dyn SystemProbe>,
    event_tx: mpsc::Sender<Finding>,
}

impl BaselineMonitor {
    pub fn new(
        config: MonitorConfig,
        probe: Arc<dyn SystemProbe>,
        event_tx: mpsc::Sender<Finding>,
    ) -> Self {
        Self {
            config,
            probe,
            event_tx,
        }
    }

    /// Run the monitor loop. Returns when the finding channel closes;
    /// otherwise the loop has no terminal state and runs until the
    /// process is interrupted.
    pub async fn run(&mut self) -> Result<()> {
        let mut baseline = ProcessBaseline::capture(&self.config.proc_root);
        info!("Baseline taken: {} processes", baseline.len());

        let mut watch = FileWatch::new(&self.config.critical_files);

        let interval = tokio::time::Duration::from_secs(self.config.interval_secs);

        loop {
            tokio::time::sleep(interval).await;

            let findings = poll_once(&self.config, self.probe.as_ref(), &mut baseline, &mut watch);
            for finding in findings {
                if self.event_tx.send(finding).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// One tick: process diff, then sessions, then critical files.
pub fn poll_once(
    config: &MonitorConfig,
    probe: &dyn SystemProbe,
    baseline: &mut ProcessBaseline,
    watch: &mut FileWatch,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    let current = process::capture(&config.proc_root);
    for record in baseline.diff_and_absorb(&current) {
        findings.push(
            Finding::new(
                FindingSource::Monitor,
                FindingKind::NewProcess,
                Severity::Warning,
                format!("{} (pid {})", record.command, record.pid),
            )
            .with_detail(record.pid),
        );
    }

    match connections::observe(probe) {
        SessionStatus::Unavailable => {
            debug!("socket listing tool unavailable; skipping session check")
        }
        SessionStatus::Established(lines) => {
            for line in lines {
                findings.push(Finding::new(
                    FindingSource::Monitor,
                    FindingKind::EstablishedConnection,
                    Severity::Info,
                    line,
                ));
            }
        }
    }

    for change in watch.poll() {
        let detail = match change.kind {
            FileChangeKind::Modified => "modified",
            FileChangeKind::Appeared => "appeared",
            FileChangeKind::Removed => "removed",
        };
        findings.push(
            Finding::new(
                FindingSource::Monitor,
                FindingKind::FileModified,
                Severity::Warning,
                change.path.display().to_string(),
            )
            .with_detail(detail),
        );
    }

    findings
}
