//! Persistence-vector enumeration and classification.
//!
//! Vectors covered:
//! - Cron directories and the system crontab
//! - Local systemd units
//! - UID-0 accounts and root's authorized_keys
//! - Shell startup files
//! - /etc/ld.so.preload
//! - SUID binaries (reporting only)
//!
//! Every vector is independent: an unreadable directory or file skips
//! that vector only and never aborts the remaining scans.

use crate::config::{PersistenceConfig, WhitelistConfig};
use crate::detection::{Finding, FindingKind, FindingSource, Severity};
use crate::probe::{ProbeOutput, SystemProbe};
use crate::scanner::content::ContentScanner;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct PersistenceScanner {
    config: PersistenceConfig,
    uid0_exempt: HashSet<String>,
    scanner: ContentScanner,
    probe: Arc<dyn SystemProbe>,
}

impl PersistenceScanner {
    pub fn new(
        config: PersistenceConfig,
        whitelists: &WhitelistConfig,
        probe: Arc<dyn SystemProbe>,
    ) -> Self {
        let scanner = ContentScanner::new(config.signatures.clone());
        let uid0_exempt = whitelists
            .uid0_exempt
            .iter()
            .cloned()
            .collect();

        Self {
            config,
            uid0_exempt,
            scanner,
            probe,
        }
    }

    pub fn content_scanner(&self) -> &ContentScanner {
        &self.scanner
    }

    /// Run every vector and collect the findings.
    pub fn scan_all(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        info!("Checking cron jobs...");
        findings.extend(self.scan_cron());
        info!("Checking systemd units...");
        findings.extend(self.scan_systemd());
        info!("Checking users...");
        findings.extend(self.scan_users());
        info!("Checking startup files...");
        findings.extend(self.scan_startup());
        info!("Checking loader preload...");
        findings.extend(self.scan_preload());
        info!("Checking SUID binaries...");
        findings.extend(self.scan_suid());

        findings
    }

    /// Every file under the cron directories plus the system crontab:
    /// existence is informational, signature hits are critical.
    pub fn scan_cron(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        for dir in &self.config.cron_dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            let mut paths: Vec<_> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            paths.sort();

            for path in paths {
                findings.push(Finding::new(
                    FindingSource::PersistenceScan,
                    FindingKind::CronEntry,
                    Severity::Info,
                    path.display().to_string(),
                ));
                findings.extend(self.scan_file_content(&path));
            }
        }

        if self.config.crontab.is_file() {
            findings.push(Finding::new(
                FindingSource::PersistenceScan,
                FindingKind::CronEntry,
                Severity::Info,
                self.config.crontab.display().to_string(),
            ));
            findings.extend(self.scan_file_content(&self.config.crontab));
        }

        findings
    }

    /// Service and timer units under the local unit directory. Reported
    /// only; auto-disabling a unit risks more damage than a missed
    /// detection on this vector.
    pub fn scan_systemd(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        let entries = match fs::read_dir(&self.config.systemd_unit_dir) {
            Ok(entries) => entries,
            Err(_) => return findings,
        };

        let mut paths: Vec<_> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.ends_with(".service") || name.ends_with(".timer") {
                findings.push(Finding::new(
                    FindingSource::PersistenceScan,
                    FindingKind::SystemdUnit,
                    Severity::Info,
                    path.display().to_string(),
                ));
            }
        }

        findings
    }

    /// UID-0 accounts outside the whitelist, plus root's authorized_keys.
    pub fn scan_users(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        match fs::read_to_string(&self.config.passwd_path) {
            Ok(content) => {
                for line in content.lines() {
                    let parts: Vec<&str> = line.split(':').collect();
                    if parts.len() <= 2 {
                        continue;
                    }
                    let user = parts[0];
                    let uid = parts[2];
                    if uid == "0" && !self.uid0_exempt.contains(user) {
                        findings.push(Finding::new(
                            FindingSource::PersistenceScan,
                            FindingKind::PrivilegedUser,
                            Severity::Critical,
                            user,
                        ));
                    }
                }
            }
            Err(e) => {
                // This vector aborts; siblings still run.
                error!(
                    "Could not read {}: {}",
                    self.config.passwd_path.display(),
                    e
                );
            }
        }

        let keys_path = &self.config.root_authorized_keys;
        if keys_path.is_file() {
            let content = fs::read_to_string(keys_path).unwrap_or_default();
            if !content.is_empty() {
                findings.push(Finding::new(
                    FindingSource::PersistenceScan,
                    FindingKind::RootAuthorizedKey,
                    Severity::Critical,
                    keys_path.display().to_string(),
                ));
            }
        }

        findings
    }

    /// Signature scan over the configured shell-init files.
    pub fn scan_startup(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for path in &self.config.startup_files {
            findings.extend(self.scan_file_content(path));
        }
        findings
    }

    /// The preload file existing at all is the finding; its content is
    /// carried along for the report.
    pub fn scan_preload(&self) -> Vec<Finding> {
        let path = &self.config.preload_path;
        if !path.exists() {
            return Vec::new();
        }

        let content = fs::read_to_string(path).unwrap_or_default();
        vec![Finding::new(
            FindingSource::PersistenceScan,
            FindingKind::LdPreload,
            Severity::Critical,
            path.display().to_string(),
        )
        .with_detail(content)]
    }

    /// SUID listing via the external find probe, reported verbatim.
    pub fn scan_suid(&self) -> Vec<Finding> {
        match self.probe.suid_files(&self.config.suid_dirs) {
            ProbeOutput::Unavailable => {
                debug!("SUID listing tool unavailable; skipping vector");
                Vec::new()
            }
            ProbeOutput::Lines(lines) => lines
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(|line| {
                    Finding::new(
                        FindingSource::PersistenceScan,
                        FindingKind::SuidBinary,
                        Severity::Info,
                        line,
                    )
                })
                .collect(),
        }
    }

    /// One `SuspiciousContent` finding per file with any signature hit.
    /// A single finding keeps remediation to one quarantine per file.
    fn scan_file_content(&self, path: &Path) -> Vec<Finding> {
        let matched = self.scanner.scan(path);
        if matched.is_empty() {
            return Vec::new();
        }

        vec![Finding::new(
            FindingSource::PersistenceScan,
            FindingKind::SuspiciousContent,
            Severity::Critical,
            path.display().to_string(),
        )
        .with_signature(matched.join(", "))]
    }
}
