//! One-shot hardening passes: nologin enforcement and cron/at lockdown.
//!
//! Uses the shell-enforcement whitelist, never the UID-0 one.

use crate::config::{Config, HardeningConfig};
use crate::probe::SystemProbe;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use tracing::{error, info, warn};

/// Set every non-exempt login shell to the configured nologin shell.
/// Returns the accounts actually changed; per-user failures are
/// reported and skipped.
pub fn enforce_nologin(
    config: &HardeningConfig,
    shell_exempt: &HashSet<&str>,
    probe: &dyn SystemProbe,
) -> Result<Vec<String>> {
    let content = fs::read_to_string(&config.passwd_path)
        .with_context(|| format!("failed to read {}", config.passwd_path.display()))?;

    let candidates: Vec<&str> = content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(':').collect();
            if parts.len() <= 6 {
                return None;
            }
            let user = parts[0];
            let shell = parts[6];
            if shell.contains("nologin") || shell.contains("false") {
                return None;
            }
            if shell_exempt.contains(user) {
                return None;
            }
            Some(user)
        })
        .collect();

    if candidates.is_empty() {
        info!("No users need nologin enforcement");
        return Ok(Vec::new());
    }

    info!("Found {} users to lock down:", candidates.len());
    let mut changed = Vec::new();
    for user in candidates {
        match probe.set_login_shell(user, &config.nologin_shell) {
            Ok(()) => {
                info!("Set {} shell to {}", user, config.nologin_shell);
                changed.push(user.to_string());
            }
            Err(e) => warn!("Failed to change shell for {}: {}", user, e),
        }
    }

    Ok(changed)
}

/// Write `ALL` to each deny file so only root may use cron and at.
/// Returns the files written; per-file failures are reported and
/// skipped.
pub fn lockdown_cron_at(config: &HardeningConfig) -> Vec<std::path::PathBuf> {
    let mut written = Vec::new();
    for path in &config.deny_files {
        match fs::write(path, b"ALL\n") {
            Ok(()) => {
                info!("Wrote ALL to {}", path.display());
                written.push(path.clone());
            }
            Err(e) => error!("Failed to write {}: {}", path.display(), e),
        }
    }
    written
}

/// Run the full hardening pass.
pub fn run(config: &Config, probe: &dyn SystemProbe) -> Result<()> {
    info!("Locking down cron and at...");
    lockdown_cron_at(&config.hardening);

    info!("Enforcing nologin shells...");
    let exempt = config.whitelists.shell_exempt_set();
    enforce_nologin(&config.hardening, &exempt, probe)?;

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
        shells: Mutex<Vec<(String, String)>>,
        fail_for: Option<String>,
    }

    impl RecordingProbe {
        fn new() -> Self {
            Self {
                shells: Mutex::new(Vec::new()),
                fail_for: None,
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

        fn lock_account(&self, _user: &str) -> Result<()> {
            Ok(())
        }

        fn set_login_shell(&self, user: &str, shell: &str) -> Result<()> {
            self.shells
                .lock()
                .unwrap()
                .push((user.to_string(), shell.to_string()));
            if self.fail_for.as_deref() == Some(user) {
                anyhow::bail!("usermod failed for {}", user)
            }
            Ok(())
        }
    }

    const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
                          daemon:x:1:1::/usr/sbin:/usr/sbin/nologin\n\
                          sync:x:4:65534::/bin:/bin/false\n\
                          alice:x:1000:1000::/home/alice:/bin/bash\n\
                          bob:x:1001:1001::/home/bob:/bin/zsh\n";

    fn config_with_passwd(dir: &TempDir) -> HardeningConfig {
        let passwd = dir.path().join("passwd");
        fs::write(&passwd, PASSWD).unwrap();
        HardeningConfig {
            passwd_path: passwd,
            deny_files: vec![dir.path().join("cron.deny"), dir.path().join("at.deny")],
            ..Default::default()
        }
    }

    #[test]
    fn test_enforce_nologin_skips_exempt_and_nologin() {
        let dir = TempDir::new().unwrap();
        let config = config_with_passwd(&dir);
        let probe = RecordingProbe::new();

        let exempt: HashSet<&str> = ["root", "alice"].into_iter().collect();
        let changed = enforce_nologin(&config, &exempt, &probe).unwrap();

        // daemon/sync already locked, root/alice exempt -> only bob
        assert_eq!(changed, vec!["bob".to_string()]);
        assert_eq!(
            *probe.shells.lock().unwrap(),
            vec![("bob".to_string(), "/sbin/nologin".to_string())]
        );
    }

    #[test]
    fn test_enforce_nologin_failure_continues() {
        let dir = TempDir::new().unwrap();
        let config = config_with_passwd(&dir);
        let probe = RecordingProbe {
            shells: Mutex::new(Vec::new()),
            fail_for: Some("alice".to_string()),
        };

        let exempt: HashSet<&str> = ["root"].into_iter().collect();
        let changed = enforce_nologin(&config, &exempt, &probe).unwrap();

        // alice's failure is skipped, bob still processed
        assert_eq!(changed, vec!["bob".to_string()]);
        assert_eq!(probe.shells.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_enforce_nologin_missing_passwd_errors() {
        let dir = TempDir::new().unwrap();
        let config = HardeningConfig {
            passwd_path: dir.path().join("absent"),
            ..Default::default()
        };
        let probe = RecordingProbe::new();
        assert!(enforce_nologin(&config, &HashSet::new(), &probe).is_err());
    }

    #[test]
    fn test_lockdown_cron_at_writes_all() {
        let dir = TempDir::new().unwrap();
        let config = config_with_passwd(&dir);

        let written = lockdown_cron_at(&config);
        assert_eq!(written.len(), 2);
        for path in &config.deny_files {
            assert_eq!(fs::read_to_string(path).unwrap(), "ALL\n");
        }
    }

    #[test]
    fn test_lockdown_unwritable_path_skipped() {
        let dir = TempDir::new().unwrap();
        let ok_path = dir.path().join("cron.deny");
        let config = HardeningConfig {
            deny_files: vec![dir.path().join("no-such-dir").join("at.deny"), ok_path.clone()],
            ..Default::default()
        };

        let written = lockdown_cron_at(&config);
        assert_eq!(written, vec![ok_path]);
    }
}
