//! Shared fake probe for integration tests.

use anyhow::Result;
use hostguard::probe::{ProbeOutput, SystemProbe};
use std::path::PathBuf;
use std::sync::Mutex;

/// Canned-output probe that records every mutation request.
pub struct FakeProbe {
    pub socket_table: ProbeOutput,
    pub suid_listing: ProbeOutput,
    pub locked: Mutex<Vec<String>>,
    pub shell_changes: Mutex<Vec<(String, String)>>,
    pub fail_lock: bool,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self {
            socket_table: ProbeOutput::Unavailable,
            suid_listing: ProbeOutput::Unavailable,
            locked: Mutex::new(Vec::new()),
            shell_changes: Mutex::new(Vec::new()),
            fail_lock: false,
        }
    }

    pub fn with_sockets(mut self, lines: Vec<&str>) -> Self {
        self.socket_table = ProbeOutput::Lines(lines.into_iter().map(String::from).collect());
        self
    }

    pub fn with_suid(mut self, lines: Vec<&str>) -> Self {
        self.suid_listing = ProbeOutput::Lines(lines.into_iter().map(String::from).collect());
        self
    }

    pub fn failing_lock(mut self) -> Self {
        self.fail_lock = true;
        self
    }

    pub fn lock_invocations(&self) -> Vec<String> {
        self.locked.lock().unwrap().clone()
    }
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for FakeProbe {
    fn socket_table(&self) -> ProbeOutput {
        self.socket_table.clone()
    }

    fn suid_files(&self, _dirs: &[PathBuf]) -> ProbeOutput {
        self.suid_listing.clone()
    }

    fn lock_account(&self, user: &str) -> Result<()> {
        self.locked.lock().unwrap().push(user.to_string());
        if self.fail_lock {
            anyhow::bail!("usermod -L {} exited with exit status: 6", user)
        }
        Ok(())
    }

    fn set_login_shell(&self, user: &str, shell: &str) -> Result<()> {
        self.shell_changes
            .lock()
            .unwrap()
            .push((user.to_string(), shell.to_string()));
        Ok(())
    }
}
