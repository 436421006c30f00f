//! External command probes.
//!
//! Everything the core needs from system utilities goes through the
//! [`SystemProbe`] trait so tests can substitute canned output. Exit
//! status and raw output lines are the entire contract; no structured
//! output is parsed here.

use anyhow::{ensure, Context, Result};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tracing::debug;

/// Outcome of a line-listing probe.
///
/// `Unavailable` means the underlying tool could not be run at all and
/// is distinct from `Lines(vec![])`, which means the tool ran and found
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutput {
    Unavailable,
    Lines(Vec<String>),
}

/// Narrow capability interface over external system utilities, one
/// method per probe.
pub trait SystemProbe: Send + Sync {
    /// Current socket table, one raw line per entry (`ss -tunap` format).
    fn socket_table(&self) -> ProbeOutput;

    /// SUID-bit files under the given directories.
    fn suid_files(&self, dirs: &[PathBuf]) -> ProbeOutput;

    /// Disable password login for an account.
    fn lock_account(&self, user: &str) -> Result<()>;

    /// Replace an account's login shell.
    fn set_login_shell(&self, user: &str, shell: &str) -> Result<()>;
}

/// Probe implementation backed by the host's real utilities.
pub struct HostProbe;

impl SystemProbe for HostProbe {
    fn socket_table(&self) -> ProbeOutput {
        capture_lines("ss", &["-tunap"], true)
    }

    fn suid_files(&self, dirs: &[PathBuf]) -> ProbeOutput {
        let mut args: Vec<String> = dirs
            .iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect();
        args.extend(["-perm".to_string(), "-4000".to_string()]);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        // find exits non-zero when a listed directory is missing but
        // still prints what it did reach, so keep whatever came out.
        capture_lines("find", &arg_refs, false)
    }

    fn lock_account(&self, user: &str) -> Result<()> {
        let status = run_streaming("usermod", &["-L", user])?;
        ensure!(status.success(), "usermod -L {} exited with {}", user, status);
        Ok(())
    }

    fn set_login_shell(&self, user: &str, shell: &str) -> Result<()> {
        let status = run_streaming("usermod", &["-s", shell, user])?;
        ensure!(
            status.success(),
            "usermod -s {} {} exited with {}",
            shell,
            user,
            status
        );
        Ok(())
    }
}

/// Run a command and collect its stdout as lines.
fn capture_lines(program: &str, args: &[&str], require_success: bool) -> ProbeOutput {
    match Command::new(program).args(args).output() {
        Ok(output) => {
            if require_success && !output.status.success() {
                debug!("{} exited with {}", program, output.status);
                return ProbeOutput::Unavailable;
            }
            let lines = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(|l| l.to_string())
                .collect();
            ProbeOutput::Lines(lines)
        }
        Err(e) => {
            debug!("{} unavailable: {}", program, e);
            ProbeOutput::Unavailable
        }
    }
}

/// Run a command, relaying its stdout and stderr line by line as they
/// arrive. The reader threads are joined before returning, so all
/// output has been flushed by the time the caller sees the status.
pub fn run_streaming(program: &str, args: &[&str]) -> Result<ExitStatus> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {}", program))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_handle = stdout.map(|out| {
        thread::spawn(move || {
            for line in BufReader::new(out).lines().map_while(Result::ok) {
                println!("{}", line);
            }
        })
    });
    let err_handle = stderr.map(|err| {
        thread::spawn(move || {
            for line in BufReader::new(err).lines().map_while(Result::ok) {
                eprintln!("{}", line);
            }
        })
    });

    let status = child
        .wait()
        .with_context(|| format!("failed to wait on {}", program))?;

    if let Some(handle) = out_handle {
        let _ = handle.join();
    }
    if let Some(handle) = err_handle {
        let _ = handle.join();
    }

    Ok(status)
}
