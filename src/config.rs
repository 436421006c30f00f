//! TOML-based configuration for the monitor, scanner, and hardening passes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

const CRITICAL_FILES: &[&str] = &["/etc/passwd", "/etc/shadow", "/etc/group", "/etc/hosts"];

const CRON_DIRS: &[&str] = &[
    "/var/spool/cron",
    "/etc/cron.d",
    "/etc/cron.daily",
    "/etc/cron.hourly",
    "/etc/cron.monthly",
    "/etc/cron.weekly",
];

const STARTUP_FILES: &[&str] = &[
    "/root/.bashrc",
    "/root/.profile",
    "/etc/profile",
    "/etc/bashrc",
];

const SUID_DIRS: &[&str] = &["/bin", "/usr/bin"];

// Substrings that mark a cron entry or shell snippet as hostile on a
// defended box: reverse shells, staged downloads, service tampering.
const SUSPICIOUS_SIGNATURES: &[&str] = &[
    "nc -e",
    "bash -i",
    "dev/tcp",
    "curl",
    "wget",
    "python -c",
    "systemctl stop",
    "iptables",
    "nft",
    "systemctl disable",
];

const DEFAULT_EXEMPT_USERS: &[&str] = &["root", "sysadmin"];

const DENY_FILES: &[&str] = &["/etc/cron.deny", "/etc/at.deny"];

fn to_string_vec(arr: &[&str]) -> Vec<String> {
    arr.iter().map(|s| s.to_string()).collect()
}

fn to_pathbuf_vec(arr: &[&str]) -> Vec<PathBuf> {
    arr.iter().map(PathBuf::from).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub whitelists: WhitelistConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub hardening: HardeningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Two independent username whitelists. `shell_exempt` spares accounts
/// from nologin enforcement; `uid0_exempt` spares accounts from the
/// UID-0 persistence check. They are consulted separately and must not
/// be merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistConfig {
    #[serde(default = "default_exempt_users")]
    pub shell_exempt: Vec<String>,
    #[serde(default = "default_exempt_users")]
    pub uid0_exempt: Vec<String>,
}

fn default_exempt_users() -> Vec<String> {
    to_string_vec(DEFAULT_EXEMPT_USERS)
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            shell_exempt: default_exempt_users(),
            uid0_exempt: default_exempt_users(),
        }
    }
}

impl WhitelistConfig {
    pub fn uid0_exempt_set(&self) -> HashSet<&str> {
        self.uid0_exempt.iter().map(String::as_str).collect()
    }

    pub fn shell_exempt_set(&self) -> HashSet<&str> {
        self.shell_exempt.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between polls. Overridable from the command line.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Process table root. Only ever changed by tests.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    /// Files whose modification is always worth a warning.
    #[serde(default = "default_critical_files")]
    pub critical_files: Vec<PathBuf>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_critical_files() -> Vec<PathBuf> {
    to_pathbuf_vec(CRITICAL_FILES)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            proc_root: default_proc_root(),
            critical_files: default_critical_files(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_cron_dirs")]
    pub cron_dirs: Vec<PathBuf>,
    #[serde(default = "default_crontab")]
    pub crontab: PathBuf,
    #[serde(default = "default_systemd_unit_dir")]
    pub systemd_unit_dir: PathBuf,
    #[serde(default = "default_passwd_path")]
    pub passwd_path: PathBuf,
    #[serde(default = "default_root_authorized_keys")]
    pub root_authorized_keys: PathBuf,
    #[serde(default = "default_preload_path")]
    pub preload_path: PathBuf,
    #[serde(default = "default_startup_files")]
    pub startup_files: Vec<PathBuf>,
    #[serde(default = "default_suid_dirs")]
    pub suid_dirs: Vec<PathBuf>,
    /// Signature substrings, tested in order against file content.
    #[serde(default = "default_signatures")]
    pub signatures: Vec<String>,
}

fn default_cron_dirs() -> Vec<PathBuf> {
    to_pathbuf_vec(CRON_DIRS)
}

fn default_crontab() -> PathBuf {
    PathBuf::from("/etc/crontab")
}

fn default_systemd_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_passwd_path() -> PathBuf {
    PathBuf::from("/etc/passwd")
}

fn default_root_authorized_keys() -> PathBuf {
    PathBuf::from("/root/.ssh/authorized_keys")
}

fn default_preload_path() -> PathBuf {
    PathBuf::from("/etc/ld.so.preload")
}

fn default_startup_files() -> Vec<PathBuf> {
    to_pathbuf_vec(STARTUP_FILES)
}

fn default_suid_dirs() -> Vec<PathBuf> {
    to_pathbuf_vec(SUID_DIRS)
}

fn default_signatures() -> Vec<String> {
    to_string_vec(SUSPICIOUS_SIGNATURES)
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            cron_dirs: default_cron_dirs(),
            crontab: default_crontab(),
            systemd_unit_dir: default_systemd_unit_dir(),
            passwd_path: default_passwd_path(),
            root_authorized_keys: default_root_authorized_keys(),
            preload_path: default_preload_path(),
            startup_files: default_startup_files(),
            suid_dirs: default_suid_dirs(),
            signatures: default_signatures(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardeningConfig {
    #[serde(default = "default_deny_files")]
    pub deny_files: Vec<PathBuf>,
    #[serde(default = "default_nologin_shell")]
    pub nologin_shell: String,
    #[serde(default = "default_passwd_path")]
    pub passwd_path: PathBuf,
}

fn default_deny_files() -> Vec<PathBuf> {
    to_pathbuf_vec(DENY_FILES)
}

fn default_nologin_shell() -> String {
    "/sbin/nologin".to_string()
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            deny_files: default_deny_files(),
            nologin_shell: default_nologin_shell(),
            passwd_path: default_passwd_path(),
        }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_or_default(path: &std::path::Path) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
