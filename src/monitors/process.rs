//! Process census against an evolving pid baseline.
//!
//! A census is a point-in-time map of pid to command name taken from the
//! process table. The baseline absorbs every pid it sees and is never
//! pruned, so a pid is reported at most once per run even after the
//! process exits.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One running process as seen in a single census.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// String form of the numeric pid.
    pub pid: String,
    /// First NUL-separated token of the process argv. Empty for kernel
    /// threads.
    pub command: String,
}

/// Pid-keyed snapshot of the process table, rebuilt every poll.
pub type ProcessSet = HashMap<String, ProcessRecord>;

/// Enumerate the process table under `proc_root`.
///
/// Entries whose cmdline cannot be read (permission denied, process
/// exited mid-scan) are silently omitted.
pub fn capture(proc_root: &Path) -> ProcessSet {
    let mut set = ProcessSet::new();

    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(_) => return set,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let raw = match fs::read(entry.path().join("cmdline")) {
            Ok(raw) => raw,
            Err(_) => continue,
        };

        let command = raw
            .split(|b| *b == 0)
            .next()
            .map(|token| String::from_utf8_lossy(token).into_owned())
            .unwrap_or_default();

        let pid = name.into_owned();
        set.insert(
            pid.clone(),
            ProcessRecord {
                pid,
                command,
            },
        );
    }

    set
}

/// The only cross-cycle mutable state in the monitor: every pid ever
/// observed this run.
#[derive(Debug, Default)]
pub struct ProcessBaseline {
    known: ProcessSet,
}

impl ProcessBaseline {
    /// Take the initial census. Nothing in it is reported.
    pub fn capture(proc_root: &Path) -> Self {
        Self {
            known: capture(proc_root),
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.known.contains_key(pid)
    }

    /// Return records present in `current` but not yet in the baseline,
    /// absorbing them so they are not reported again. The baseline only
    /// grows; exited pids are kept (pid recycling is not detected).
    pub fn diff_and_absorb(&mut self, current: &ProcessSet) -> Vec<ProcessRecord> {
        let mut fresh: Vec<ProcessRecord> = current
            .values()
            .filter(|record| !self.known.contains_key(&record.pid))
            .cloned()
            .collect();

        // Numeric pid order keeps output stable across runs.
        fresh.sort_by_key(|record| record.pid.parse::<u64>().unwrap_or(u64::MAX));

        for record in &fresh {
            self.known.insert(record.pid.clone(), record.clone());
        }

        fresh
    }
}
