//! Modification tracking for security-critical files.
//!
//! Each tracked path carries the mtime from the previous poll and is
//! compared against it, so a change is reported exactly once no matter
//! how long ago it happened relative to the poll that sees it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Modified,
    Appeared,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

/// Prior-snapshot mtime watch over a fixed path list.
#[derive(Debug)]
pub struct FileWatch {
    entries: HashMap<PathBuf, Option<SystemTime>>,
}

impl FileWatch {
    /// Stat every tracked path once. Paths missing at start produce no
    /// change until they appear.
    pub fn new(paths: &[PathBuf]) -> Self {
        let entries = paths
            .iter()
            .map(|path| (path.clone(), mtime(path)))
            .collect();
        Self { entries }
    }

    /// Re-stat every tracked path and report what changed since the
    /// previous poll, updating the stored state.
    pub fn poll(&mut self) -> Vec<FileChange> {
        let mut changes = Vec::new();

        for (path, last) in self.entries.iter_mut() {
            let current = mtime(path);
            let kind = match (&*last, &current) {
                (Some(prev), Some(now)) if prev != now => Some(FileChangeKind::Modified),
                (Some(_), None) => Some(FileChangeKind::Removed),
                (None, Some(_)) => Some(FileChangeKind::Appeared),
                _ => None,
            };

            if let Some(kind) = kind {
                changes.push(FileChange {
                    path: path.clone(),
                    kind,
                });
                *last = current;
            }
        }

        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
