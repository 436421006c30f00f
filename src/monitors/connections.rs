//! Established-session observation via the socket probe.

use crate::probe::{ProbeOutput, SystemProbe};

const ESTABLISHED_MARKER: &str = "ESTAB";

/// Result of one observation. `Unavailable` (the listing tool is
/// missing) is deliberately distinct from an empty session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Unavailable,
    Established(Vec<String>),
}

/// List currently established sessions, verbatim, one line each.
/// Recomputed on every call; nothing is retained between polls.
pub fn observe(probe: &dyn SystemProbe) -> SessionStatus {
    match probe.socket_table() {
        ProbeOutput::Unavailable => SessionStatus::Unavailable,
        ProbeOutput::Lines(lines) => SessionStatus::Established(
            lines
                .iter()
                .filter(|line| line.contains(ESTABLISHED_MARKER))
                .map(|line| line.trim().to_string())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::path::PathBuf;

    struct CannedProbe {
        table: ProbeOutput,
    }

    impl SystemProbe for CannedProbe {
        fn socket_table(&self) -> ProbeOutput {
            self.table.clone()
        }

        fn suid_files(&self, _dirs: &[PathBuf]) -> ProbeOutput {
            ProbeOutput::Unavailable
        }

        fn lock_account(&self, _user: &str) -> Result<()> {
            Ok(())
        }

        fn set_login_shell(&self, _user: &str, _shell: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_filters_established_lines() {
        let probe = CannedProbe {
            table: ProbeOutput::Lines(vec![
                "Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port".to_string(),
                "tcp   LISTEN 0      128    0.0.0.0:22         0.0.0.0:*".to_string(),
                "tcp   ESTAB  0      0      10.0.0.5:22        10.0.0.99:51234".to_string(),
            ]),
        };

        match observe(&probe) {
            SessionStatus::Established(lines) => {
                assert_eq!(lines.len(), 1);
                assert!(lines[0].contains("10.0.0.99:51234"));
            }
            SessionStatus::Unavailable => panic!("probe was available"),
        }
    }

    #[test]
    fn test_unavailable_is_not_empty() {
        let probe = CannedProbe {
            table: ProbeOutput::Unavailable,
        };
        assert_eq!(observe(&probe), SessionStatus::Unavailable);

        let probe = CannedProbe {
            table: ProbeOutput::Lines(vec![]),
        };
        assert_eq!(observe(&probe), SessionStatus::Established(vec![]));
    }
}
