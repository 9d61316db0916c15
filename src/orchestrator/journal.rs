use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// States of the per-phase state machine.
///
/// `Dispatching → AwaitingHumanConfirm → Extracting → {Succeeded | Retrying | ManualFallback} → Resolved`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Dispatching,
    AwaitingHumanConfirm,
    Extracting,
    Succeeded,
    Retrying,
    ManualFallback,
    Resolved,
}

impl PhaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseState::Dispatching => "dispatching",
            PhaseState::AwaitingHumanConfirm => "awaiting_human_confirm",
            PhaseState::Extracting => "extracting",
            PhaseState::Succeeded => "succeeded",
            PhaseState::Retrying => "retrying",
            PhaseState::ManualFallback => "manual_fallback",
            PhaseState::Resolved => "resolved",
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dispatching" => Ok(PhaseState::Dispatching),
            "awaiting_human_confirm" => Ok(PhaseState::AwaitingHumanConfirm),
            "extracting" => Ok(PhaseState::Extracting),
            "succeeded" => Ok(PhaseState::Succeeded),
            "retrying" => Ok(PhaseState::Retrying),
            "manual_fallback" => Ok(PhaseState::ManualFallback),
            "resolved" => Ok(PhaseState::Resolved),
            other => anyhow::bail!("Unknown phase state: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub phase: String,
    pub attempt: u32,
    pub state: PhaseState,
    pub timestamp: DateTime<Utc>,
}

/// Append-only `phase|attempt|state|timestamp` log of phase-state transitions.
pub struct Journal {
    journal_file: PathBuf,
}

impl Journal {
    pub fn new(journal_file: PathBuf) -> Self {
        Self { journal_file }
    }

    pub fn path(&self) -> &Path {
        &self.journal_file
    }

    pub fn record(&self, phase: &str, attempt: u32, state: PhaseState) -> Result<()> {
        let entry = format!(
            "{}|{}|{}|{}\n",
            phase,
            attempt,
            state,
            Utc::now().to_rfc3339()
        );

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_file)
            .context("Failed to open journal file")?
            .write_all(entry.as_bytes())
            .context("Failed to write journal entry")?;

        Ok(())
    }

    /// All parseable entries, oldest first. Malformed lines are skipped.
    #[cfg(test)]
    pub(crate) fn entries(&self) -> Result<Vec<JournalEntry>> {
        if !self.journal_file.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.journal_file).context("Failed to read journal file")?;

        Ok(content
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('|').collect();
                if parts.len() != 4 {
                    return None;
                }
                Some(JournalEntry {
                    phase: parts[0].to_string(),
                    attempt: parts[1].parse().unwrap_or(0),
                    state: parts[2].parse().ok()?,
                    timestamp: DateTime::parse_from_rfc3339(parts[3])
                        .ok()?
                        .with_timezone(&Utc),
                })
            })
            .collect())
    }

    /// The most recently resolved phase, if any.
    #[cfg(test)]
    pub(crate) fn last_resolved_phase(&self) -> Option<String> {
        self.entries()
            .ok()?
            .into_iter()
            .rfind(|e| e.state == PhaseState::Resolved)
            .map(|e| e.phase)
    }

    /// States recorded for one phase, in order.
    #[cfg(test)]
    pub(crate) fn states_for(&self, phase: &str) -> Result<Vec<PhaseState>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.phase == phase)
            .map(|e| e.state)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_journal() -> (Journal, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");
        (Journal::new(path), dir)
    }

    #[test]
    fn test_empty_journal() {
        let (journal, _dir) = make_journal();
        assert!(journal.entries().unwrap().is_empty());
        assert!(journal.last_resolved_phase().is_none());
    }

    #[test]
    fn test_record_and_read_back() {
        let (journal, _dir) = make_journal();
        journal.record("01-intro", 1, PhaseState::Dispatching).unwrap();
        journal
            .record("01-intro", 1, PhaseState::AwaitingHumanConfirm)
            .unwrap();

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].phase, "01-intro");
        assert_eq!(entries[0].attempt, 1);
        assert_eq!(entries[0].state, PhaseState::Dispatching);
        assert_eq!(entries[1].state, PhaseState::AwaitingHumanConfirm);
    }

    #[test]
    fn test_last_resolved_phase() {
        let (journal, _dir) = make_journal();
        journal.record("00-format", 1, PhaseState::Resolved).unwrap();
        journal.record("01-intro", 1, PhaseState::Resolved).unwrap();
        journal.record("02-step1-exec", 1, PhaseState::Dispatching).unwrap();
        assert_eq!(journal.last_resolved_phase().as_deref(), Some("01-intro"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (journal, _dir) = make_journal();
        journal.record("01-intro", 1, PhaseState::Extracting).unwrap();
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(journal.path())
            .unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "01-intro|1|exploded|2024-01-01T00:00:00Z").unwrap();

        assert_eq!(journal.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_states_for_phase() {
        let (journal, _dir) = make_journal();
        journal.record("02-step1-exec", 1, PhaseState::Dispatching).unwrap();
        journal.record("02-step1-exec", 1, PhaseState::Retrying).unwrap();
        journal.record("01-intro", 1, PhaseState::Resolved).unwrap();
        journal.record("02-step1-exec", 2, PhaseState::Succeeded).unwrap();

        assert_eq!(
            journal.states_for("02-step1-exec").unwrap(),
            vec![
                PhaseState::Dispatching,
                PhaseState::Retrying,
                PhaseState::Succeeded
            ]
        );
    }

    #[test]
    fn test_state_roundtrip_through_display() {
        for state in [
            PhaseState::Dispatching,
            PhaseState::AwaitingHumanConfirm,
            PhaseState::Extracting,
            PhaseState::Succeeded,
            PhaseState::Retrying,
            PhaseState::ManualFallback,
            PhaseState::Resolved,
        ] {
            assert_eq!(state.to_string().parse::<PhaseState>().unwrap(), state);
        }
        assert!("unknown".parse::<PhaseState>().is_err());
    }

    #[test]
    fn test_journal_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");
        {
            let journal = Journal::new(path.clone());
            journal.record("01-intro", 1, PhaseState::Resolved).unwrap();
        }
        let journal = Journal::new(path);
        assert_eq!(journal.entries().unwrap().len(), 1);
    }
}
