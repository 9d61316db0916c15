use super::{PhaseAudit, SessionAudit, SessionConfig, StepResolution};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the audit record inside the session folder.
pub const SESSION_FILE: &str = "session.json";

/// Writes `session.json` after every change so an interrupted session still
/// leaves an accurate record behind.
pub struct AuditLogger {
    session_file: PathBuf,
    current: Option<SessionAudit>,
}

impl AuditLogger {
    pub fn new(session_dir: &Path) -> Self {
        Self {
            session_file: session_dir.join(SESSION_FILE),
            current: None,
        }
    }

    pub fn start_session(&mut self, config: SessionConfig) -> Result<()> {
        self.current = Some(SessionAudit::new(config));
        self.save_current()
    }

    /// Record how the step count was resolved.
    ///
    /// Errors when no session is active.
    pub fn record_steps(&mut self, steps: StepResolution) -> Result<()> {
        let session = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("record_steps called with no active session"))?;
        session.steps = Some(steps);
        self.save_current()
    }

    /// Add a phase record. Errors when no session is active.
    pub fn add_phase(&mut self, phase: PhaseAudit) -> Result<()> {
        let session = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("add_phase called with no active session"))?;
        session.phases.push(phase);
        self.save_current()
    }

    /// Apply a mutation to the most recent phase record.
    pub fn update_last_phase<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut PhaseAudit),
    {
        let session = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("update_last_phase called with no active session"))?;
        let phase = session
            .phases
            .last_mut()
            .ok_or_else(|| anyhow::anyhow!("update_last_phase called with no phases in session"))?;
        f(phase);
        self.save_current()
    }

    /// Stamp the end time, write the final record and return it.
    pub fn finish_session(&mut self) -> Result<SessionAudit> {
        let session = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No current session to finish"))?;
        session.finish();
        self.save_current()?;
        self.current
            .take()
            .ok_or_else(|| anyhow::anyhow!("No current session to finish"))
    }

    pub fn save_current(&self) -> Result<()> {
        if let Some(ref session) = self.current {
            let json = serde_json::to_string_pretty(session)
                .context("Failed to serialize session audit")?;
            fs::write(&self.session_file, json).with_context(|| {
                format!("Failed to write {}", self.session_file.display())
            })?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<&SessionAudit> {
        self.current.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.session_file
    }

    /// Read a `session.json` written by a previous session.
    #[cfg(test)]
    pub(crate) fn load(path: &Path) -> Result<SessionAudit> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{PhaseOutcome, StepSource};
    use crate::phase::{PhaseKind, SurfaceRole};
    use tempfile::TempDir;

    fn setup_logger() -> (AuditLogger, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let logger = AuditLogger::new(dir.path());
        (logger, dir)
    }

    fn make_config() -> SessionConfig {
        SessionConfig {
            planning_label: "gemini".to_string(),
            planning_url: "https://gemini.google.com/app".to_string(),
            executing_label: "chatgpt".to_string(),
            executing_url: "https://chatgpt.com/".to_string(),
            max_attempts: 3,
            response_timeout_secs: 120,
        }
    }

    fn intro() -> PhaseAudit {
        PhaseAudit::new("01-intro", PhaseKind::Intro, SurfaceRole::Planning)
    }

    #[test]
    fn test_add_phase_without_active_session_returns_err() {
        let (mut logger, _dir) = setup_logger();
        assert!(logger.add_phase(intro()).is_err());
    }

    #[test]
    fn test_update_last_phase_with_no_phases_returns_err() {
        let (mut logger, _dir) = setup_logger();
        logger.start_session(make_config()).unwrap();
        let result = logger.update_last_phase(|p| p.attempts = 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_steps_without_active_session_returns_err() {
        let (mut logger, _dir) = setup_logger();
        let result = logger.record_steps(StepResolution {
            total_steps: 4,
            loop_count: 2,
            source: StepSource::Extracted,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_start_session_writes_file() {
        let (mut logger, dir) = setup_logger();
        logger.start_session(make_config()).unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_updates_are_persisted_to_disk() {
        let (mut logger, dir) = setup_logger();
        logger.start_session(make_config()).unwrap();
        logger.add_phase(intro()).unwrap();
        logger
            .update_last_phase(|p| p.finish(PhaseOutcome::Manual, 42, true))
            .unwrap();
        logger
            .record_steps(StepResolution {
                total_steps: 4,
                loop_count: 2,
                source: StepSource::Operator,
            })
            .unwrap();

        let on_disk = AuditLogger::load(&dir.path().join(SESSION_FILE)).unwrap();
        assert_eq!(on_disk.phases.len(), 1);
        assert_eq!(on_disk.phases[0].outcome, PhaseOutcome::Manual);
        assert_eq!(on_disk.phases[0].response_chars, 42);
        assert_eq!(on_disk.steps.map(|s| s.source), Some(StepSource::Operator));
    }

    #[test]
    fn test_finish_session_sets_ended_at() {
        let (mut logger, dir) = setup_logger();
        logger.start_session(make_config()).unwrap();
        logger.add_phase(intro()).unwrap();
        let finished = logger.finish_session().unwrap();
        assert!(finished.ended_at.is_some());
        assert!(logger.current().is_none());

        let content = std::fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let session_id = value["session_id"].as_str().expect("session_id is a string");
        assert_eq!(session_id.len(), 36);
        assert!(!value["ended_at"].is_null());
        assert_eq!(value["phases"].as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_finish_without_session_returns_err() {
        let (mut logger, _dir) = setup_logger();
        assert!(logger.finish_session().is_err());
    }
}
