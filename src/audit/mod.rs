use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::{PhaseKind, ResultSource, SurfaceRole};

/// Machine-readable record of one ghost-writing session (`session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAudit {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub config: SessionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<StepResolution>,
    pub phases: Vec<PhaseAudit>,
}

impl SessionAudit {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            config,
            steps: None,
            phases: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Phases whose output reached the transcript, in execution order.
    pub fn persisted_phases(&self) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| p.persisted)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Number of phases that needed the operator to supply the result.
    pub fn manual_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| matches!(p.outcome, PhaseOutcome::Manual | PhaseOutcome::Skipped))
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub planning_label: String,
    pub planning_url: String,
    pub executing_label: String,
    pub executing_url: String,
    pub max_attempts: u32,
    pub response_timeout_secs: u64,
}

/// Where the total step count came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// `--steps` on the command line
    Override,
    /// Parsed from the intro response
    Extracted,
    /// Typed by the operator
    Operator,
    /// `session.default_total_steps`
    Default,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepResolution {
    pub total_steps: u32,
    pub loop_count: u32,
    pub source: StepSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseAudit {
    pub name: String,
    #[serde(flatten)]
    pub kind: PhaseKind,
    pub target: SurfaceRole,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Dispatch attempts made by the retry controller (1 for planning phases)
    pub attempts: u32,
    pub outcome: PhaseOutcome,
    pub response_chars: usize,
    pub persisted: bool,
}

impl PhaseAudit {
    pub fn new(name: &str, kind: PhaseKind, target: SurfaceRole) -> Self {
        Self {
            name: name.to_string(),
            kind,
            target,
            started_at: Utc::now(),
            ended_at: None,
            attempts: 0,
            outcome: PhaseOutcome::InProgress,
            response_chars: 0,
            persisted: false,
        }
    }

    pub fn finish(&mut self, outcome: PhaseOutcome, response_chars: usize, persisted: bool) {
        self.ended_at = Some(Utc::now());
        self.outcome = outcome;
        self.response_chars = response_chars;
        self.persisted = persisted;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseOutcome {
    InProgress,
    /// Scraped on the first attempt
    Automated,
    /// Scraped after `attempts` dispatches
    Retried { attempts: u32 },
    /// Operator pasted the result
    Manual,
    /// Operator skipped; the phase produced nothing
    Skipped,
}

impl PhaseOutcome {
    /// Outcome for a result obtained after `attempts` dispatches.
    pub fn from_result(source: ResultSource, attempts: u32) -> Self {
        match source {
            ResultSource::Scraped if attempts <= 1 => PhaseOutcome::Automated,
            ResultSource::Scraped => PhaseOutcome::Retried { attempts },
            ResultSource::Manual => PhaseOutcome::Manual,
            ResultSource::Skipped => PhaseOutcome::Skipped,
        }
    }
}

pub mod logger;
pub use logger::AuditLogger;
