//! Phase definitions for the ghost-writing flow.
//!
//! This module provides:
//! - `PhaseKind`: the fixed topology of a session
//! - `Phase`: one immutable orchestration step, built right before it runs
//! - `PhaseResult`: the text a phase produced, and how it was obtained
//! - Template rendering for the `{placeholder}` prompt syntax

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flow_config::{PLACEHOLDER_REGEX, TranscriptSection};

/// Which AI surface a phase talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    /// Writes the article prose and the next directive
    Planning,
    /// Runs directives and produces the results quoted in the article
    Executing,
}

impl fmt::Display for SurfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceRole::Planning => write!(f, "planning"),
            SurfaceRole::Executing => write!(f, "executing"),
        }
    }
}

/// The six phase kinds of a session, with loop phases carrying their step number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseKind {
    FormatPriming,
    Intro,
    FirstExecution,
    LoopPlan { step: u32 },
    LoopExecution { step: u32 },
    ClosingPlan,
    ClosingExecution,
    Summary,
}

impl PhaseKind {
    /// Unique, file-system safe phase name (e.g. `03-step2-exec`).
    pub fn name(&self) -> String {
        match self {
            PhaseKind::FormatPriming => "00-format".to_string(),
            PhaseKind::Intro => "01-intro".to_string(),
            PhaseKind::FirstExecution => "02-step1-exec".to_string(),
            PhaseKind::LoopPlan { step } => format!("03-step{}-plan", step),
            PhaseKind::LoopExecution { step } => format!("03-step{}-exec", step),
            PhaseKind::ClosingPlan => "04-last-plan".to_string(),
            PhaseKind::ClosingExecution => "05-last-exec".to_string(),
            PhaseKind::Summary => "06-summary".to_string(),
        }
    }

    /// Human-readable description for the terminal.
    pub fn description(&self) -> String {
        match self {
            PhaseKind::FormatPriming => "Prime the article format".to_string(),
            PhaseKind::Intro => "Introduction and step 1 plan".to_string(),
            PhaseKind::FirstExecution => "Execute step 1".to_string(),
            PhaseKind::LoopPlan { step } => format!("Plan step {}", step),
            PhaseKind::LoopExecution { step } => format!("Execute step {}", step),
            PhaseKind::ClosingPlan => "Plan the last step".to_string(),
            PhaseKind::ClosingExecution => "Execute the last step".to_string(),
            PhaseKind::Summary => "Closing summary".to_string(),
        }
    }

    /// Surface that receives this phase's prompt.
    pub fn target(&self) -> SurfaceRole {
        match self {
            PhaseKind::FirstExecution
            | PhaseKind::LoopExecution { .. }
            | PhaseKind::ClosingExecution => SurfaceRole::Executing,
            _ => SurfaceRole::Planning,
        }
    }

    /// Surface whose output fed this phase's prompt; `None` for operator-seeded phases.
    pub fn source(&self) -> Option<SurfaceRole> {
        match self {
            PhaseKind::FormatPriming | PhaseKind::Intro => None,
            PhaseKind::FirstExecution
            | PhaseKind::LoopExecution { .. }
            | PhaseKind::ClosingExecution => Some(SurfaceRole::Planning),
            PhaseKind::LoopPlan { .. } | PhaseKind::ClosingPlan | PhaseKind::Summary => {
                Some(SurfaceRole::Executing)
            }
        }
    }

    /// Whether this phase's output is appended to the transcript.
    pub fn persisted(&self, transcript: &TranscriptSection) -> bool {
        match self {
            PhaseKind::FormatPriming => false,
            PhaseKind::LoopPlan { .. } => transcript.persist_loop_plans,
            PhaseKind::ClosingPlan => transcript.persist_closing_plan,
            _ => true,
        }
    }

    /// Execution phases deliver an extracted directive and run under the retry controller.
    pub fn is_execution(&self) -> bool {
        self.target() == SurfaceRole::Executing
    }
}

/// One orchestration step. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub name: String,
    pub source: Option<SurfaceRole>,
    pub target: SurfaceRole,
    /// Prompt text with all placeholders already substituted
    pub prompt: String,
    /// Whether the output is appended to the transcript
    pub persist: bool,
}

impl Phase {
    /// Build a phase of `kind` with its default routing and persistence flag.
    pub fn new(kind: PhaseKind, prompt: impl Into<String>, transcript: &TranscriptSection) -> Self {
        Self {
            kind,
            name: kind.name(),
            source: kind.source(),
            target: kind.target(),
            prompt: prompt.into(),
            persist: kind.persisted(transcript),
        }
    }
}

/// How a phase's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// Scraped from the target surface
    Scraped,
    /// Typed or pasted by the operator
    Manual,
    /// Nothing was obtained; the operator chose to skip
    Skipped,
}

/// Text produced by the target surface for one phase. Never mutated, only superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseResult {
    pub phase: String,
    pub text: String,
    pub source: ResultSource,
}

impl PhaseResult {
    pub fn scraped(phase: &str, text: impl Into<String>) -> Self {
        Self {
            phase: phase.to_string(),
            text: text.into(),
            source: ResultSource::Scraped,
        }
    }

    /// Operator entry; an empty entry is a deliberate skip.
    pub fn manual(phase: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let source = if text.trim().is_empty() {
            ResultSource::Skipped
        } else {
            ResultSource::Manual
        };
        Self {
            phase: phase.to_string(),
            text,
            source,
        }
    }

    pub fn skipped(phase: &str) -> Self {
        Self {
            phase: phase.to_string(),
            text: String::new(),
            source: ResultSource::Skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The text as `{previous_response}` context, or `note` when empty.
    pub fn as_context<'a>(&'a self, note: &'a str) -> &'a str {
        if self.is_empty() { note } else { &self.text }
    }
}

/// Substitute `{name}` placeholders verbatim in a single pass, so substituted
/// values are never re-expanded. Unknown placeholders are left untouched.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| cap[0].to_string())
        })
        .into_owned()
}
