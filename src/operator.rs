//! Operator I/O: the human suspension points of a session.
//!
//! Every blocking interaction with the operator goes through [`Operator`], so
//! the orchestrator can run against a [`ScriptedOperator`] in tests.

use anyhow::{Context, Result};
use console::{Term, style};
use dialoguer::Input;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Line that terminates a multi-line paste.
pub const END_OF_TEXT: &str = ".";

pub trait Operator: Send + Sync {
    /// Block until the operator acknowledges `message`.
    fn confirm(&self, message: &str) -> Result<()>;

    /// Read a single line. May be empty.
    fn ask_line(&self, prompt: &str) -> Result<String>;

    /// Read a multi-line paste terminated by a lone `.` line. An empty first
    /// line means skip and yields an empty string.
    fn ask_text(&self, prompt: &str) -> Result<String>;
}

/// Interactive terminal operator.
pub struct TerminalOperator {
    term: Term,
}

impl TerminalOperator {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for TerminalOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for TerminalOperator {
    fn confirm(&self, message: &str) -> Result<()> {
        let _: String = Input::new()
            .with_prompt(format!("{} {}", message, style("[Enter]").dim()))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read confirmation")?;
        Ok(())
    }

    fn ask_line(&self, prompt: &str) -> Result<String> {
        Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read operator input")
    }

    fn ask_text(&self, prompt: &str) -> Result<String> {
        self.term
            .write_line(&format!(
                "{} {}",
                prompt,
                style(format!(
                    "(finish with a line containing only '{}', empty line to skip)",
                    END_OF_TEXT
                ))
                .dim()
            ))
            .context("Failed to write to terminal")?;

        let mut lines = Vec::new();
        loop {
            let line = self
                .term
                .read_line()
                .context("Failed to read pasted text")?;
            if lines.is_empty() && line.trim().is_empty() {
                break;
            }
            if line.trim() == END_OF_TEXT {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

/// One recorded operator interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Confirm(String),
    Line(String),
    Text(String),
}

/// Replays queued answers. `ask_line` and `ask_text` pop from the same queue
/// and return an empty string once it runs dry; `confirm` never consumes.
#[derive(Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<String>>,
    log: Mutex<Vec<Interaction>>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Interactions so far, in order.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn confirm_count(&self) -> usize {
        self.interactions()
            .iter()
            .filter(|i| matches!(i, Interaction::Confirm(_)))
            .count()
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn next_answer(&self) -> String {
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or_default()
    }

    fn push_log(&self, interaction: Interaction) {
        if let Ok(mut log) = self.log.lock() {
            log.push(interaction);
        }
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&self, message: &str) -> Result<()> {
        self.push_log(Interaction::Confirm(message.to_string()));
        Ok(())
    }

    fn ask_line(&self, prompt: &str) -> Result<String> {
        self.push_log(Interaction::Line(prompt.to_string()));
        Ok(self.next_answer())
    }

    fn ask_text(&self, prompt: &str) -> Result<String> {
        self.push_log(Interaction::Text(prompt.to_string()));
        Ok(self.next_answer())
    }
}
