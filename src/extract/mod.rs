//! Response extraction from free-form planning output.
//!
//! Two pure operations feed the orchestrator:
//! - [`ResponseExtractor::extract_step_count`] reads how many steps the planning
//!   surface announced (`全部で4個のステップ`, `all together 4 steps`) or, failing
//!   that, the highest `ステップN` / `step N` it mentions.
//! - [`ResponseExtractor::extract_directive`] pulls the prompt that should be sent
//!   to the executing surface, trying an ordered list of [`DirectiveStrategy`]s.
//!
//! Markers and step patterns are configurable through `[extraction]`.

pub mod strategy;

pub use strategy::{DirectiveStrategy, FencedBlock, StructuredSection};

use anyhow::Result;
use regex::Regex;

use crate::errors::ConfigError;
use crate::flow_config::ExtractionSection;

/// Ordered set of directive strategies plus the step-count patterns.
pub struct ResponseExtractor {
    strategies: Vec<Box<dyn DirectiveStrategy>>,
    total_steps: Regex,
    step_number: Regex,
}

impl ResponseExtractor {
    /// Build an extractor from the `[extraction]` configuration section.
    pub fn from_config(section: &ExtractionSection) -> Result<Self, ConfigError> {
        let total_steps = compile("extraction.total_steps_pattern", &section.total_steps_pattern)?;
        let step_number = compile("extraction.step_pattern", &section.step_pattern)?;

        let strategies: Vec<Box<dyn DirectiveStrategy>> = vec![
            Box::new(StructuredSection::new(
                &section.prompt_markers,
                &section.example_markers,
            )),
            Box::new(FencedBlock),
        ];

        Ok(Self {
            strategies,
            total_steps,
            step_number,
        })
    }

    /// Total number of steps announced in `text`.
    ///
    /// An explicit total declaration wins over any step numbering. Otherwise the
    /// maximum step number found is returned (not the count of mentions).
    pub fn extract_step_count(&self, text: &str) -> Option<u32> {
        if let Some(total) = self
            .total_steps
            .captures(text)
            .and_then(|cap| first_group(&cap))
            .and_then(parse_number)
        {
            return Some(total);
        }

        self.step_number
            .captures_iter(text)
            .filter_map(|cap| first_group(&cap).and_then(parse_number))
            .max()
    }

    /// The directive to deliver to the executing surface, if any strategy matches.
    pub fn extract_directive(&self, text: &str) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(directive) = strategy.extract(text) {
                tracing::debug!(
                    strategy = strategy.name(),
                    chars = directive.chars().count(),
                    "directive extracted"
                );
                return Some(directive);
            }
        }
        tracing::debug!("no extraction strategy matched");
        None
    }

    /// Names of the configured strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionSection::default())
            .expect("default extraction patterns are valid")
    }
}

fn compile(key: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// First participating capture group; patterns may use alternation with one
/// group per branch.
fn first_group<'t>(cap: &regex::Captures<'t>) -> Option<&'t str> {
    cap.iter().skip(1).flatten().next().map(|m| m.as_str())
}

/// Parse ASCII or full-width digits.
fn parse_number(raw: &str) -> Option<u32> {
    let normalized: String = raw
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect();
    normalized.parse().ok()
}
