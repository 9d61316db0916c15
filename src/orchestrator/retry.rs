//! Bounded retry around "extract a directive, then run it on the executing surface".

use std::future::Future;
use std::time::Duration;

use crate::flow_config::RetrySection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause after a dispatch error or an empty result
    pub dispatch_backoff: Duration,
    /// Pause before re-running extraction
    pub extraction_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_section(section: &RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            dispatch_backoff: Duration::from_secs(section.dispatch_backoff_secs),
            extraction_backoff: Duration::from_secs(section.extraction_backoff_secs),
        }
    }

    /// Same budget, no pauses.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            dispatch_backoff: Duration::ZERO,
            extraction_backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_section(&RetrySection::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A dispatch produced a non-empty result.
    Resolved {
        directive: String,
        text: String,
        attempts: u32,
    },
    /// Budget exhausted. `directive` is the last one extracted, if any.
    Unresolved {
        directive: Option<String>,
        attempts: u32,
    },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Resolved { attempts, .. } | RetryOutcome::Unresolved { attempts, .. } => {
                *attempts
            }
        }
    }
}

pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run up to `max_attempts` attempts.
    ///
    /// Each attempt either dispatches the current directive or, when none was
    /// extracted, re-runs `extract`. `dispatch` receives the directive and the
    /// 1-based attempt number. Pauses only happen when another attempt follows.
    pub async fn run<E, D, Fut>(&self, mut extract: E, mut dispatch: D) -> RetryOutcome
    where
        E: FnMut() -> Option<String>,
        D: FnMut(String, u32) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let max = self.policy.max_attempts;
        let mut directive = extract();

        for attempt in 1..=max {
            let has_next = attempt < max;

            let Some(current) = directive.clone() else {
                tracing::warn!(attempt, max, "No directive extracted");
                if has_next {
                    tokio::time::sleep(self.policy.extraction_backoff).await;
                    directive = extract();
                }
                continue;
            };

            tracing::info!(attempt, max, "Dispatching extracted directive");
            match dispatch(current.clone(), attempt).await {
                Ok(text) if !text.trim().is_empty() => {
                    return RetryOutcome::Resolved {
                        directive: current,
                        text,
                        attempts: attempt,
                    };
                }
                Ok(_) => {
                    tracing::warn!(attempt, max, "Dispatch produced an empty result");
                }
                Err(e) => {
                    tracing::warn!(attempt, max, error = %e, "Dispatch failed");
                }
            }
            if has_next {
                tokio::time::sleep(self.policy.dispatch_backoff).await;
            }
        }

        tracing::warn!(max, "Retry budget exhausted, falling back to manual entry");
        RetryOutcome::Unresolved {
            directive,
            attempts: max,
        }
    }
}
