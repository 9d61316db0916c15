use std::path::PathBuf;
use std::time::Duration;

use crate::artifacts::ArtifactStore;
use crate::audit::PhaseOutcome;
use crate::clipboard::Clipboard;
use crate::errors::SurfaceError;
use crate::extract::ResponseExtractor;
use crate::flow_config::TranscriptSection;
use crate::operator::Operator;
use crate::orchestrator::journal::{Journal, PhaseState};
use crate::orchestrator::retry::{RetryController, RetryOutcome};
use crate::phase::{Phase, PhaseKind, PhaseResult, ResultSource, SurfaceRole};
use crate::surface::Surfaces;
use crate::ui::FlowUI;

/// What running one phase produced.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub result: PhaseResult,
    pub attempts: u32,
    pub outcome: PhaseOutcome,
    pub persisted: bool,
}

/// Runs single phases against the surfaces.
///
/// Every method resolves: failures degrade to operator entry and, at worst,
/// to an empty result. The runner is the only writer of session artifacts.
pub struct PhaseRunner<'a> {
    surfaces: &'a Surfaces,
    operator: &'a dyn Operator,
    store: &'a ArtifactStore,
    journal: &'a Journal,
    ui: &'a FlowUI,
    extractor: &'a ResponseExtractor,
    retry: RetryController,
    transcript: TranscriptSection,
    response_timeout: Duration,
    clipboard: Option<&'a dyn Clipboard>,
}

impl<'a> PhaseRunner<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surfaces: &'a Surfaces,
        operator: &'a dyn Operator,
        store: &'a ArtifactStore,
        journal: &'a Journal,
        ui: &'a FlowUI,
        extractor: &'a ResponseExtractor,
        retry: RetryController,
        transcript: TranscriptSection,
        response_timeout: Duration,
    ) -> Self {
        Self {
            surfaces,
            operator,
            store,
            journal,
            ui,
            extractor,
            retry,
            transcript,
            response_timeout,
            clipboard: None,
        }
    }

    /// Copy every dispatched prompt to `clipboard` so a manual paste is one keystroke.
    pub fn with_clipboard(mut self, clipboard: &'a dyn Clipboard) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn transcript(&self) -> &TranscriptSection {
        &self.transcript
    }

    pub fn set_total_phases(&self, total: u32) {
        self.ui.set_total_phases(u64::from(total));
    }

    /// Run a planning-surface phase: one dispatch, then operator entry on a miss.
    pub async fn run_plan(&self, phase: Phase) -> PhaseReport {
        self.ui.print_phase_header(
            &phase.name,
            &phase.kind.description(),
            self.surfaces.label(phase.target),
        );

        let scraped = match self.attempt(&phase, 1).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(phase = %phase.name, error = %e, "Phase attempt failed");
                None
            }
        };

        let report = match scraped {
            Some(text) => {
                self.mark(&phase.name, 1, PhaseState::Succeeded);
                let persisted = self.persist(&phase, &text, true).await;
                PhaseReport {
                    result: PhaseResult::scraped(&phase.name, text),
                    attempts: 1,
                    outcome: PhaseOutcome::Automated,
                    persisted,
                    phase,
                }
            }
            None => {
                self.mark(&phase.name, 1, PhaseState::ManualFallback);
                let result = self.manual_entry(&phase).await;
                let persisted = self.persist_manual(&phase, &result).await;
                PhaseReport {
                    outcome: PhaseOutcome::from_result(result.source, 1),
                    result,
                    attempts: 1,
                    persisted,
                    phase,
                }
            }
        };

        self.finish(report)
    }

    /// Run an executing-surface phase: extract the directive from `plan`,
    /// dispatch it under the retry budget, then fall back to the operator.
    pub async fn run_execution(&self, kind: PhaseKind, plan: &PhaseResult) -> PhaseReport {
        let name = kind.name();
        let max = self.retry.policy().max_attempts;
        self.ui.print_phase_header(
            &name,
            &kind.description(),
            self.surfaces.label(SurfaceRole::Executing),
        );

        let outcome = self
            .retry
            .run(
                || self.extractor.extract_directive(&plan.text),
                |directive, attempt| {
                    let phase = Phase::new(kind, directive, &self.transcript);
                    async move {
                        let result = self.attempt(&phase, attempt).await;
                        let succeeded = matches!(&result, Ok(Some(_)));
                        if !succeeded && attempt < max {
                            self.mark(&phase.name, attempt, PhaseState::Retrying);
                            self.ui.retrying(attempt, max, "no usable response");
                        }
                        result.map(Option::unwrap_or_default)
                    }
                },
            )
            .await;

        let report = match outcome {
            RetryOutcome::Resolved {
                directive,
                text,
                attempts,
            } => {
                let phase = Phase::new(kind, directive, &self.transcript);
                self.mark(&phase.name, attempts, PhaseState::Succeeded);
                let persisted = self.persist(&phase, &text, true).await;
                PhaseReport {
                    result: PhaseResult::scraped(&phase.name, text),
                    outcome: PhaseOutcome::from_result(ResultSource::Scraped, attempts),
                    attempts,
                    persisted,
                    phase,
                }
            }
            RetryOutcome::Unresolved {
                directive,
                attempts,
            } => {
                let phase = Phase::new(kind, directive.unwrap_or_default(), &self.transcript);
                self.manual_fallback(phase, attempts).await
            }
        };

        self.finish(report)
    }

    /// Deliver, wait for the operator, scrape. `Ok(None)` is a miss.
    async fn attempt(&self, phase: &Phase, attempt: u32) -> anyhow::Result<Option<String>> {
        let surface = self.surfaces.get(phase.target);
        self.mark(&phase.name, attempt, PhaseState::Dispatching);

        let prompt_file = self.save_prompt(phase);
        let copied = self.copy_prompt(phase);
        if let Err(e) = surface.focus().await {
            tracing::debug!(surface = surface.label(), error = %e, "focus failed");
        }
        match surface.deliver(&phase.prompt).await {
            Ok(()) => {
                tracing::info!(phase = %phase.name, surface = surface.label(), "Prompt delivered");
                self.ui.log_step(&format!("prompt delivered to {}", surface.label()));
            }
            Err(e) => {
                tracing::warn!(phase = %phase.name, error = %e, "Automated input failed");
                self.ui.warn(&e.to_string());
                self.ui
                    .manual_paste(surface.label(), prompt_file.as_deref(), &phase.prompt);
                if copied {
                    self.ui.prompt_copied();
                }
            }
        }

        self.mark(&phase.name, attempt, PhaseState::AwaitingHumanConfirm);
        self.ui.action_required(&format!(
            "press send in {}, then continue here once the answer is complete",
            surface.label()
        ));
        self.operator.confirm("Response complete?")?;

        self.mark(&phase.name, attempt, PhaseState::Extracting);
        Ok(self.scrape(phase.target).await)
    }

    /// Operator steps after the retry budget ran out, then one final scrape.
    async fn manual_fallback(&self, phase: Phase, attempts: u32) -> PhaseReport {
        self.mark(&phase.name, attempts, PhaseState::ManualFallback);

        let (prompt_file, copied) = if phase.prompt.trim().is_empty() {
            (None, false)
        } else {
            (self.save_prompt(&phase), self.copy_prompt(&phase))
        };
        self.ui.manual_fallback(
            self.surfaces.label(SurfaceRole::Planning),
            self.surfaces.label(SurfaceRole::Executing),
            &phase.kind.description(),
            prompt_file.as_deref(),
        );
        if copied {
            self.ui.prompt_copied();
        }
        if let Err(e) = self.operator.confirm(&format!(
            "Has {} answered?",
            self.surfaces.label(SurfaceRole::Executing)
        )) {
            tracing::warn!(error = %e, "Operator confirmation failed");
        }

        if let Some(text) = self.scrape(phase.target).await {
            let persisted = self.persist(&phase, &text, true).await;
            return PhaseReport {
                result: PhaseResult::scraped(&phase.name, text),
                attempts,
                outcome: PhaseOutcome::Manual,
                persisted,
                phase,
            };
        }

        let result = self.manual_entry(&phase).await;
        let persisted = self.persist_manual(&phase, &result).await;
        PhaseReport {
            outcome: PhaseOutcome::from_result(result.source, attempts),
            result,
            attempts,
            persisted,
            phase,
        }
    }

    async fn manual_entry(&self, phase: &Phase) -> PhaseResult {
        self.ui.warn(&format!(
            "Could not read the response from {}.",
            self.surfaces.label(phase.target)
        ));
        let text = self
            .operator
            .ask_text("Paste the response text")
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Operator entry failed, skipping phase");
                String::new()
            });
        let result = PhaseResult::manual(&phase.name, text);
        if result.source == ResultSource::Skipped {
            tracing::info!(phase = %phase.name, "Operator skipped the phase");
        }
        result
    }

    async fn scrape(&self, role: SurfaceRole) -> Option<String> {
        let surface = self.surfaces.get(role);
        match surface.latest_response(self.response_timeout).await {
            Ok(Some(response)) if !response.is_empty() => Some(response.text),
            Ok(_) => {
                let timeout = SurfaceError::ResponseTimeout {
                    surface: surface.label().to_string(),
                    secs: self.response_timeout.as_secs(),
                };
                tracing::warn!(error = %timeout, "No response scraped");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Response scrape failed");
                None
            }
        }
    }

    /// Save the raw response and screenshot, then append to the transcript
    /// when the phase is persisted. Returns whether the transcript grew.
    async fn persist(&self, phase: &Phase, text: &str, screenshot: bool) -> bool {
        if let Err(e) = self.store.save_response(phase.target, &phase.name, text) {
            tracing::warn!(phase = %phase.name, error = %e, "Failed to save response");
        }

        if screenshot {
            let path = self.store.screenshot_path(&phase.name);
            if let Err(e) = self
                .surfaces
                .get(phase.target)
                .capture_screenshot(&path)
                .await
            {
                tracing::debug!(phase = %phase.name, error = %e, "Screenshot skipped");
            }
        }

        if !phase.persist {
            return false;
        }
        match self.store.append_transcript(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(phase = %phase.name, error = %e, "Failed to append transcript");
                false
            }
        }
    }

    async fn persist_manual(&self, phase: &Phase, result: &PhaseResult) -> bool {
        if result.is_empty() {
            return false;
        }
        self.persist(phase, &result.text, false).await
    }

    fn save_prompt(&self, phase: &Phase) -> Option<PathBuf> {
        match self.store.save_prompt(&phase.name, &phase.prompt) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(phase = %phase.name, error = %e, "Failed to save prompt");
                None
            }
        }
    }

    fn copy_prompt(&self, phase: &Phase) -> bool {
        let Some(clipboard) = self.clipboard else {
            return false;
        };
        match clipboard.copy(&phase.prompt) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(phase = %phase.name, error = %e, "Prompt not copied");
                false
            }
        }
    }

    fn finish(&self, report: PhaseReport) -> PhaseReport {
        self.mark(&report.phase.name, report.attempts, PhaseState::Resolved);
        tracing::info!(
            phase = %report.phase.name,
            attempts = report.attempts,
            outcome = ?report.outcome,
            persisted = report.persisted,
            "Phase resolved"
        );
        self.ui.phase_complete(&report.phase.name, &report.outcome);
        report
    }

    fn mark(&self, phase: &str, attempt: u32, state: PhaseState) {
        tracing::debug!(phase, attempt, state = %state, "phase state");
        if let Err(e) = self.journal.record(phase, attempt, state) {
            tracing::warn!(error = %e, "Failed to write journal entry");
        }
    }
}
