//! Top-level sequencing of a ghost-writing session.
//!
//! ```text
//! 00-format ─▶ 01-intro ─▶ 02-step1-exec ─▶ [03-stepN-plan ─▶ 03-stepN-exec] × loop_count
//!           ─▶ 04-last-plan ─▶ 05-last-exec ─▶ 06-summary
//! ```
//!
//! The latest executing-surface result is threaded from phase to phase as an
//! explicit value; nothing else reads or writes it.

use anyhow::Result;
use std::path::PathBuf;

use crate::audit::{
    AuditLogger, PhaseAudit, PhaseOutcome, SessionAudit, SessionConfig, StepResolution, StepSource,
};
use crate::config::PromptTemplates;
use crate::extract::ResponseExtractor;
use crate::operator::Operator;
use crate::orchestrator::runner::{PhaseReport, PhaseRunner};
use crate::phase::{Phase, PhaseKind, PhaseResult, render_template};

/// Number of loop iterations between the first and the last step.
pub fn loop_count(total_steps: u32) -> u32 {
    total_steps.saturating_sub(2)
}

/// Total number of phases a session with `total_steps` runs.
pub fn phase_count(total_steps: u32) -> u32 {
    // format, intro, first exec, closing plan, closing exec, summary
    6 + 2 * loop_count(total_steps)
}

/// Operator-supplied values for one session.
#[derive(Debug, Clone, Default)]
pub struct FlowInput {
    pub problem_settings: String,
    pub solution_hints: String,
    /// Skips extraction and the operator question when set
    pub steps_override: Option<u32>,
}

/// Session-level settings the orchestrator needs beyond the runner.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub missing_response_note: String,
    pub default_total_steps: u32,
}

#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub session_dir: PathBuf,
    pub transcript: PathBuf,
    pub steps: StepResolution,
    pub transcript_entries: usize,
    pub manual_phases: usize,
    /// `session.json` inside the session folder
    pub audit_file: PathBuf,
    pub audit: Option<SessionAudit>,
}

pub struct FlowOrchestrator<'a> {
    runner: PhaseRunner<'a>,
    extractor: &'a ResponseExtractor,
    operator: &'a dyn Operator,
    templates: &'a PromptTemplates,
    settings: FlowSettings,
    audit: AuditLogger,
    session_dir: PathBuf,
    transcript: PathBuf,
    reports: Vec<PhaseReport>,
}

impl<'a> FlowOrchestrator<'a> {
    pub fn new(
        runner: PhaseRunner<'a>,
        extractor: &'a ResponseExtractor,
        operator: &'a dyn Operator,
        templates: &'a PromptTemplates,
        settings: FlowSettings,
        session_dir: PathBuf,
        transcript: PathBuf,
    ) -> Self {
        Self {
            runner,
            extractor,
            operator,
            templates,
            settings,
            audit: AuditLogger::new(&session_dir),
            session_dir,
            transcript,
            reports: Vec::new(),
        }
    }

    /// Run every phase in order. Only audit finalization can fail; phase
    /// failures degrade to operator input or empty results.
    pub async fn run(&mut self, input: &FlowInput, session: SessionConfig) -> Result<FlowSummary> {
        if let Err(e) = self.audit.start_session(session) {
            tracing::warn!(error = %e, "Failed to start session audit");
        }
        tracing::info!(dir = %self.session_dir.display(), "Session started");

        let values = |previous: &str| -> Vec<(&'static str, String)> {
            vec![
                ("problem_settings", input.problem_settings.clone()),
                ("solution_hints", input.solution_hints.clone()),
                ("previous_response", previous.to_string()),
            ]
        };

        // 1. format priming
        let prompt = self.render(&self.templates.format, &values(""));
        self.plan(PhaseKind::FormatPriming, prompt).await;

        // 2. intro and the first directive
        let prompt = self.render(&self.templates.intro, &values(""));
        let intro = self.plan(PhaseKind::Intro, prompt).await;

        // 3. first execution
        let mut previous = self.execute(PhaseKind::FirstExecution, &intro).await;

        // 4. step count
        let steps = self.resolve_steps(&intro, input.steps_override);
        self.runner.set_total_phases(phase_count(steps.total_steps));
        if let Err(e) = self.audit.record_steps(steps) {
            tracing::warn!(error = %e, "Failed to record step count");
        }

        // 5. loop
        for i in 0..steps.loop_count {
            let step = i + 2;
            let context = previous.as_context(&self.settings.missing_response_note).to_string();
            let prompt = self.render(&self.templates.loop_plan, &values(&context));
            let plan = self.plan(PhaseKind::LoopPlan { step }, prompt).await;
            previous = self.execute(PhaseKind::LoopExecution { step }, &plan).await;
        }

        // 6. closing plan and execution
        let context = previous.as_context(&self.settings.missing_response_note).to_string();
        let prompt = self.render(&self.templates.closing_plan, &values(&context));
        let closing = self.plan(PhaseKind::ClosingPlan, prompt).await;
        let last = self.execute(PhaseKind::ClosingExecution, &closing).await;

        // 7. summary
        let context = last.as_context(&self.settings.missing_response_note).to_string();
        let prompt = self.render(&self.templates.summary, &values(&context));
        self.plan(PhaseKind::Summary, prompt).await;

        let audit = match self.audit.finish_session() {
            Ok(audit) => Some(audit),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to finalize session audit");
                None
            }
        };

        let summary = FlowSummary {
            session_dir: self.session_dir.clone(),
            transcript: self.transcript.clone(),
            steps,
            transcript_entries: self.reports.iter().filter(|r| r.persisted).count(),
            manual_phases: self
                .reports
                .iter()
                .filter(|r| {
                    !matches!(
                        r.outcome,
                        PhaseOutcome::Automated | PhaseOutcome::Retried { .. }
                    )
                })
                .count(),
            audit_file: self.audit.path().to_path_buf(),
            audit,
        };
        tracing::info!(
            entries = summary.transcript_entries,
            manual = summary.manual_phases,
            "Flow complete"
        );
        Ok(summary)
    }

    /// Reports of the phases run so far, in execution order.
    pub fn reports(&self) -> &[PhaseReport] {
        &self.reports
    }

    fn render(&self, template: &str, values: &[(&'static str, String)]) -> String {
        let pairs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
        render_template(template, &pairs)
    }

    async fn plan(&mut self, kind: PhaseKind, prompt: String) -> PhaseResult {
        let phase = Phase::new(kind, prompt, self.runner.transcript());
        self.begin_audit(kind);
        let report = self.runner.run_plan(phase).await;
        self.end_audit(report)
    }

    async fn execute(&mut self, kind: PhaseKind, plan: &PhaseResult) -> PhaseResult {
        self.begin_audit(kind);
        let report = self.runner.run_execution(kind, plan).await;
        self.end_audit(report)
    }

    fn begin_audit(&mut self, kind: PhaseKind) {
        let record = PhaseAudit::new(&kind.name(), kind, kind.target());
        if let Err(e) = self.audit.add_phase(record) {
            tracing::warn!(error = %e, "Failed to add phase to audit");
        }
    }

    fn end_audit(&mut self, report: PhaseReport) -> PhaseResult {
        let chars = report.result.text.chars().count();
        let result = self.audit.update_last_phase(|p| {
            p.attempts = report.attempts;
            p.finish(report.outcome.clone(), chars, report.persisted);
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to update phase audit");
        }
        let phase_result = report.result.clone();
        self.reports.push(report);
        phase_result
    }

    /// Explicit override, then extraction from the intro, then the operator,
    /// then the configured default. An extracted 0 counts as absent.
    fn resolve_steps(&self, intro: &PhaseResult, steps_override: Option<u32>) -> StepResolution {
        let (total_steps, source) = if let Some(n) = steps_override {
            (n, StepSource::Override)
        } else if let Some(n) = self
            .extractor
            .extract_step_count(&intro.text)
            .filter(|n| *n > 0)
        {
            tracing::info!(total_steps = n, "Step count extracted from intro");
            (n, StepSource::Extracted)
        } else {
            let default = self.settings.default_total_steps;
            let answer = self
                .operator
                .ask_line(&format!(
                    "Could not detect the total step count. How many steps did the plan announce? (default {})",
                    default
                ))
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Step count prompt failed");
                    String::new()
                });
            match answer.trim().parse::<u32>() {
                Ok(n) => (n, StepSource::Operator),
                Err(_) => (default, StepSource::Default),
            }
        };

        let resolution = StepResolution {
            total_steps,
            loop_count: loop_count(total_steps),
            source,
        };
        tracing::info!(
            total_steps,
            loop_count = resolution.loop_count,
            source = ?source,
            "Step count resolved"
        );
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::clipboard::{Clipboard, MemoryClipboard};
    use crate::errors::SurfaceError;
    use crate::flow_config::{PromptsSection, TranscriptSection};
    use crate::operator::{Interaction, ScriptedOperator};
    use crate::phase::SurfaceRole;
    use crate::orchestrator::journal::{Journal, PhaseState};
    use crate::orchestrator::retry::{RetryController, RetryPolicy};
    use crate::surface::manual::ManualSurface;
    use crate::surface::{Surface, SurfaceResponse, Surfaces};
    use crate::ui::FlowUI;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    const NOTE: &str = "(no previous response)";

    /// Surface that accepts every delivery and replays queued scrapes.
    struct FakeSurface {
        label: String,
        responses: Mutex<VecDeque<Option<String>>>,
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSurface {
        fn new(label: &str, responses: Vec<Option<&str>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let delivered = Arc::new(Mutex::new(Vec::new()));
            let surface = Self {
                label: label.to_string(),
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                delivered: Arc::clone(&delivered),
            };
            (surface, delivered)
        }
    }

    #[async_trait]
    impl Surface for FakeSurface {
        fn label(&self) -> &str {
            &self.label
        }

        async fn focus(&self) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn deliver(&self, directive: &str) -> Result<(), SurfaceError> {
            self.delivered.lock().unwrap().push(directive.to_string());
            Ok(())
        }

        async fn latest_response(
            &self,
            _timeout: Duration,
        ) -> Result<Option<SurfaceResponse>, SurfaceError> {
            let next = self.responses.lock().unwrap().pop_front().flatten();
            Ok(next.map(SurfaceResponse::new))
        }

        async fn capture_screenshot(&self, path: &Path) -> Result<(), SurfaceError> {
            std::fs::write(path, b"png").map_err(|e| SurfaceError::ScreenshotFailed {
                surface: self.label.clone(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    struct Harness {
        _dir: TempDir,
        store: ArtifactStore,
        journal: Journal,
        ui: FlowUI,
        extractor: ResponseExtractor,
        templates: PromptTemplates,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::create_at(
            &dir.path().join("flow_test"),
            "final_article.md",
            "planner",
            "executor",
        )
        .unwrap();
        let journal = Journal::new(store.journal_path());
        Harness {
            _dir: dir,
            store,
            journal,
            ui: FlowUI::hidden(),
            extractor: ResponseExtractor::default(),
            templates: PromptTemplates::load(&PromptsSection::default(), Path::new("."))
                .unwrap(),
        }
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            planning_label: "planner".to_string(),
            planning_url: "http://planner.test/".to_string(),
            executing_label: "executor".to_string(),
            executing_url: "http://executor.test/".to_string(),
            max_attempts: 3,
            response_timeout_secs: 0,
        }
    }

    fn input() -> FlowInput {
        FlowInput {
            problem_settings: "Writers lose drafts".to_string(),
            solution_hints: "autosave".to_string(),
            steps_override: None,
        }
    }

    async fn run_flow(
        h: &Harness,
        surfaces: &Surfaces,
        operator: &ScriptedOperator,
        input: &FlowInput,
    ) -> (FlowSummary, Vec<PhaseReport>) {
        run_flow_with(h, surfaces, operator, input, TranscriptSection::default(), None).await
    }

    async fn run_flow_with(
        h: &Harness,
        surfaces: &Surfaces,
        operator: &ScriptedOperator,
        input: &FlowInput,
        transcript: TranscriptSection,
        clipboard: Option<&dyn Clipboard>,
    ) -> (FlowSummary, Vec<PhaseReport>) {
        let mut runner = PhaseRunner::new(
            surfaces,
            operator,
            &h.store,
            &h.journal,
            &h.ui,
            &h.extractor,
            RetryController::new(RetryPolicy::immediate(3)),
            transcript,
            Duration::ZERO,
        );
        if let Some(clipboard) = clipboard {
            runner = runner.with_clipboard(clipboard);
        }
        let mut flow = FlowOrchestrator::new(
            runner,
            &h.extractor,
            operator,
            &h.templates,
            FlowSettings {
                missing_response_note: NOTE.to_string(),
                default_total_steps: 3,
            },
            h.store.root().to_path_buf(),
            h.store.transcript_path(),
        );
        let summary = flow.run(input, session_config()).await.unwrap();
        (summary, flow.reports().to_vec())
    }

    fn names(reports: &[PhaseReport]) -> Vec<String> {
        reports.iter().map(|r| r.phase.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_four_step_session_runs_two_loops_and_six_entries() {
        let h = harness();
        let (planning, planning_log) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("INTRO 全部で4個のステップ\n【prompt】\nmarkdown\nD1\n【example response】\n..."),
                Some("PLAN2\n```\nD2\n```"),
                Some("PLAN3\n```\nD3\n```"),
                Some("LASTPLAN\n```text\nD4\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, executing_log) = FakeSurface::new(
            "executor",
            vec![Some("R1"), Some("R2"), Some("R3"), Some("R4")],
        );
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(Vec::<String>::new());

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input()).await;

        assert_eq!(summary.steps.total_steps, 4);
        assert_eq!(summary.steps.loop_count, 2);
        assert_eq!(summary.steps.source, StepSource::Extracted);
        assert_eq!(
            names(&reports),
            vec![
                "00-format",
                "01-intro",
                "02-step1-exec",
                "03-step2-plan",
                "03-step2-exec",
                "03-step3-plan",
                "03-step3-exec",
                "04-last-plan",
                "05-last-exec",
                "06-summary",
            ]
        );

        let transcript = h.store.read_transcript().unwrap();
        assert_eq!(
            transcript,
            "\n\nINTRO 全部で4個のステップ\n【prompt】\nmarkdown\nD1\n【example response】\n...\
             \n\nR1\n\nR2\n\nR3\n\nR4\n\nSUMMARY"
        );
        assert_eq!(summary.transcript_entries, 6);
        assert_eq!(summary.manual_phases, 0);

        assert_eq!(
            *executing_log.lock().unwrap(),
            vec!["D1", "D2", "D3", "D4"]
        );
        let planning_prompts = planning_log.lock().unwrap().clone();
        assert_eq!(planning_prompts.len(), 6);
        assert!(planning_prompts[1].contains("Writers lose drafts"));
        assert!(planning_prompts[2].contains("R1"));
        assert!(planning_prompts[3].contains("R2"));
        assert!(planning_prompts[4].contains("R3"));
        assert!(planning_prompts[5].contains("R4"));

        assert_eq!(operator.confirm_count(), 10);
        assert!(h.store.screenshot_path("02-step1-exec").exists());
        assert!(
            h.store
                .output_dir(SurfaceRole::Executing)
                .join("03-step3-exec.txt")
                .exists()
        );
        assert!(h.store.output_dir(SurfaceRole::Planning).join("00-format.txt").exists());
    }

    #[tokio::test]
    async fn test_audit_and_journal_are_written() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("全部で2個のステップ\n```\nD1\n```"),
                Some("```\nD2\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, _) = FakeSurface::new("executor", vec![Some("R1"), Some("R2")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(Vec::<String>::new());

        let (summary, _) = run_flow(&h, &surfaces, &operator, &input()).await;
        let audit = summary.audit.expect("audit finalized");
        assert_eq!(audit.phases.len(), 6);
        assert!(audit.ended_at.is_some());
        assert_eq!(
            audit.persisted_phases(),
            vec!["01-intro", "02-step1-exec", "05-last-exec", "06-summary"]
        );
        assert!(h.store.root().join("session.json").exists());
        assert_eq!(summary.audit_file, h.store.root().join("session.json"));

        assert_eq!(h.journal.last_resolved_phase().as_deref(), Some("06-summary"));
        assert_eq!(
            h.journal.states_for("02-step1-exec").unwrap(),
            vec![
                PhaseState::Dispatching,
                PhaseState::AwaitingHumanConfirm,
                PhaseState::Extracting,
                PhaseState::Succeeded,
                PhaseState::Resolved,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_execution_result_is_retried_once() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("全部で2個のステップ\n```\nD1\n```"),
                Some("```\nD2\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, executing_log) =
            FakeSurface::new("executor", vec![None, Some("R1"), Some("R2")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(Vec::<String>::new());

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input()).await;

        let first = &reports[2];
        assert_eq!(first.phase.name, "02-step1-exec");
        assert_eq!(first.attempts, 2);
        assert_eq!(first.outcome, PhaseOutcome::Retried { attempts: 2 });
        assert_eq!(*executing_log.lock().unwrap(), vec!["D1", "D1", "D2"]);
        assert_eq!(summary.manual_phases, 0);
        assert_eq!(
            h.store.read_transcript().unwrap(),
            "\n\n全部で2個のステップ\n```\nD1\n```\n\nR1\n\nR2\n\nSUMMARY"
        );
    }

    #[tokio::test]
    async fn test_unresolved_execution_falls_back_to_operator() {
        let h = harness();
        let (planning, planning_log) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("全部で2個のステップ\n```\nD1\n```"),
                Some("```\nD2\n```"),
                Some("SUMMARY"),
            ],
        );
        // every scrape misses, including the post-fallback one
        let (executing, executing_log) = FakeSurface::new("executor", vec![]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(["manual one", ""]);

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input()).await;

        assert_eq!(executing_log.lock().unwrap().len(), 6);
        let first = &reports[2];
        assert_eq!(first.attempts, 3);
        assert_eq!(first.outcome, PhaseOutcome::Manual);
        assert_eq!(first.result.text, "manual one");
        let last = &reports[4];
        assert_eq!(last.phase.name, "05-last-exec");
        assert_eq!(last.outcome, PhaseOutcome::Skipped);
        assert!(!last.persisted);

        // the skipped result reaches the summary prompt as the placeholder note
        let summary_prompt = planning_log.lock().unwrap().last().cloned().unwrap();
        assert!(summary_prompt.contains(NOTE));

        assert_eq!(
            h.store.read_transcript().unwrap(),
            "\n\n全部で2個のステップ\n```\nD1\n```\n\nmanual one\n\nSUMMARY"
        );
        assert_eq!(summary.transcript_entries, 3);
        assert_eq!(summary.manual_phases, 2);
        // 3 attempts + 1 fallback confirmation per execution phase, 1 per plan phase
        assert_eq!(operator.confirm_count(), 4 * 2 + 4);
    }

    #[tokio::test]
    async fn test_missing_step_count_asks_operator() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("An introduction without numbering\n```\nD1\n```"),
                Some("```\nD2\n```"),
                Some("```\nD3\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, _) =
            FakeSurface::new("executor", vec![Some("R1"), Some("R2"), Some("R3")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(["3"]);

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input()).await;

        assert_eq!(summary.steps.total_steps, 3);
        assert_eq!(summary.steps.loop_count, 1);
        assert_eq!(summary.steps.source, StepSource::Operator);
        assert_eq!(reports.len(), 8);
        assert!(
            operator
                .interactions()
                .iter()
                .any(|i| matches!(i, Interaction::Line(_)))
        );
    }

    #[tokio::test]
    async fn test_unparseable_operator_step_count_uses_default() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![Some("OK"), Some("No numbering\n```\nD1\n```")],
        );
        let (executing, _) = FakeSurface::new("executor", vec![Some("R1")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        // step count answer, then skips for every later manual entry
        let operator = ScriptedOperator::new(["many"]);

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input()).await;

        assert_eq!(summary.steps.total_steps, 3);
        assert_eq!(summary.steps.source, StepSource::Default);
        // the session still reaches the summary phase
        assert_eq!(
            reports.last().map(|r| r.phase.name.as_str()),
            Some("06-summary")
        );
    }

    #[tokio::test]
    async fn test_steps_override_skips_extraction() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("全部で9個のステップ\n```\nD1\n```"),
                Some("```\nD2\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, _) = FakeSurface::new("executor", vec![Some("R1"), Some("R2")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(Vec::<String>::new());
        let input = FlowInput {
            steps_override: Some(2),
            ..input()
        };

        let (summary, reports) = run_flow(&h, &surfaces, &operator, &input).await;
        assert_eq!(summary.steps.source, StepSource::Override);
        assert_eq!(summary.steps.loop_count, 0);
        assert_eq!(reports.len(), 6);
    }

    #[tokio::test]
    async fn test_persisted_plans_land_in_execution_order() {
        let h = harness();
        let (planning, _) = FakeSurface::new(
            "planner",
            vec![
                Some("OK"),
                Some("INTRO 全部で3個のステップ\n```\nD1\n```"),
                Some("PLAN2\n```\nD2\n```"),
                Some("LASTPLAN\n```\nD3\n```"),
                Some("SUMMARY"),
            ],
        );
        let (executing, _) =
            FakeSurface::new("executor", vec![Some("R1"), Some("R2"), Some("R3")]);
        let surfaces = Surfaces::new(Box::new(planning), Box::new(executing));
        let operator = ScriptedOperator::new(Vec::<String>::new());
        let transcript = TranscriptSection {
            persist_loop_plans: true,
            persist_closing_plan: true,
        };

        let (summary, _) =
            run_flow_with(&h, &surfaces, &operator, &input(), transcript, None).await;

        assert_eq!(
            h.store.read_transcript().unwrap(),
            "\n\nINTRO 全部で3個のステップ\n```\nD1\n```\n\nR1\
             \n\nPLAN2\n```\nD2\n```\n\nR2\
             \n\nLASTPLAN\n```\nD3\n```\n\nR3\n\nSUMMARY"
        );
        assert_eq!(summary.transcript_entries, 7);
    }

    #[tokio::test]
    async fn test_prompts_are_copied_for_manual_paste() {
        let h = harness();
        let surfaces = Surfaces::new(
            Box::new(ManualSurface::new("planner")),
            Box::new(ManualSurface::new("executor")),
        );
        // intro pasted by hand, every later phase skipped
        let operator = ScriptedOperator::new(["OK", "全部で2個のステップ\n```\n行1\n行2\n```"]);
        let clipboard = MemoryClipboard::new();

        let (summary, reports) = run_flow_with(
            &h,
            &surfaces,
            &operator,
            &input(),
            TranscriptSection::default(),
            Some(&clipboard),
        )
        .await;

        let copies = clipboard.copies();
        assert_eq!(copies[0], reports[0].phase.prompt);
        assert!(copies[1].contains("Writers lose drafts"));
        // the extracted directive is copied whole for the executing surface
        assert!(copies.iter().any(|c| c == "行1\n行2"));
        assert_eq!(summary.steps.total_steps, 2);
        assert_eq!(reports[2].outcome, PhaseOutcome::Skipped);
    }

    #[test]
    fn test_loop_count_law() {
        assert_eq!(loop_count(0), 0);
        assert_eq!(loop_count(1), 0);
        assert_eq!(loop_count(2), 0);
        assert_eq!(loop_count(3), 1);
        assert_eq!(loop_count(4), 2);
        assert_eq!(loop_count(10), 8);
    }

    #[test]
    fn test_phase_count() {
        assert_eq!(phase_count(2), 6);
        assert_eq!(phase_count(4), 10);
    }
}
