//! Full writing session: `ghostflow run`.

use anyhow::{Context, Result};

use super::super::{Cli, RunArgs};
use ghostflow::artifacts::{ArtifactStore, LOG_FILE};
use ghostflow::clipboard::SystemClipboard;
use ghostflow::config::{CliOverrides, Config};
use ghostflow::logging;
use ghostflow::operator::{Operator, TerminalOperator};
use ghostflow::orchestrator::{
    FlowInput, FlowOrchestrator, FlowSettings, Journal, PhaseRunner, RetryController,
    RetryPolicy, phase_count,
};
use ghostflow::phase::SurfaceRole;
use ghostflow::surface::Surfaces;
use ghostflow::ui::FlowUI;

pub async fn cmd_run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let overrides = CliOverrides {
        output_dir: args.output.clone(),
        headless: args.headless,
        response_timeout_secs: args.response_timeout,
    };
    let config = Config::load(cli.config.as_deref(), &overrides, cli.verbose)?;
    let extractor = config.extractor().context("Invalid [extraction] settings")?;
    let operator = TerminalOperator::new();

    let input = collect_input(args, &operator)?;

    let surfaces_config = &config.flow.surfaces;
    let store = ArtifactStore::create(
        config.output_dir(),
        &config.flow.session.transcript_file,
        &surfaces_config.planning.label(),
        &surfaces_config.executing.label(),
    )
    .context("Failed to create session directory")?;
    let _log_guard = logging::init(cli.verbose, Some(&store.root().join(LOG_FILE)))?;
    tracing::info!(
        config = ?config.config_file,
        session = %store.root().display(),
        "Starting session"
    );

    let estimated = input
        .steps_override
        .unwrap_or(config.flow.session.default_total_steps);
    let ui = FlowUI::new(u64::from(phase_count(estimated)), cli.verbose);
    ui.session_started(store.root());

    let (surfaces, automated) = open_surfaces(&config, &ui).await?;

    if !args.no_login_wait {
        ui.action_required(&format!(
            "log in to {} and {} in the opened windows",
            surfaces.label(SurfaceRole::Planning),
            surfaces.label(SurfaceRole::Executing),
        ));
        operator.confirm("Both surfaces ready?")?;
    }

    let mut policy = config.retry_policy();
    if !automated {
        // every attempt would end in the same manual paste
        policy = RetryPolicy {
            max_attempts: 1,
            ..policy
        };
    }

    let journal = Journal::new(store.journal_path());
    let clipboard = SystemClipboard::new();
    let runner = PhaseRunner::new(
        &surfaces,
        &operator,
        &store,
        &journal,
        &ui,
        &extractor,
        RetryController::new(policy),
        config.flow.transcript.clone(),
        config.response_timeout(),
    )
    .with_clipboard(&clipboard);
    let settings = FlowSettings {
        missing_response_note: config.flow.session.missing_response_note.clone(),
        default_total_steps: config.flow.session.default_total_steps,
    };
    let mut flow = FlowOrchestrator::new(
        runner,
        &extractor,
        &operator,
        &config.templates,
        settings,
        store.root().to_path_buf(),
        store.transcript_path(),
    );

    let summary = flow.run(&input, config.session_config()).await?;
    ui.session_complete(
        &summary.transcript,
        summary.transcript_entries,
        summary.manual_phases,
    );
    ui.info(&format!("Session report: {}", summary.audit_file.display()));
    ui.info(&format!("Phase journal: {}", journal.path().display()));

    Ok(())
}

/// Problem setting and hints from flags, a file, or the terminal.
fn collect_input(args: &RunArgs, operator: &dyn Operator) -> Result<FlowInput> {
    let problem_settings = match (&args.problem, &args.problem_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read problem file: {}", path.display()))?,
        (None, None) => operator.ask_text("Problem setting (finish with a line containing only '.')")?,
    };
    if problem_settings.trim().is_empty() {
        anyhow::bail!("A problem setting is required");
    }

    let solution_hints = match &args.hints {
        Some(text) => text.clone(),
        None => operator.ask_text("Solution hints (empty line to skip)")?,
    };

    Ok(FlowInput {
        problem_settings: problem_settings.trim().to_string(),
        solution_hints: solution_hints.trim().to_string(),
        steps_override: args.steps,
    })
}

/// Open both surfaces. Returns whether responses can be captured automatically.
#[cfg(feature = "browser")]
async fn open_surfaces(config: &Config, ui: &FlowUI) -> Result<(Surfaces, bool)> {
    use ghostflow::surface::browser::BrowserSurface;

    let surfaces = &config.flow.surfaces;
    ui.log_step(&format!("opening {}", surfaces.planning.url));
    let planning = BrowserSurface::launch(&surfaces.planning, &config.flow.browser)
        .await
        .context("Failed to open the planning surface")?;
    ui.log_step(&format!("opening {}", surfaces.executing.url));
    let executing = BrowserSurface::launch(&surfaces.executing, &config.flow.browser)
        .await
        .context("Failed to open the executing surface")?;

    Ok((Surfaces::new(Box::new(planning), Box::new(executing)), true))
}

#[cfg(not(feature = "browser"))]
async fn open_surfaces(config: &Config, ui: &FlowUI) -> Result<(Surfaces, bool)> {
    use ghostflow::surface::manual::ManualSurface;

    let surfaces = &config.flow.surfaces;
    ui.warn("Built without the `browser` feature: prompts and responses are relayed by hand.");
    ui.info(&format!(
        "Open {} ({}) and {} ({}) yourself.",
        surfaces.planning.label(),
        surfaces.planning.url,
        surfaces.executing.label(),
        surfaces.executing.url,
    ));
    tracing::info!("Using manual surfaces");

    Ok((
        Surfaces::new(
            Box::new(ManualSurface::new(surfaces.planning.label())),
            Box::new(ManualSurface::new(surfaces.executing.label())),
        ),
        false,
    ))
}
