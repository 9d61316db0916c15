use crate::audit::PhaseOutcome;
use crate::ui::icons::{ARTICLE, CHECK, CLIPBOARD, CROSS, FOLDER, HAND, RETRY, SPARKLE, WARN};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

/// Terminal UI for a ghost-writing session.
///
/// A single phase bar tracks how many phases have resolved. Everything the
/// operator must act on is printed above it through `MultiProgress`, so the
/// bar never garbles instructions.
pub struct FlowUI {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    verbose: bool,
}

impl FlowUI {
    /// Create the UI with an initial phase estimate. The length is corrected
    /// with [`Self::set_total_phases`] once the step count is known.
    pub fn new(estimated_phases: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let phase_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let phase_bar = multi.add(ProgressBar::new(estimated_phases));
        phase_bar.set_style(phase_style);
        phase_bar.set_prefix("Phases");

        Self {
            multi,
            phase_bar,
            verbose,
        }
    }

    /// A UI that draws nothing. Used by tests and non-interactive runs.
    pub fn hidden() -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let phase_bar = multi.add(ProgressBar::hidden());
        Self {
            multi,
            phase_bar,
            verbose: false,
        }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() {
            return;
        }
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn set_total_phases(&self, total: u64) {
        self.phase_bar.set_length(total);
    }

    pub fn print_separator(&self) {
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
    }

    /// Header printed before a phase starts.
    pub fn print_phase_header(&self, phase: &str, description: &str, target: &str) {
        self.phase_bar
            .set_message(format!("{}: {}", style(phase).yellow(), description));
        self.print_line("");
        self.print_separator();
        self.print_line(format!(
            "{} {}: {} {}",
            style("▶").green().bold(),
            style(phase).yellow().bold(),
            description,
            style(format!("→ {}", target)).dim()
        ));
        self.print_separator();
    }

    /// Short status line; printed only in verbose mode.
    pub fn log_step(&self, msg: &str) {
        if self.verbose {
            self.print_line(format!("    {} {}", style("→").dim(), style(msg).dim()));
        }
    }

    pub fn info(&self, msg: &str) {
        self.print_line(format!("  {}", msg));
    }

    pub fn warn(&self, msg: &str) {
        self.print_line(format!("  {}{}", WARN, style(msg).yellow()));
    }

    /// Something only the operator can do, e.g. pressing send in a browser tab.
    pub fn action_required(&self, msg: &str) {
        self.print_line("");
        self.print_line(format!(
            "  {}{}",
            HAND,
            style(format!("Action required: {}", msg)).magenta().bold()
        ));
    }

    /// Automated input failed; tell the operator where to copy the prompt from.
    pub fn manual_paste(&self, surface: &str, prompt_file: Option<&Path>, prompt: &str) {
        self.print_line(format!(
            "  {}Paste the prompt into {} manually.",
            CLIPBOARD,
            style(surface).cyan().bold()
        ));
        match prompt_file {
            Some(path) => self.print_line(format!(
                "     {} {}",
                style("Prompt file:").dim(),
                path.display()
            )),
            None => {
                self.print_line(format!("     {}", style("Prompt:").dim()));
                for line in prompt.lines() {
                    self.print_line(format!("     {}", line));
                }
            }
        }
    }

    pub fn prompt_copied(&self) {
        self.print_line(format!(
            "     {}",
            style("The prompt is on the clipboard (Ctrl+V / Cmd+V to paste).").dim()
        ));
    }

    pub fn retrying(&self, attempt: u32, max: u32, reason: &str) {
        self.print_line(format!(
            "  {}Attempt {}/{}: {}",
            RETRY,
            style(attempt).cyan(),
            max,
            style(reason).dim()
        ));
    }

    /// Numbered manual steps after the retry budget ran out.
    pub fn manual_fallback(
        &self,
        planning: &str,
        executing: &str,
        step: &str,
        prompt_file: Option<&Path>,
    ) {
        self.print_line("");
        self.print_line(format!(
            "  {}{}",
            CROSS,
            style("Automatic execution failed. Please run this step by hand.").red()
        ));
        let source = match prompt_file {
            Some(path) => format!("{} (also saved to {})", planning, path.display()),
            None => planning.to_string(),
        };
        self.print_line(format!(
            "    1. Copy the prompt for {} from {}.",
            style(step).yellow(),
            style(source).cyan()
        ));
        self.print_line(format!(
            "    2. Paste it into {} and send it.",
            style(executing).cyan()
        ));
        self.print_line(format!(
            "    3. Wait until {} has finished answering.",
            style(executing).cyan()
        ));
    }

    /// Resolve the current phase and advance the bar.
    pub fn phase_complete(&self, phase: &str, outcome: &PhaseOutcome) {
        self.phase_bar.inc(1);
        let line = match outcome {
            PhaseOutcome::Automated => format!("{}{} resolved", CHECK, style(phase).green()),
            PhaseOutcome::Retried { attempts } => format!(
                "{}{} resolved after {} attempts",
                CHECK,
                style(phase).green(),
                attempts
            ),
            PhaseOutcome::Manual => {
                format!("{}{} resolved by operator", CHECK, style(phase).yellow())
            }
            PhaseOutcome::Skipped | PhaseOutcome::InProgress => {
                format!("{}{} skipped", WARN, style(phase).yellow())
            }
        };
        self.print_line(format!("  {}", line));
    }

    pub fn session_started(&self, root: &Path) {
        self.print_line(format!(
            "{}{} {}",
            FOLDER,
            style("Session folder:").bold(),
            root.display()
        ));
    }

    pub fn session_complete(&self, transcript: &Path, entries: usize, manual: usize) {
        self.phase_bar.finish_and_clear();
        self.print_line("");
        self.print_line(format!(
            "{}{}",
            SPARKLE,
            style("Flow complete!").green().bold()
        ));
        self.print_line(format!(
            "  {}{} ({} entries)",
            ARTICLE,
            transcript.display(),
            entries
        ));
        if manual > 0 {
            self.print_line(format!(
                "  {}",
                style(format!("{} phase(s) needed operator input", manual)).dim()
            ));
        }
    }
}
