//! Configuration file format for ghostflow.
//!
//! Reads `ghostflow.toml` (or a legacy `config.json`). Every field has a
//! default, so an empty file is a valid configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! [session]
//! output_dir = "output"
//! transcript_file = "final_article.md"
//! default_total_steps = 3
//!
//! [retry]
//! max_attempts = 3
//! dispatch_backoff_secs = 2
//! extraction_backoff_secs = 1
//! response_timeout_secs = 120
//!
//! [transcript]
//! persist_loop_plans = false
//! persist_closing_plan = false
//!
//! [browser]
//! headless = false
//!
//! [surfaces.planning]
//! url = "https://gemini.google.com/app"
//! user_data_dir = "profiles/gemini"
//! input_area = "div.ql-editor"
//! latest_response = "message-content"
//!
//! [surfaces.executing]
//! url = "https://chatgpt.com/"
//! input_area = "#prompt-textarea"
//! latest_response = "div[data-message-author-role='assistant']"
//!
//! [prompts]
//! phase_0 = { file = "format.md" }
//! phase_1 = "Problem: {problem_settings}\nHints: {solution_hints}"
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use crate::errors::ConfigError;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ghostflow.toml";

/// Legacy JSON configuration, read when no `ghostflow.toml` exists.
pub const LEGACY_CONFIG_FILE: &str = "config.json";

/// Placeholders substituted into prompt templates.
pub const PLACEHOLDERS: &[&str] = &["problem_settings", "solution_hints", "previous_response"];

/// `{name}` placeholder syntax shared by rendering and validation.
pub(crate) static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"));

/// Session-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Root under which timestamped session folders are created
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Name of the accumulating transcript inside the session folder
    #[serde(default = "default_transcript_file")]
    pub transcript_file: String,
    /// Substituted for `{previous_response}` when the previous phase produced nothing
    #[serde(default = "default_missing_response_note")]
    pub missing_response_note: String,
    /// Step count used when neither extraction nor the operator supplies one
    #[serde(default = "default_total_steps")]
    pub default_total_steps: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_transcript_file() -> String {
    "final_article.md".to_string()
}

fn default_missing_response_note() -> String {
    "（前のステップの回答が取得できませんでした）".to_string()
}

fn default_total_steps() -> u32 {
    3
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            transcript_file: default_transcript_file(),
            missing_response_note: default_missing_response_note(),
            default_total_steps: default_total_steps(),
        }
    }
}

/// Retry budget and bounded waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause after a failed or empty dispatch
    #[serde(default = "default_dispatch_backoff_secs")]
    pub dispatch_backoff_secs: u64,
    /// Pause before re-attempting extraction
    #[serde(default = "default_extraction_backoff_secs")]
    pub extraction_backoff_secs: u64,
    /// Cap on each automated response poll
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_dispatch_backoff_secs() -> u64 {
    2
}

fn default_extraction_backoff_secs() -> u64 {
    1
}

fn default_response_timeout_secs() -> u64 {
    120
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            dispatch_backoff_secs: default_dispatch_backoff_secs(),
            extraction_backoff_secs: default_extraction_backoff_secs(),
            response_timeout_secs: default_response_timeout_secs(),
        }
    }
}

impl RetrySection {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// Which plan outputs go into the transcript. Execution results, the intro
/// and the summary are always persisted; format priming never is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptSection {
    #[serde(default)]
    pub persist_loop_plans: bool,
    #[serde(default)]
    pub persist_closing_plan: bool,
}

/// Localized markers for the response extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSection {
    /// Labels that open a prompt section
    #[serde(default = "default_prompt_markers")]
    pub prompt_markers: Vec<String>,
    /// Labels that open an example-response section (end of the directive)
    #[serde(default = "default_example_markers")]
    pub example_markers: Vec<String>,
    /// Regex for an explicit total; the first participating group is the number
    #[serde(default = "default_total_steps_pattern")]
    pub total_steps_pattern: String,
    /// Regex for a single step number; the maximum match wins
    #[serde(default = "default_step_pattern")]
    pub step_pattern: String,
}

fn default_prompt_markers() -> Vec<String> {
    vec!["【プロンプト】".to_string(), "【prompt】".to_string()]
}

fn default_example_markers() -> Vec<String> {
    vec![
        "【ChatGPTからの回答例】".to_string(),
        "【example response】".to_string(),
    ]
}

fn default_total_steps_pattern() -> String {
    r"全部で\s*(\d+)\s*個のステップ|(?i:all\s+together\s+(\d+)\s+steps?)".to_string()
}

fn default_step_pattern() -> String {
    r"ステップ\s*(\d+)|(?i:\bstep\s*(\d+))".to_string()
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            prompt_markers: default_prompt_markers(),
            example_markers: default_example_markers(),
            total_steps_pattern: default_total_steps_pattern(),
            step_pattern: default_step_pattern(),
        }
    }
}

/// Browser launch settings shared by both surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserSection {
    #[serde(default)]
    pub headless: bool,
    /// Explicit Chrome/Chromium executable; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Extra command-line switches
    #[serde(default)]
    pub args: Vec<String>,
}

/// One AI surface: where it lives and how to find its input and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Output sub-folder prefix; derived from the URL host when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub url: String,
    /// Persistent browser profile, so logins survive between sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,
    #[serde(default)]
    pub input_area: String,
    #[serde(default)]
    pub latest_response: String,
}

impl SurfaceConfig {
    /// Label used for the output sub-folder and operator instructions.
    pub fn label(&self) -> String {
        if let Some(label) = &self.label
            && !label.trim().is_empty()
        {
            return label.trim().to_string();
        }
        label_from_url(&self.url)
    }
}

/// `https://chat.openai.com/` → `openai`, `https://gemini.google.com/app` → `gemini`.
fn label_from_url(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split(['/', ':', '?'])
        .next()
        .unwrap_or_default();
    let parts: Vec<&str> = host
        .split('.')
        .filter(|p| !p.is_empty() && *p != "www")
        .collect();
    let label = match parts.len() {
        0 => "surface",
        1 | 2 => parts[0],
        _ if parts[0] == "chat" => parts[1],
        _ => parts[0],
    };
    label.to_lowercase()
}

/// The planning and executing surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfacesSection {
    #[serde(default = "default_planning_surface")]
    pub planning: SurfaceConfig,
    #[serde(default = "default_executing_surface")]
    pub executing: SurfaceConfig,
}

fn default_planning_surface() -> SurfaceConfig {
    SurfaceConfig {
        label: Some("gemini".to_string()),
        url: "https://gemini.google.com/app".to_string(),
        user_data_dir: Some(PathBuf::from("profiles/gemini")),
        input_area: "div.ql-editor[contenteditable='true']".to_string(),
        latest_response: "message-content".to_string(),
    }
}

fn default_executing_surface() -> SurfaceConfig {
    SurfaceConfig {
        label: Some("chatgpt".to_string()),
        url: "https://chatgpt.com/".to_string(),
        user_data_dir: Some(PathBuf::from("profiles/chatgpt")),
        input_area: "#prompt-textarea".to_string(),
        latest_response: "div[data-message-author-role='assistant']".to_string(),
    }
}

impl Default for SurfacesSection {
    fn default() -> Self {
        Self {
            planning: default_planning_surface(),
            executing: default_executing_surface(),
        }
    }
}

/// A prompt template given inline or loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSource {
    Inline(String),
    File { file: PathBuf },
}

impl TemplateSource {
    /// Load the template text; relative files resolve against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<String, ConfigError> {
        match self {
            TemplateSource::Inline(text) => Ok(text.clone()),
            TemplateSource::File { file } => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    base_dir.join(file)
                };
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::TemplateReadFailed { path, source })
            }
        }
    }
}

/// Prompt templates keyed by phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsSection {
    #[serde(default = "default_phase_0")]
    pub phase_0: TemplateSource,
    #[serde(default = "default_phase_1")]
    pub phase_1: TemplateSource,
    #[serde(default = "default_phase_3_loop")]
    pub phase_3_loop: TemplateSource,
    #[serde(default = "default_phase_4_last")]
    pub phase_4_last: TemplateSource,
    #[serde(default = "default_phase_6_summary")]
    pub phase_6_summary: TemplateSource,
}

fn default_phase_0() -> TemplateSource {
    TemplateSource::Inline(
        "You will help me write a step-by-step article. For every step, write the explanation, \
then a section labeled 【prompt】 followed by a line reading `markdown` and the exact prompt \
the reader should send to the assistant, then a section labeled 【example response】. \
In your first answer, state the plan as \"all together N steps\". Reply OK if understood."
            .to_string(),
    )
}

fn default_phase_1() -> TemplateSource {
    TemplateSource::Inline(
        "Problem setting:\n{problem_settings}\n\nSolution hints:\n{solution_hints}\n\n\
Write the introduction and step 1, including its prompt."
            .to_string(),
    )
}

fn default_phase_3_loop() -> TemplateSource {
    TemplateSource::Inline(
        "The assistant answered the previous prompt as follows:\n\n{previous_response}\n\n\
Quote it as the example result and write the next step, including its prompt."
            .to_string(),
    )
}

fn default_phase_4_last() -> TemplateSource {
    TemplateSource::Inline(
        "The assistant answered the previous prompt as follows:\n\n{previous_response}\n\n\
Write the last step, including its prompt."
            .to_string(),
    )
}

fn default_phase_6_summary() -> TemplateSource {
    TemplateSource::Inline(
        "The assistant answered the last prompt as follows:\n\n{previous_response}\n\n\
Quote it as the example result and write the closing summary of the article."
            .to_string(),
    )
}

impl Default for PromptsSection {
    fn default() -> Self {
        Self {
            phase_0: default_phase_0(),
            phase_1: default_phase_1(),
            phase_3_loop: default_phase_3_loop(),
            phase_4_last: default_phase_4_last(),
            phase_6_summary: default_phase_6_summary(),
        }
    }
}

impl PromptsSection {
    /// Templates by configuration key.
    pub fn entries(&self) -> [(&'static str, &TemplateSource); 5] {
        [
            ("phase_0", &self.phase_0),
            ("phase_1", &self.phase_1),
            ("phase_3_loop", &self.phase_3_loop),
            ("phase_4_last", &self.phase_4_last),
            ("phase_6_summary", &self.phase_6_summary),
        ]
    }
}

/// The complete ghostflow.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowToml {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub transcript: TranscriptSection,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub surfaces: SurfacesSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

impl FlowToml {
    /// Load configuration from a file. `.json` files use the legacy layout.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|e| e == "json") {
            Self::parse_legacy_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse ghostflow.toml")
    }

    /// Parse the legacy `config.json` layout (`browser_config`, `selectors`, `prompts`).
    pub fn parse_legacy_json(content: &str) -> Result<Self> {
        let legacy: LegacyConfig =
            serde_json::from_str(content).context("Failed to parse legacy config.json")?;
        Ok(legacy.into_flow_toml())
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize ghostflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("GHOSTFLOW_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.session.output_dir = PathBuf::from(dir);
        }
        if let Some(headless) = lookup("GHOSTFLOW_HEADLESS") {
            self.browser.headless = matches!(headless.trim(), "1" | "true" | "yes");
        }
        if let Some(secs) = lookup("GHOSTFLOW_RESPONSE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.retry.response_timeout_secs = secs;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self, base_dir: &Path) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.retry.max_attempts == 0 {
            warnings.push("retry.max_attempts is 0: every phase goes straight to manual fallback".to_string());
        }

        for (key, pattern) in [
            ("extraction.total_steps_pattern", &self.extraction.total_steps_pattern),
            ("extraction.step_pattern", &self.extraction.step_pattern),
        ] {
            match Regex::new(pattern) {
                Ok(re) if re.captures_len() < 2 => {
                    warnings.push(format!("{} has no capture group for the step number", key))
                }
                Ok(_) => {}
                Err(e) => warnings.push(format!("Invalid regex in {}: {}", key, e)),
            }
        }

        for (role, surface) in [
            ("planning", &self.surfaces.planning),
            ("executing", &self.surfaces.executing),
        ] {
            if surface.url.trim().is_empty() {
                warnings.push(format!("surfaces.{}.url is empty", role));
            }
            if surface.input_area.trim().is_empty() {
                warnings.push(format!(
                    "surfaces.{}.input_area is empty: prompts must be pasted manually",
                    role
                ));
            }
            if surface.latest_response.trim().is_empty() {
                warnings.push(format!(
                    "surfaces.{}.latest_response is empty: responses must be pasted manually",
                    role
                ));
            }
        }

        for (key, source) in self.prompts.entries() {
            match source.load(base_dir) {
                Ok(text) => {
                    for name in unknown_placeholders(&text) {
                        warnings.push(format!(
                            "prompts.{} uses unknown placeholder {{{}}}",
                            key, name
                        ));
                    }
                    if key != "phase_0" && key != "phase_1" && !text.contains("{previous_response}")
                    {
                        warnings.push(format!(
                            "prompts.{} never references {{previous_response}}",
                            key
                        ));
                    }
                }
                Err(e) => warnings.push(e.to_string()),
            }
        }

        warnings
    }
}

/// Placeholder names in `template` that the flow never substitutes.
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown: Vec<String> = PLACEHOLDER_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| !PLACEHOLDERS.contains(&name.as_str()))
        .collect();
    unknown.dedup();
    unknown
}

/// Legacy `config.json` layout with `gemini` / `chatgpt` keys.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    browser_config: LegacyBrowserConfig,
    #[serde(default)]
    selectors: LegacySelectors,
    #[serde(default)]
    prompts: std::collections::HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyBrowserConfig {
    #[serde(default)]
    headless: bool,
    gemini_url: Option<String>,
    chatgpt_url: Option<String>,
    gemini_user_data_dir: Option<PathBuf>,
    chatgpt_user_data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacySelectors {
    gemini: Option<LegacySurfaceSelectors>,
    chatgpt: Option<LegacySurfaceSelectors>,
}

#[derive(Debug, Deserialize)]
struct LegacySurfaceSelectors {
    #[serde(default)]
    input_area: String,
    #[serde(default)]
    latest_response: String,
}

impl LegacyConfig {
    fn into_flow_toml(self) -> FlowToml {
        let mut toml = FlowToml::default();
        toml.browser.headless = self.browser_config.headless;

        let planning = &mut toml.surfaces.planning;
        if let Some(url) = self.browser_config.gemini_url {
            planning.url = url;
        }
        if let Some(dir) = self.browser_config.gemini_user_data_dir {
            planning.user_data_dir = Some(dir);
        }
        if let Some(sel) = self.selectors.gemini {
            planning.input_area = sel.input_area;
            planning.latest_response = sel.latest_response;
        }

        let executing = &mut toml.surfaces.executing;
        if let Some(url) = self.browser_config.chatgpt_url {
            executing.url = url;
        }
        if let Some(dir) = self.browser_config.chatgpt_user_data_dir {
            executing.user_data_dir = Some(dir);
        }
        if let Some(sel) = self.selectors.chatgpt {
            executing.input_area = sel.input_area;
            executing.latest_response = sel.latest_response;
        }

        let mut prompts = self.prompts;
        let mut take = |key: &str, slot: &mut TemplateSource| {
            if let Some(text) = prompts.remove(key) {
                *slot = TemplateSource::Inline(text);
            }
        };
        take("phase_0", &mut toml.prompts.phase_0);
        take("phase_1", &mut toml.prompts.phase_1);
        take("phase_3_loop", &mut toml.prompts.phase_3_loop);
        take("phase_4_last", &mut toml.prompts.phase_4_last);
        take("phase_6_summary", &mut toml.prompts.phase_6_summary);

        toml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let toml = FlowToml::parse("").unwrap();
        assert_eq!(toml.retry.max_attempts, 3);
        assert_eq!(toml.retry.dispatch_backoff_secs, 2);
        assert_eq!(toml.retry.extraction_backoff_secs, 1);
        assert_eq!(toml.retry.response_timeout_secs, 120);
        assert_eq!(toml.session.default_total_steps, 3);
        assert_eq!(toml.session.transcript_file, "final_article.md");
        assert!(!toml.transcript.persist_loop_plans);
        assert!(!toml.transcript.persist_closing_plan);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = FlowToml::parse(
            r#"
[retry]
max_attempts = 5

[surfaces.executing]
url = "https://chat.openai.com/"
"#,
        )
        .unwrap();
        assert_eq!(toml.retry.max_attempts, 5);
        assert_eq!(toml.retry.dispatch_backoff_secs, 2);
        assert_eq!(toml.surfaces.executing.url, "https://chat.openai.com/");
        assert_eq!(toml.surfaces.executing.label(), "openai");
        assert_eq!(toml.surfaces.planning.label(), "gemini");
    }

    #[test]
    fn test_template_source_inline_or_file() {
        let toml = FlowToml::parse(
            r#"
[prompts]
phase_0 = { file = "format.md" }
phase_1 = "Problem: {problem_settings}"
"#,
        )
        .unwrap();
        assert_eq!(
            toml.prompts.phase_0,
            TemplateSource::File {
                file: PathBuf::from("format.md")
            }
        );
        assert_eq!(
            toml.prompts.phase_1,
            TemplateSource::Inline("Problem: {problem_settings}".to_string())
        );
    }

    #[test]
    fn test_template_file_resolves_relative_to_base_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("format.md"), "# Format").unwrap();
        let source = TemplateSource::File {
            file: PathBuf::from("format.md"),
        };
        assert_eq!(source.load(dir.path()).unwrap(), "# Format");
    }

    #[test]
    fn test_template_file_missing_is_error() {
        let dir = tempdir().unwrap();
        let source = TemplateSource::File {
            file: PathBuf::from("missing.md"),
        };
        assert!(matches!(
            source.load(dir.path()),
            Err(ConfigError::TemplateReadFailed { .. })
        ));
    }

    #[test]
    fn test_label_from_url() {
        assert_eq!(label_from_url("https://gemini.google.com/app"), "gemini");
        assert_eq!(label_from_url("https://chatgpt.com/"), "chatgpt");
        assert_eq!(label_from_url("https://chat.openai.com/c/123"), "openai");
        assert_eq!(label_from_url("http://localhost:8080/"), "localhost");
        assert_eq!(label_from_url(""), "surface");
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut toml = FlowToml::default();
        toml.apply_env(|key| match key {
            "GHOSTFLOW_OUTPUT_DIR" => Some("/tmp/sessions".to_string()),
            "GHOSTFLOW_HEADLESS" => Some("true".to_string()),
            "GHOSTFLOW_RESPONSE_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        });
        assert_eq!(toml.session.output_dir, PathBuf::from("/tmp/sessions"));
        assert!(toml.browser.headless);
        assert_eq!(toml.retry.response_timeout_secs, 30);
    }

    #[test]
    fn test_apply_env_ignores_garbage() {
        let mut toml = FlowToml::default();
        toml.apply_env(|key| match key {
            "GHOSTFLOW_RESPONSE_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(toml.retry.response_timeout_secs, 120);
    }

    #[test]
    fn test_defaults_validate_cleanly() {
        let dir = tempdir().unwrap();
        let warnings = FlowToml::default().validate(dir.path());
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = tempdir().unwrap();
        let mut toml = FlowToml::default();
        toml.extraction.step_pattern = "(broken".to_string();
        toml.surfaces.executing.latest_response = String::new();
        toml.prompts.phase_3_loop = TemplateSource::Inline("Use {previous_reply}".to_string());

        let warnings = toml.validate(dir.path());
        assert!(warnings.iter().any(|w| w.contains("extraction.step_pattern")));
        assert!(warnings.iter().any(|w| w.contains("surfaces.executing.latest_response")));
        assert!(warnings.iter().any(|w| w.contains("{previous_reply}")));
        assert!(warnings.iter().any(|w| w.contains("never references")));
    }

    #[test]
    fn test_unknown_placeholders() {
        assert_eq!(
            unknown_placeholders("{problem_settings} {topic} {previous_response} {topic}"),
            vec!["topic".to_string()]
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut toml = FlowToml::default();
        toml.retry.max_attempts = 4;
        toml.save(&path).unwrap();

        let loaded = FlowToml::load(&path).unwrap();
        assert_eq!(loaded.retry.max_attempts, 4);
        assert_eq!(loaded.prompts.phase_1, toml.prompts.phase_1);
    }

    #[test]
    fn test_legacy_json_layout() {
        let json = r##"{
            "browser_config": {
                "headless": true,
                "gemini_url": "https://gemini.google.com/app",
                "chatgpt_url": "https://chatgpt.com/",
                "gemini_user_data_dir": "./gemini_profile",
                "chatgpt_user_data_dir": "./chatgpt_profile"
            },
            "selectors": {
                "gemini": {"input_area": "rich-textarea", "latest_response": "model-response"},
                "chatgpt": {"input_area": "#prompt-textarea", "latest_response": ".markdown"}
            },
            "prompts": {"phase_0": "format", "phase_6_summary": "sum {previous_response}"}
        }"##;
        let toml = FlowToml::parse_legacy_json(json).unwrap();
        assert!(toml.browser.headless);
        assert_eq!(toml.surfaces.planning.input_area, "rich-textarea");
        assert_eq!(toml.surfaces.executing.latest_response, ".markdown");
        assert_eq!(
            toml.surfaces.planning.user_data_dir,
            Some(PathBuf::from("./gemini_profile"))
        );
        assert_eq!(toml.prompts.phase_0, TemplateSource::Inline("format".to_string()));
        assert_eq!(toml.prompts.phase_1, default_phase_1());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = FlowToml::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(toml.retry.max_attempts, 3);
    }
}
