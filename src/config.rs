use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audit::SessionConfig;
use crate::errors::ConfigError;
use crate::extract::ResponseExtractor;
use crate::flow_config::{DEFAULT_CONFIG_FILE, FlowToml, LEGACY_CONFIG_FILE, PromptsSection};
use crate::orchestrator::RetryPolicy;

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub headless: bool,
    pub response_timeout_secs: Option<u64>,
}

/// Prompt templates with file sources already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub format: String,
    pub intro: String,
    pub loop_plan: String,
    pub closing_plan: String,
    pub summary: String,
}

impl PromptTemplates {
    pub fn load(prompts: &PromptsSection, base_dir: &Path) -> Result<Self, ConfigError> {
        let load = |key: &str| -> Result<String, ConfigError> {
            let source = prompts
                .entries()
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, s)| s)
                .ok_or_else(|| ConfigError::MissingTemplate(key.to_string()))?;
            let text = source.load(base_dir)?;
            if text.trim().is_empty() {
                return Err(ConfigError::MissingTemplate(key.to_string()));
            }
            Ok(text)
        };

        Ok(Self {
            format: load("phase_0")?,
            intro: load("phase_1")?,
            loop_plan: load("phase_3_loop")?,
            closing_plan: load("phase_4_last")?,
            summary: load("phase_6_summary")?,
        })
    }
}

/// Configuration file in `dir` used when none is given explicitly:
/// `ghostflow.toml`, else a legacy `config.json`.
pub fn discover_config_file(dir: &Path) -> Option<PathBuf> {
    [DEFAULT_CONFIG_FILE, LEGACY_CONFIG_FILE]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Runtime configuration: `ghostflow.toml`, then `.env` / environment, then CLI flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the settings came from; `None` when running on defaults
    pub config_file: Option<PathBuf>,
    /// Directory that relative template files resolve against
    pub base_dir: PathBuf,
    pub flow: FlowToml,
    pub templates: PromptTemplates,
    pub verbose: bool,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `config_path` must exist. Without one, `ghostflow.toml` or
    /// `config.json` in the working directory is used when present, otherwise
    /// the defaults.
    pub fn load(config_path: Option<&Path>, overrides: &CliOverrides, verbose: bool) -> Result<Self> {
        let (flow, config_file) = match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                (FlowToml::load(path)?, Some(path.to_path_buf()))
            }
            None => match discover_config_file(Path::new("")) {
                Some(path) => (FlowToml::load(&path)?, Some(path)),
                None => (FlowToml::default(), None),
            },
        };

        let base_dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::from_flow(flow, config_file, base_dir, overrides, verbose, |key| {
            std::env::var(key).ok()
        })
    }

    /// Build from an already parsed file, with an explicit environment lookup.
    pub fn from_flow<F>(
        mut flow: FlowToml,
        config_file: Option<PathBuf>,
        base_dir: PathBuf,
        overrides: &CliOverrides,
        verbose: bool,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        flow.apply_env(env);

        if let Some(dir) = &overrides.output_dir {
            flow.session.output_dir = dir.clone();
        }
        if overrides.headless {
            flow.browser.headless = true;
        }
        if let Some(secs) = overrides.response_timeout_secs {
            flow.retry.response_timeout_secs = secs;
        }

        let templates = PromptTemplates::load(&flow.prompts, &base_dir)
            .context("Failed to load prompt templates")?;

        Ok(Self {
            config_file,
            base_dir,
            flow,
            templates,
            verbose,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_section(&self.flow.retry)
    }

    pub fn response_timeout(&self) -> Duration {
        self.flow.retry.response_timeout()
    }

    pub fn extractor(&self) -> Result<ResponseExtractor, ConfigError> {
        ResponseExtractor::from_config(&self.flow.extraction)
    }

    pub fn output_dir(&self) -> &Path {
        &self.flow.session.output_dir
    }

    /// Surface settings recorded in `session.json`.
    pub fn session_config(&self) -> SessionConfig {
        let surfaces = &self.flow.surfaces;
        SessionConfig {
            planning_label: surfaces.planning.label(),
            planning_url: surfaces.planning.url.clone(),
            executing_label: surfaces.executing.label(),
            executing_url: surfaces.executing.url.clone(),
            max_attempts: self.flow.retry.max_attempts,
            response_timeout_secs: self.flow.retry.response_timeout_secs,
        }
    }
}
