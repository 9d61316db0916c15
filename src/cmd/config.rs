//! Configuration view and validation commands: `ghostflow config`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::super::{Cli, ConfigCommands};
use ghostflow::config::{CliOverrides, Config, discover_config_file};
use ghostflow::flow_config::{DEFAULT_CONFIG_FILE, FlowToml, SurfaceConfig, TemplateSource};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| discover_config_file(Path::new("")))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match command {
        None | Some(ConfigCommands::Show) => show(cli, &config_path)?,
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", config_path.display());
                return Ok(());
            }

            let toml = FlowToml::load(&config_path)?;
            let warnings = toml.validate(&base_dir(&config_path));

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            FlowToml::default().save(&config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [surfaces.planning] / [surfaces.executing] url, selectors, profile dir");
            println!("  - [retry] max_attempts, backoff and response timeout");
            println!("  - [prompts] phase templates, inline or {{ file = \"path\" }}");
            println!();
        }
    }

    Ok(())
}

fn show(cli: &Cli, config_path: &Path) -> Result<()> {
    println!();
    println!("Ghostflow Configuration");
    println!("=======================");
    println!();

    if config_path.exists() {
        println!("Config file: {}", config_path.display());
    } else {
        println!("No {} found, using defaults.", config_path.display());
        println!("Run 'ghostflow config init' to create one.");
    }
    println!();

    // effective values, environment included
    let explicit = cli.config.as_deref().filter(|p| p.exists());
    let config = Config::load(explicit, &CliOverrides::default(), cli.verbose)?;
    let flow = &config.flow;

    println!("[session]");
    println!("  output_dir = \"{}\"", flow.session.output_dir.display());
    println!("  transcript_file = \"{}\"", flow.session.transcript_file);
    println!("  default_total_steps = {}", flow.session.default_total_steps);
    println!();

    println!("[retry]");
    println!("  max_attempts = {}", flow.retry.max_attempts);
    println!("  dispatch_backoff_secs = {}", flow.retry.dispatch_backoff_secs);
    println!("  extraction_backoff_secs = {}", flow.retry.extraction_backoff_secs);
    println!("  response_timeout_secs = {}", flow.retry.response_timeout_secs);
    println!();

    println!("[transcript]");
    println!("  persist_loop_plans = {}", flow.transcript.persist_loop_plans);
    println!("  persist_closing_plan = {}", flow.transcript.persist_closing_plan);
    println!();

    println!("[browser]");
    println!("  headless = {}", flow.browser.headless);
    if let Some(exe) = &flow.browser.executable {
        println!("  executable = \"{}\"", exe.display());
    }
    println!(
        "  automation = {}",
        if cfg!(feature = "browser") {
            "enabled"
        } else {
            "not compiled in (manual relay)"
        }
    );
    println!();

    print_surface("planning", &flow.surfaces.planning);
    print_surface("executing", &flow.surfaces.executing);

    println!("[prompts]");
    for (key, source) in flow.prompts.entries() {
        match source {
            TemplateSource::Inline(text) => {
                println!("  {} = inline ({} chars)", key, text.chars().count())
            }
            TemplateSource::File { file } => println!("  {} = file \"{}\"", key, file.display()),
        }
    }
    println!();

    Ok(())
}

fn print_surface(role: &str, surface: &SurfaceConfig) {
    println!("[surfaces.{}]", role);
    println!("  label = \"{}\"", surface.label());
    println!("  url = \"{}\"", surface.url);
    if let Some(dir) = &surface.user_data_dir {
        println!("  user_data_dir = \"{}\"", dir.display());
    }
    println!("  input_area = \"{}\"", surface.input_area);
    println!("  latest_response = \"{}\"", surface.latest_response);
    println!();
}

fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
