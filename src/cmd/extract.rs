//! Extractor debugging aid: `ghostflow extract <FILE>`.

use anyhow::{Context, Result};
use std::path::Path;

use super::super::Cli;
use ghostflow::config::{CliOverrides, Config};

pub fn cmd_extract(cli: &Cli, file: &Path, steps_only: bool) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), &CliOverrides::default(), cli.verbose)?;
    let extractor = config
        .extractor()
        .context("Invalid [extraction] settings")?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read response file: {}", file.display()))?;

    match extractor.extract_step_count(&text) {
        Some(n) => println!("Step count: {}", n),
        None => println!("Step count: not found"),
    }
    if steps_only {
        return Ok(());
    }

    println!("Strategies: {}", extractor.strategy_names().join(", "));
    match extractor.extract_directive(&text) {
        Some(directive) => {
            println!("Directive:");
            println!("{}", directive);
        }
        None => println!("Directive: not found"),
    }

    Ok(())
}
