//! Tracing setup.
//!
//! Operator-facing text goes through [`crate::ui`]; tracing carries the
//! diagnostic record. The stderr layer is quiet (warnings only) unless
//! `--verbose` is set, since it shares the terminal with the progress bar.
//! When a session directory exists, a non-blocking file layer captures the
//! full `RUST_LOG`-filtered stream into `ghostflow.log`.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "ghostflow=debug" } else { "ghostflow=info" }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(verbose).into())
}

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stderr_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(stderr_level);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .context("Log file path has no parent directory")?;
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
