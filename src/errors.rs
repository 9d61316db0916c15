//! Typed error hierarchy for the ghostflow orchestrator.
//!
//! Three top-level enums cover the three collaborators that can fail:
//! - `SurfaceError`: AI surface delivery, polling and capture failures
//! - `ConfigError`: configuration and prompt-template problems
//! - `ArtifactError`: session directory and file write failures
//!
//! Extraction misses are not errors; they are `None` results handled by the
//! retry and fallback policy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an AI surface (planning or executing).
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Automated input into {surface} failed: {message}")]
    DeliveryFailed { surface: String, message: String },

    #[error("No response from {surface} within {secs}s")]
    ResponseTimeout { surface: String, secs: u64 },

    #[error("Surface {surface} is unavailable: {message}")]
    Unavailable { surface: String, message: String },

    #[error("Failed to capture screenshot of {surface} at {path}: {message}")]
    ScreenshotFailed {
        surface: String,
        path: PathBuf,
        message: String,
    },
}

/// Errors from loading or validating the flow configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Prompt template '{0}' is not configured")]
    MissingTemplate(String),

    #[error("Failed to read prompt template file at {path}: {source}")]
    TemplateReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from writing session artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create session directory at {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
