//! AI surfaces: the planning and executing conversations the flow bridges.
//!
//! The orchestration never branches on which service sits behind a surface;
//! the label only names the output sub-folder and the operator instructions.

pub mod manual;

#[cfg(feature = "browser")]
pub mod browser;

pub use manual::ManualSurface;

#[cfg(feature = "browser")]
pub use browser::BrowserSurface;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::errors::SurfaceError;
use crate::phase::SurfaceRole;

/// Text scraped from the last response element of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceResponse {
    pub text: String,
}

impl SurfaceResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[async_trait]
pub trait Surface: Send + Sync {
    /// Short name, e.g. `gemini`.
    fn label(&self) -> &str;

    /// Bring the surface to the front before the operator interacts with it.
    async fn focus(&self) -> Result<(), SurfaceError>;

    /// Best-effort automated input of `directive` into the input area.
    async fn deliver(&self, directive: &str) -> Result<(), SurfaceError>;

    /// Poll up to `timeout` for the last response element. `Ok(None)` on timeout.
    async fn latest_response(
        &self,
        timeout: Duration,
    ) -> Result<Option<SurfaceResponse>, SurfaceError>;

    /// Screenshot the last response element to `path`.
    async fn capture_screenshot(&self, path: &Path) -> Result<(), SurfaceError>;
}

/// The two surfaces of a session, addressed by role.
pub struct Surfaces {
    planning: Box<dyn Surface>,
    executing: Box<dyn Surface>,
}

impl Surfaces {
    pub fn new(planning: Box<dyn Surface>, executing: Box<dyn Surface>) -> Self {
        Self {
            planning,
            executing,
        }
    }

    pub fn get(&self, role: SurfaceRole) -> &dyn Surface {
        match role {
            SurfaceRole::Planning => self.planning.as_ref(),
            SurfaceRole::Executing => self.executing.as_ref(),
        }
    }

    pub fn label(&self, role: SurfaceRole) -> &str {
        self.get(role).label()
    }
}
