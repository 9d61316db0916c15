use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::{Surface, SurfaceResponse};
use crate::errors::SurfaceError;

/// A surface with no automation. Delivery always fails and no response is
/// ever scraped, so every phase runs through the operator-entry path.
pub struct ManualSurface {
    label: String,
}

impl ManualSurface {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl Surface for ManualSurface {
    fn label(&self) -> &str {
        &self.label
    }

    async fn focus(&self) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn deliver(&self, _directive: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::DeliveryFailed {
            surface: self.label.clone(),
            message: "no browser automation in this build".to_string(),
        })
    }

    async fn latest_response(
        &self,
        _timeout: Duration,
    ) -> Result<Option<SurfaceResponse>, SurfaceError> {
        Ok(None)
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<(), SurfaceError> {
        Err(SurfaceError::ScreenshotFailed {
            surface: self.label.clone(),
            path: path.to_path_buf(),
            message: "no browser automation in this build".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_surface_never_automates() {
        let surface = ManualSurface::new("chatgpt");
        assert!(surface.focus().await.is_ok());
        assert!(matches!(
            surface.deliver("prompt").await,
            Err(SurfaceError::DeliveryFailed { .. })
        ));
        assert_eq!(
            surface
                .latest_response(Duration::from_secs(0))
                .await
                .unwrap(),
            None
        );
    }
}
