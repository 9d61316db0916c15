//! Chromium-backed surface over the DevTools protocol.
//!
//! Each surface gets its own browser process with a persistent profile, so
//! logins survive between sessions.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{Surface, SurfaceResponse};
use crate::errors::SurfaceError;
use crate::flow_config::{BrowserSection, SurfaceConfig};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Empties a textarea or contenteditable input and lets the page see the change.
const CLEAR_INPUT_JS: &str = "function() { \
    if ('value' in this) { this.value = ''; } else { this.textContent = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

/// One insertion of the whole directive. No key events are sent, so line
/// breaks never submit the form and any script can be inserted.
fn insert_directive(directive: &str) -> InsertTextParams {
    InsertTextParams::new(directive)
}

/// Switches that keep sites from treating the session as automated.
const DEFAULT_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-infobars",
];

pub struct BrowserSurface {
    label: String,
    input_area: String,
    latest_response: String,
    page: Page,
    _browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSurface {
    /// Launch a browser for `surface` and navigate to its base URL.
    pub async fn launch(
        surface: &SurfaceConfig,
        browser: &BrowserSection,
    ) -> Result<Self, SurfaceError> {
        let label = surface.label();
        let unavailable = |message: String| SurfaceError::Unavailable {
            surface: label.clone(),
            message,
        };

        let mut builder = BrowserConfig::builder();
        if !browser.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &surface.user_data_dir {
            let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
            builder = builder.user_data_dir(dir);
        }
        if let Some(exe) = &browser.executable {
            builder = builder.chrome_executable(exe);
        }
        for arg in DEFAULT_ARGS
            .iter()
            .map(|a| a.to_string())
            .chain(browser.args.iter().cloned())
        {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(unavailable)?;

        tracing::info!(surface = %label, url = %surface.url, "Launching browser");
        let (chrome, mut events) = Browser::launch(config)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = chrome
            .new_page(surface.url.as_str())
            .await
            .map_err(|e| unavailable(format!("failed to open {}: {}", surface.url, e)))?;

        Ok(Self {
            label,
            input_area: surface.input_area.clone(),
            latest_response: surface.latest_response.clone(),
            page,
            _browser: chrome,
            handler,
        })
    }

    async fn last_response_element(&self) -> Option<Element> {
        if self.latest_response.trim().is_empty() {
            return None;
        }
        self.page
            .find_elements(self.latest_response.as_str())
            .await
            .ok()?
            .pop()
    }
}

impl Drop for BrowserSurface {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Surface for BrowserSurface {
    fn label(&self) -> &str {
        &self.label
    }

    async fn focus(&self) -> Result<(), SurfaceError> {
        self.page
            .bring_to_front()
            .await
            .map(|_| ())
            .map_err(|e| SurfaceError::Unavailable {
                surface: self.label.clone(),
                message: e.to_string(),
            })
    }

    async fn deliver(&self, directive: &str) -> Result<(), SurfaceError> {
        let failed = |message: String| SurfaceError::DeliveryFailed {
            surface: self.label.clone(),
            message,
        };
        if self.input_area.trim().is_empty() {
            return Err(failed("no input_area selector configured".to_string()));
        }

        let input = self
            .page
            .find_element(self.input_area.as_str())
            .await
            .map_err(|e| failed(e.to_string()))?;
        input
            .call_js_fn(CLEAR_INPUT_JS, false)
            .await
            .map_err(|e| failed(format!("could not clear input: {}", e)))?;
        input.click().await.map_err(|e| failed(e.to_string()))?;
        self.page
            .execute(insert_directive(directive))
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    async fn latest_response(
        &self,
        timeout: Duration,
    ) -> Result<Option<SurfaceResponse>, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.last_response_element().await
                && let Ok(Some(text)) = element.inner_text().await
                && !text.trim().is_empty()
            {
                return Ok(Some(SurfaceResponse::new(text)));
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                tracing::debug!(surface = %self.label, "response poll timed out");
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<(), SurfaceError> {
        let failed = |message: String| SurfaceError::ScreenshotFailed {
            surface: self.label.clone(),
            path: path.to_path_buf(),
            message,
        };
        let element = self
            .last_response_element()
            .await
            .ok_or_else(|| failed("no response element".to_string()))?;
        element
            .save_screenshot(CaptureScreenshotFormat::Png, path)
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }
}
