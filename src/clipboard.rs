//! System clipboard access for prompts the operator may need to paste by hand.

use anyhow::{Context, Result};
use std::sync::Mutex;

/// Destination for prompt text.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<()>;
}

/// The desktop clipboard through `arboard`.
///
/// The handle is kept open for the whole session; on X11 the copied text is
/// only served while its owner is alive.
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    /// Open the clipboard. A headless machine yields a handle whose `copy` fails.
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::debug!(error = %e, "Clipboard unavailable");
                None
            }
        };
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Clipboard lock poisoned"))?;
        let clipboard = guard.as_mut().context("No clipboard available")?;
        clipboard
            .set_text(text.to_string())
            .context("Failed to copy prompt to the clipboard")
    }
}

/// Keeps every copied text in memory.
#[derive(Default)]
pub struct MemoryClipboard {
    copies: Mutex<Vec<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything copied so far, oldest first.
    pub fn copies(&self) -> Vec<String> {
        self.copies.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        self.copies
            .lock()
            .map_err(|_| anyhow::anyhow!("Clipboard lock poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}
