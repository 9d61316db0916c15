//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Operator actions
pub static HAND: Emoji<'_, '_> = Emoji("👉 ", ">>>");
pub static CLIPBOARD: Emoji<'_, '_> = Emoji("📋 ", "[PASTE]");
pub static RETRY: Emoji<'_, '_> = Emoji("🔄 ", "[RETRY]");

// Artifacts
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static ARTICLE: Emoji<'_, '_> = Emoji("📝 ", "");
