//! Icons prefixed to terminal notifications, with plain-text fallbacks.

use console::Emoji;

pub static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i] ");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ERROR: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[AUTH] ");
