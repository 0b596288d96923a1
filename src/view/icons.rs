//! Emoji shared by the terminal views, with plain-text fallbacks.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "[..]");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
