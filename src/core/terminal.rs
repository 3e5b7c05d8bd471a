use std::fmt::Display;

use console::{Emoji, style};

pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
pub static CLIPBOARD: Emoji<'_, '_> = Emoji("📋 ", "");
pub static BULB: Emoji<'_, '_> = Emoji("💡 ", "");
pub static MEMO: Emoji<'_, '_> = Emoji("📝 ", "");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static ID: Emoji<'_, '_> = Emoji("🆔 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏰ ", "");
pub static WRENCH: Emoji<'_, '_> = Emoji("🔧 ", "");

pub fn print_success(msg: impl Display) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_warn(msg: impl Display) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: impl Display) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_step(step: impl Display) {
    println!("{} {}", ROCKET, style(step).bold());
}

pub fn print_status(label: &str, value: impl Display) {
    println!("  {}: {}", style(label).bold().cyan(), value);
}
