//! Terminal output for the CLI

pub mod table;
pub mod theme;

pub use table::migrations_table;
pub use theme::{theme, Theme};

use owo_colors::OwoColorize;

pub struct Icons;

impl Icons {
    pub const CHECK: &'static str = "✅";
    pub const CROSS: &'static str = "❌";
    pub const WARN: &'static str = "⚠️";
    pub const DATABASE: &'static str = "🗄️";
    pub const GEAR: &'static str = "⚙️";
    pub const SKIP: &'static str = "⏭️";
    pub const TREE: &'static str = "🌳";
}

pub fn header(text: &str) {
    println!("{} {}", Icons::TREE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

/// `label: value` line with a dimmed label
pub fn field(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn migration_applied(name: &str) {
    println!("  {} {}", Icons::GEAR.style(theme().success.clone()), name);
}

pub fn migration_skipped(name: &str) {
    println!("  {} {}", Icons::SKIP, name.style(theme().dim.clone()));
}
