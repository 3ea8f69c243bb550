//! Output formatting utilities

use adoption_lib::{ComponentStatus, ConfidenceTier};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a fraction as percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn color_status(status: ComponentStatus) -> String {
    match status {
        ComponentStatus::Healthy => status.as_str().green().to_string(),
        ComponentStatus::Degraded => status.as_str().yellow().to_string(),
        ComponentStatus::Unhealthy => status.as_str().red().to_string(),
    }
}

pub fn color_confidence(confidence: ConfidenceTier) -> String {
    match confidence {
        ConfidenceTier::High => confidence.as_str().green().to_string(),
        ConfidenceTier::Medium => confidence.as_str().yellow().to_string(),
        ConfidenceTier::Low => confidence.as_str().red().to_string(),
    }
}

/// Render a probability with the color of how likely adoption is
pub fn color_probability(probability: f64) -> String {
    let formatted = format_percent(probability);
    if probability >= 0.7 {
        formatted.green().to_string()
    } else if probability >= 0.4 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
