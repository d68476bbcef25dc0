//! Output formatting utilities

use anyhow::Result;
use chrono::NaiveDate;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format, the payload as served
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a notice when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Whole-unit value, "-" when it was not measured
pub fn format_total(total: Option<i64>, unit: &str) -> String {
    match total {
        Some(total) => format!("{} {}", total, unit),
        None => "-".to_string(),
    }
}

/// Fraction in [0, 1] as a percentage
pub fn format_percent(fraction: Option<f64>) -> String {
    match fraction {
        Some(fraction) => format!("{:.0}%", fraction * 100.0),
        None => "-".to_string(),
    }
}

/// Percentage colored by load: red from 80%, yellow from 60%
pub fn color_percent(fraction: Option<f64>) -> String {
    let formatted = format_percent(fraction);
    match fraction {
        Some(f) if f >= 0.8 => formatted.red().to_string(),
        Some(f) if f >= 0.6 => formatted.yellow().to_string(),
        Some(_) => formatted.green().to_string(),
        None => formatted.dimmed().to_string(),
    }
}

/// `2024-06-27` as `2024-06-27 Thu`; unparseable input is returned as is
pub fn format_day(day: &str) -> String {
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d %a").to_string(),
        Err(_) => day.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(Some(48), "Cores"), "48 Cores");
        assert_eq!(format_total(None, "GB"), "-");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(0.88)), "88%");
        assert_eq!(format_percent(Some(0.0)), "0%");
        assert_eq!(format_percent(None), "-");
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day("2024-06-27"), "2024-06-27 Thu");
        assert_eq!(format_day("yesterday"), "yesterday");
    }
}
