//! Output formatting for CLI
//!
//! Lists print as tables, JSON or YAML; status lines go through the
//! colored helpers below so every command reports the same way.

use clap::ValueEnum;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Lenient parse for the config file; unknown names fall back to table
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Table,
        }
    }
}

/// Print data in the specified format (table, JSON, or YAML)
pub fn print_output<T: Tabled + Serialize>(data: Vec<T>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => print_json(&data)?,
        OutputFormat::Yaml => print_yaml(&data)?,
    }
    Ok(())
}

pub fn print_table<T: Tabled>(data: Vec<T>) {
    if data.is_empty() {
        println!("{}", "No results found".yellow());
        return;
    }
    println!("{}", Table::new(data));
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn print_yaml<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_yaml::to_string(data)?);
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print an error message with red X
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn print_heading(title: &str) {
    println!("{}", title.bold().underline());
}

/// Run `work` behind a spinner; the spinner is hidden when not on a terminal
pub async fn with_spinner<F: Future>(message: &str, work: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = work.await;
    spinner.finish_and_clear();
    output
}

/// Shorten `s` to `max_len` characters with an ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::parse("wide"), OutputFormat::Table);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("node-1", 10), "node-1");
        assert_eq!(truncate("dedicated=gpu:NoSchedule", 12), "dedicated...");
        assert_eq!(truncate("abcdef", 2), "ab");
        assert_eq!(truncate("ünïcödé-taint", 8), "ünïcö...");
    }
}
