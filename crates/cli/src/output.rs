//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, human-readable durations, and Unicode symbols.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use buildmatrix_lib::schedule::OutcomeStatus;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const SKIPPED: &str = "-";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// First line of `text`, cut to `max` characters.
pub fn summarize(text: &str, max: usize) -> String {
  let line = text.lines().next().unwrap_or_default();
  if line.chars().count() <= max {
    line.to_string()
  } else {
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
  }
}

/// Plain status text for an outcome, padded to `width` characters.
pub fn status_text(status: &OutcomeStatus, width: usize) -> String {
  let text = match status {
    OutcomeStatus::Succeeded => format!("{} ok", symbols::SUCCESS),
    OutcomeStatus::Failed => format!("{} failed", symbols::ERROR),
    OutcomeStatus::Skipped(reason) => format!("{} {}", symbols::SKIPPED, reason),
  };
  format!("{:<width$}", text)
}

/// Colored status column for an outcome. Padding is applied before the
/// color so escape codes do not count towards `width`.
pub fn status_label(status: &OutcomeStatus, width: usize) -> String {
  let text = status_text(status, width);
  match status {
    OutcomeStatus::Succeeded => text.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    OutcomeStatus::Failed => text.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    OutcomeStatus::Skipped(_) => text.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
