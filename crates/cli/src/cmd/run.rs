//! Implementation of the `bmx run` command.
//!
//! Builds every configuration of the matrix with the configured shell
//! command and prints the report. The exit code reflects the overall
//! status: 0 all succeeded, 1 some failed, 130 aborted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use buildmatrix_lib::report::{OverallStatus, Report};
use buildmatrix_lib::run_matrix;
use buildmatrix_lib::schedule::CommandBuilder;

use super::{MatrixArgs, load_matrix};
use crate::output::{
  OutputFormat, format_duration, print_error, print_json, print_stat, print_success, print_warning, status_label,
  summarize,
};

/// Widest diagnostic shown in the text table.
const DIAGNOSTIC_WIDTH: usize = 60;

/// Width of the status column in the text table.
const STATUS_WIDTH: usize = 14;

#[derive(Args, Debug)]
pub struct RunArgs {
  #[command(flatten)]
  pub matrix: MatrixArgs,

  /// Maximum number of builds running at once
  #[arg(short = 'j', long, value_name = "N")]
  pub concurrency: Option<usize>,

  /// Stop starting new builds after the first failure
  #[arg(long)]
  pub fail_fast: bool,

  /// Build command run through the shell; "{dimension}" placeholders are expanded
  #[arg(short, long, value_name = "CMD")]
  pub command: Option<String>,

  /// Root for per-configuration working directories
  #[arg(long, value_name = "DIR")]
  pub work_dir: Option<PathBuf>,

  /// Fail builds running longer than this (e.g. "10m", "90s")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,

  /// Time in-flight builds get to stop after Ctrl-C (e.g. "10s")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub grace_period: Option<Duration>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,

  /// Also write the JSON report to this file
  #[arg(long, value_name = "PATH")]
  pub report_file: Option<PathBuf>,
}

pub fn cmd_run(args: RunArgs) -> Result<i32> {
  let mut overrides = args.matrix.overrides()?;
  overrides.concurrency = args.concurrency;
  overrides.fail_fast = args.fail_fast.then_some(true);
  overrides.build_command = args.command.clone();
  overrides.work_dir = args.work_dir.clone();
  overrides.timeout = args.timeout;
  overrides.grace_period = args.grace_period;

  let (options, generator) = load_matrix(args.matrix.file.as_deref(), overrides)?;
  let command = options
    .build_command
    .clone()
    .context("No build command: pass --command or set build_command in the recipe")?;

  let builder = Arc::new(CommandBuilder::new(command, &options.work_dir).with_timeout(options.timeout));
  let cancel = CancellationToken::new();
  let schedule = options.schedule_config(cancel.clone());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(async {
      tokio::spawn(cancel_on_ctrl_c(cancel));
      run_matrix(&generator, options.shard, builder, &schedule).await
    })
    .context("Matrix run failed")?;

  if args.output.is_json() {
    print_json(&report)?;
  } else {
    print_report(&report);
  }

  // The builds already ran; a lost report file does not change the result.
  if let Some(path) = &args.report_file {
    match write_report(&report, path) {
      Ok(()) => info!(path = %path.display(), "report written"),
      Err(e) => print_warning(&format!("{:#}", e)),
    }
  }

  Ok(report.exit_code())
}

fn write_report(report: &Report, path: &Path) -> Result<()> {
  let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
  std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
  if tokio::signal::ctrl_c().await.is_ok() {
    warn!("interrupt received, cancelling run");
    cancel.cancel();
  }
}

fn print_report(report: &Report) {
  for outcome in &report.outcomes {
    println!(
      "{:>4}  {}  {:<40}  {}  {:>8}  {}",
      outcome.index,
      outcome.id,
      outcome.configuration.to_string(),
      status_label(&outcome.status, STATUS_WIDTH),
      format_duration(outcome.duration()),
      summarize(&outcome.diagnostics, DIAGNOSTIC_WIDTH),
    );
  }

  let summary = report.summary();
  println!();
  print_stat("Succeeded", &summary.succeeded.to_string());
  print_stat("Failed", &summary.failed.to_string());
  print_stat("Skipped", &summary.skipped.to_string());
  print_stat("Duration", &format_duration(report.total_duration()));
  println!();

  match report.status {
    OverallStatus::AllSucceeded => print_success(&format!("All {} configuration(s) built", summary.total)),
    OverallStatus::SomeFailed => {
      print_error(&format!("{} of {} configuration(s) failed", summary.failed, summary.total));
      for outcome in report.failures() {
        if let Some(log) = &outcome.log_path {
          eprintln!("    {}: {}", outcome.configuration, log.display());
        }
      }
    }
    OverallStatus::Aborted => print_warning(&format!(
      "Run aborted: {} configuration(s) not built",
      summary.skipped
    )),
  }
}
