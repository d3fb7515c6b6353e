//! Types for matrix execution.
//!
//! This module defines the failure policy, scheduler configuration, the
//! per-configuration outcome record, and the scheduler's error type.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::consts::DEFAULT_GRACE_PERIOD;
use crate::matrix::Configuration;
use crate::util::hash::ConfigId;

/// What to do with the rest of the matrix once a build fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
  /// Stop dispatching new configurations after the first failure.
  /// Builds already running finish and keep their real outcome.
  FailFast,
  /// Build every configuration regardless of earlier failures.
  #[default]
  ContinueOnError,
}

impl fmt::Display for FailurePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailurePolicy::FailFast => write!(f, "fail-fast"),
      FailurePolicy::ContinueOnError => write!(f, "continue-on-error"),
    }
  }
}

impl FromStr for FailurePolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "fail-fast" => Ok(FailurePolicy::FailFast),
      "continue-on-error" => Ok(FailurePolicy::ContinueOnError),
      other => Err(format!(
        "unknown failure policy '{}' (expected fail-fast or continue-on-error)",
        other
      )),
    }
  }
}

/// Why a configuration was recorded without a real build result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// Never started, interrupted, or abandoned because the run was stopped,
  /// either by external cancellation or by the fail-fast policy.
  Cancelled,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::Cancelled => write!(f, "cancelled"),
    }
  }
}

/// Final status of one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutcomeStatus {
  Succeeded,
  Failed,
  Skipped(SkipReason),
}

impl OutcomeStatus {
  pub fn is_succeeded(&self) -> bool {
    matches!(self, OutcomeStatus::Succeeded)
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, OutcomeStatus::Failed)
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, OutcomeStatus::Skipped(SkipReason::Cancelled))
  }
}

impl fmt::Display for OutcomeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutcomeStatus::Succeeded => write!(f, "succeeded"),
      OutcomeStatus::Failed => write!(f, "failed"),
      OutcomeStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
    }
  }
}

/// The recorded result of attempting one configuration.
///
/// Created by the scheduler exactly once per input configuration and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
  /// Position of the configuration in the scheduler's input.
  pub index: usize,

  /// Stable content id of the configuration.
  pub id: ConfigId,

  pub configuration: Configuration,

  #[serde(flatten)]
  pub status: OutcomeStatus,

  /// Wall time spent in the builder (0 for configurations never started).
  pub duration_ms: u64,

  /// Builder output summary or the reason for failure/skip.
  pub diagnostics: String,

  /// Full build log, when the builder wrote one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_path: Option<PathBuf>,
}

impl BuildOutcome {
  fn new(
    index: usize,
    configuration: Configuration,
    status: OutcomeStatus,
    duration: Duration,
    diagnostics: String,
    log_path: Option<PathBuf>,
  ) -> Self {
    Self {
      index,
      id: configuration.id(),
      configuration,
      status,
      duration_ms: duration.as_millis() as u64,
      diagnostics,
      log_path,
    }
  }

  pub fn succeeded(
    index: usize,
    configuration: Configuration,
    duration: Duration,
    diagnostics: String,
    log_path: Option<PathBuf>,
  ) -> Self {
    Self::new(
      index,
      configuration,
      OutcomeStatus::Succeeded,
      duration,
      diagnostics,
      log_path,
    )
  }

  pub fn failed(
    index: usize,
    configuration: Configuration,
    duration: Duration,
    diagnostics: String,
    log_path: Option<PathBuf>,
  ) -> Self {
    Self::new(index, configuration, OutcomeStatus::Failed, duration, diagnostics, log_path)
  }

  pub fn skipped(
    index: usize,
    configuration: Configuration,
    reason: SkipReason,
    duration: Duration,
    diagnostics: impl Into<String>,
  ) -> Self {
    Self::new(
      index,
      configuration,
      OutcomeStatus::Skipped(reason),
      duration,
      diagnostics.into(),
      None,
    )
  }

  pub fn duration(&self) -> Duration {
    Duration::from_millis(self.duration_ms)
  }
}

/// Configuration for a scheduler run.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
  /// Maximum number of builder invocations running at once.
  pub concurrency_limit: NonZeroUsize,

  pub failure_policy: FailurePolicy,

  /// How long in-flight builds may keep running after cancellation before
  /// they are abandoned.
  pub grace_period: Duration,

  /// External cancellation signal. Child tokens are handed to builders.
  pub cancel: CancellationToken,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      concurrency_limit: num_cpus(),
      failure_policy: FailurePolicy::default(),
      grace_period: DEFAULT_GRACE_PERIOD,
      cancel: CancellationToken::new(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> NonZeroUsize {
  std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Counters describing what a scheduler run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
  pub dispatched: usize,
  pub succeeded: usize,
  pub failed: usize,
  pub skipped: usize,
  /// In-flight builds given up on after the cancellation grace period.
  pub abandoned: usize,
}

impl ScheduleStats {
  pub(crate) fn record(&mut self, status: &OutcomeStatus) {
    match status {
      OutcomeStatus::Succeeded => self.succeeded += 1,
      OutcomeStatus::Failed => self.failed += 1,
      OutcomeStatus::Skipped(_) => self.skipped += 1,
    }
  }

  /// Number of outcomes emitted.
  pub fn total(&self) -> usize {
    self.succeeded + self.failed + self.skipped
  }
}

/// Errors that stop the scheduler itself. Build failures are never errors
/// at this level; they are `Failed` outcomes.
#[derive(Debug, Error)]
pub enum ScheduleError {
  /// The outcome consumer went away before the run finished.
  #[error("outcome receiver dropped before the run finished")]
  ReceiverDropped,

  /// The admission gate was closed while dispatching.
  #[error("admission gate closed")]
  GateClosed,
}
