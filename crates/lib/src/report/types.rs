//! Types for the final run report.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::schedule::{BuildOutcome, OutcomeStatus};

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
  /// Every configuration built. An empty run also counts.
  AllSucceeded,
  /// At least one configuration failed.
  SomeFailed,
  /// Nothing failed, but the run was stopped before everything built.
  Aborted,
}

impl OverallStatus {
  /// Failed wins over Aborted.
  pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a BuildOutcome>) -> Self {
    let mut aborted = false;
    for outcome in outcomes {
      match outcome.status {
        OutcomeStatus::Failed => return OverallStatus::SomeFailed,
        OutcomeStatus::Skipped(_) => aborted = true,
        OutcomeStatus::Succeeded => {}
      }
    }
    if aborted {
      OverallStatus::Aborted
    } else {
      OverallStatus::AllSucceeded
    }
  }

  /// Process exit code for this status.
  pub fn exit_code(&self) -> i32 {
    match self {
      OverallStatus::AllSucceeded => 0,
      OverallStatus::SomeFailed => 1,
      OverallStatus::Aborted => 130,
    }
  }
}

impl fmt::Display for OverallStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OverallStatus::AllSucceeded => write!(f, "all succeeded"),
      OverallStatus::SomeFailed => write!(f, "some failed"),
      OverallStatus::Aborted => write!(f, "aborted"),
    }
  }
}

/// Outcome counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub total: usize,
  pub succeeded: usize,
  pub failed: usize,
  pub skipped: usize,
}

impl Summary {
  pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a BuildOutcome>) -> Self {
    let mut summary = Summary::default();
    for outcome in outcomes {
      summary.total += 1;
      match outcome.status {
        OutcomeStatus::Succeeded => summary.succeeded += 1,
        OutcomeStatus::Failed => summary.failed += 1,
        OutcomeStatus::Skipped(_) => summary.skipped += 1,
      }
    }
    summary
  }
}

/// Final summary of a run: every outcome, sorted by input index.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
  pub status: OverallStatus,
  pub summary: Summary,
  pub total_duration_ms: u64,
  pub outcomes: Vec<BuildOutcome>,
}

impl Report {
  pub fn new(outcomes: Vec<BuildOutcome>, total_duration: Duration) -> Self {
    Self {
      status: OverallStatus::from_outcomes(&outcomes),
      summary: Summary::from_outcomes(&outcomes),
      total_duration_ms: total_duration.as_millis() as u64,
      outcomes,
    }
  }

  pub fn exit_code(&self) -> i32 {
    self.status.exit_code()
  }

  pub fn summary(&self) -> Summary {
    self.summary
  }

  pub fn total_duration(&self) -> Duration {
    Duration::from_millis(self.total_duration_ms)
  }

  pub fn failures(&self) -> impl Iterator<Item = &BuildOutcome> {
    self.outcomes.iter().filter(|o| o.status.is_failed())
  }
}
