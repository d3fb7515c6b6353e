//! Result aggregation.
//!
//! Collects the outcome stream of a run into a `Report`. Aggregation is
//! pure: nothing is written anywhere, callers decide how to present or
//! persist the report.

mod types;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::schedule::BuildOutcome;

pub use types::{OverallStatus, Report, Summary};

/// Incrementally builds a `Report`.
#[derive(Debug)]
pub struct Aggregator {
  outcomes: BTreeMap<usize, BuildOutcome>,
  started: Instant,
}

impl Default for Aggregator {
  fn default() -> Self {
    Self::new()
  }
}

impl Aggregator {
  pub fn new() -> Self {
    Self {
      outcomes: BTreeMap::new(),
      started: Instant::now(),
    }
  }

  /// Record one outcome. The first outcome for an index wins; later ones
  /// are ignored with a warning and `false` is returned.
  pub fn record(&mut self, outcome: BuildOutcome) -> bool {
    match self.outcomes.entry(outcome.index) {
      Entry::Vacant(slot) => {
        slot.insert(outcome);
        true
      }
      Entry::Occupied(existing) => {
        warn!(
          index = outcome.index,
          kept = %existing.get().status,
          ignored = %outcome.status,
          "duplicate outcome for configuration ignored"
        );
        false
      }
    }
  }

  pub fn len(&self) -> usize {
    self.outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outcomes.is_empty()
  }

  pub fn finish(self) -> Report {
    let report = Report::new(self.outcomes.into_values().collect(), self.started.elapsed());
    debug!(status = %report.status, total = report.summary.total, "report finished");
    report
  }
}

/// Consume outcomes until the channel closes.
pub async fn aggregate(mut outcomes: mpsc::Receiver<BuildOutcome>) -> Report {
  let mut aggregator = Aggregator::new();
  while let Some(outcome) = outcomes.recv().await {
    aggregator.record(outcome);
  }
  aggregator.finish()
}
