//! End-to-end run: generate, schedule, aggregate.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::dimension::ExclusionRuleError;
use crate::matrix::{MatrixGenerator, Shard};
use crate::report::{Report, aggregate};
use crate::schedule::{self, Builder, ScheduleConfig, ScheduleError};

/// Outcome channel capacity between scheduler and aggregator.
const OUTCOME_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum OrchestrateError {
  /// Generation failed; nothing was built.
  #[error(transparent)]
  Generation(#[from] ExclusionRuleError),

  #[error("scheduler failed: {0}")]
  Schedule(#[from] ScheduleError),
}

/// Build the (optionally sharded) matrix and return the final report.
///
/// The whole matrix is generated before the first build starts, so a
/// failing exclusion rule aborts the run without building anything.
pub async fn run_matrix<B: Builder>(
  generator: &MatrixGenerator,
  shard: Option<Shard>,
  builder: Arc<B>,
  config: &ScheduleConfig,
) -> Result<Report, OrchestrateError> {
  let mut configurations = generator.collect_all()?;
  let generated = configurations.len();
  if let Some(shard) = shard {
    configurations = shard.select(configurations);
  }

  info!(
    generated,
    selected = configurations.len(),
    shard = ?shard.map(|s| s.to_string()),
    "matrix ready"
  );

  let (tx, rx) = mpsc::channel(OUTCOME_BUFFER);
  let (stats, report) = tokio::join!(schedule::run(configurations, builder, config, tx), aggregate(rx));
  stats?;

  info!(status = %report.status, exit_code = report.exit_code(), "run finished");
  Ok(report)
}
