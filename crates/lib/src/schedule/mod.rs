//! Matrix execution.
//!
//! The scheduler takes the configurations to build, dispatches them to a
//! `Builder` with bounded concurrency, and emits exactly one `BuildOutcome`
//! per configuration on the outcome channel.
//!
//! # Stopping a run
//!
//! Two things stop dispatch early:
//! - external cancellation through `ScheduleConfig::cancel`
//! - the first `Failed` outcome under `FailurePolicy::FailFast`
//!
//! In both cases configurations not yet dispatched are recorded as
//! `Skipped(Cancelled)`. After a fail-fast stop, in-flight builds run to
//! completion and keep their real outcome. After cancellation, in-flight
//! builds get `grace_period` to finish; the ones still running are then
//! abandoned, recorded as `Skipped(Cancelled)`, and any result they produce
//! later is discarded.

mod builder;
mod command;
mod types;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::matrix::Configuration;

pub use builder::{BlockingBuilder, BuildContext, BuildReport, Builder, BuilderError};
pub use command::{CommandBuilder, env_var_name};
pub use types::{BuildOutcome, FailurePolicy, OutcomeStatus, ScheduleConfig, ScheduleError, ScheduleStats, SkipReason};

/// Why dispatch stopped before the input was exhausted.
#[derive(Debug)]
enum Halt {
  Cancelled,
  FailFast(Configuration),
}

impl Halt {
  fn skip_note(&self) -> String {
    match self {
      Halt::Cancelled => "not started: run cancelled".to_string(),
      Halt::FailFast(trigger) => format!("not started: fail-fast after {} failed", trigger),
    }
  }
}

/// What a build task hands back. The admission permit travels with the
/// outcome so the next build is only admitted once this one is settled.
type Finished = (usize, BuildOutcome, OwnedSemaphorePermit);

/// Bookkeeping for dispatched builds and emitted outcomes.
struct Tracker {
  in_flight: BTreeMap<usize, (Configuration, Instant)>,
  stats: ScheduleStats,
  policy: FailurePolicy,
  outcomes: mpsc::Sender<BuildOutcome>,
}

impl Tracker {
  async fn emit(&mut self, outcome: BuildOutcome) -> Result<(), ScheduleError> {
    self.stats.record(&outcome.status);
    self
      .outcomes
      .send(outcome)
      .await
      .map_err(|_| ScheduleError::ReceiverDropped)
  }

  /// Record a finished task. Returns the configuration that should trigger
  /// a fail-fast stop, if any.
  ///
  /// The task's permit is released when this returns, after the fail-fast
  /// decision has been made.
  async fn settle(&mut self, joined: Result<Finished, JoinError>) -> Result<Option<Configuration>, ScheduleError> {
    let (index, outcome, _permit) = match joined {
      Ok(done) => done,
      Err(e) => {
        // The in-flight entry stays and is reported once the run drains.
        error!(error = %e, "build task ended abnormally");
        return Ok(None);
      }
    };

    if self.in_flight.remove(&index).is_none() {
      debug!(index, "discarding result of abandoned build");
      return Ok(None);
    }

    match &outcome.status {
      OutcomeStatus::Succeeded => {
        info!(configuration = %outcome.configuration, duration = ?outcome.duration(), "build succeeded")
      }
      OutcomeStatus::Failed => {
        error!(
          configuration = %outcome.configuration,
          error = %first_line(&outcome.diagnostics),
          "build failed"
        )
      }
      OutcomeStatus::Skipped(reason) => {
        warn!(configuration = %outcome.configuration, reason = %reason, "build stopped")
      }
    }

    let trigger = (self.policy == FailurePolicy::FailFast && outcome.status.is_failed())
      .then(|| outcome.configuration.clone());
    self.emit(outcome).await?;
    Ok(trigger)
  }

  /// Give up on every build still running.
  async fn abandon_in_flight(&mut self, grace_period: Duration) -> Result<(), ScheduleError> {
    let abandoned = std::mem::take(&mut self.in_flight);
    for (index, (configuration, started)) in abandoned {
      warn!(configuration = %configuration, "abandoning build after grace period");
      self.stats.abandoned += 1;
      let note = format!(
        "abandoned: still running {} after cancellation",
        humantime::format_duration(grace_period)
      );
      self
        .emit(BuildOutcome::skipped(
          index,
          configuration,
          SkipReason::Cancelled,
          started.elapsed(),
          note,
        ))
        .await?;
    }
    Ok(())
  }
}

/// Build every configuration and stream the outcomes.
///
/// Returns once every configuration has exactly one outcome on `outcomes`.
/// Build failures never make this function fail; it only errors when the
/// outcome receiver goes away or the admission gate breaks.
pub async fn run<B, I>(
  configurations: I,
  builder: Arc<B>,
  config: &ScheduleConfig,
  outcomes: mpsc::Sender<BuildOutcome>,
) -> Result<ScheduleStats, ScheduleError>
where
  B: Builder,
  I: IntoIterator<Item = Configuration>,
{
  info!(
    concurrency = config.concurrency_limit.get(),
    policy = %config.failure_policy,
    "starting matrix execution"
  );

  let gate = Arc::new(Semaphore::new(config.concurrency_limit.get()));
  let mut join_set: JoinSet<Finished> = JoinSet::new();
  let mut tracker = Tracker {
    in_flight: BTreeMap::new(),
    stats: ScheduleStats::default(),
    policy: config.failure_policy,
    outcomes,
  };
  let mut pending = configurations.into_iter().enumerate().peekable();
  let mut halt: Option<Halt> = None;

  // Dispatch phase.
  while halt.is_none() && pending.peek().is_some() {
    tokio::select! {
      biased;

      _ = config.cancel.cancelled() => {
        warn!("cancellation requested, no further builds will start");
        halt = Some(Halt::Cancelled);
      }

      Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
        if let Some(trigger) = tracker.settle(joined).await? {
          warn!(configuration = %trigger, "fail-fast: no further builds will start");
          halt = Some(Halt::FailFast(trigger));
        }
      }

      permit = Arc::clone(&gate).acquire_owned() => {
        let permit = permit.map_err(|_| ScheduleError::GateClosed)?;
        let Some((index, configuration)) = pending.next() else {
          break;
        };

        debug!(index, configuration = %configuration, "dispatching build");
        tracker.in_flight.insert(index, (configuration.clone(), Instant::now()));
        tracker.stats.dispatched += 1;

        let builder = Arc::clone(&builder);
        let context = BuildContext {
          index,
          cancel: config.cancel.child_token(),
        };

        join_set.spawn(async move {
          let started = Instant::now();
          let result = AssertUnwindSafe(builder.build(&configuration, &context))
            .catch_unwind()
            .await;
          (index, into_outcome(index, configuration, started.elapsed(), result), permit)
        });
      }
    }
  }

  if let Some(halt) = &halt {
    let note = halt.skip_note();
    let mut skipped = 0usize;
    for (index, configuration) in pending.by_ref() {
      tracker
        .emit(BuildOutcome::skipped(
          index,
          configuration,
          SkipReason::Cancelled,
          Duration::ZERO,
          note.clone(),
        ))
        .await?;
      skipped += 1;
    }
    if skipped > 0 {
      info!(skipped, "recorded undispatched configurations as skipped");
    }
  }

  // Drain phase. Cancellation starts the grace period.
  let mut deadline: Option<Instant> = None;
  while !join_set.is_empty() {
    tokio::select! {
      biased;

      _ = config.cancel.cancelled(), if deadline.is_none() => {
        info!(
          in_flight = tracker.in_flight.len(),
          grace_period = %humantime::format_duration(config.grace_period),
          "waiting for in-flight builds to stop"
        );
        deadline = Some(Instant::now() + config.grace_period);
      }

      _ = sleep_until(deadline) => {
        join_set.abort_all();
        tracker.abandon_in_flight(config.grace_period).await?;
        // Late results are dropped here.
        while join_set.join_next().await.is_some() {}
      }

      Some(joined) = join_set.join_next() => {
        tracker.settle(joined).await?;
      }
    }
  }

  // Tasks that died without reporting still need an outcome.
  for (index, (configuration, started)) in std::mem::take(&mut tracker.in_flight) {
    tracker
      .emit(BuildOutcome::failed(
        index,
        configuration,
        started.elapsed(),
        "build task ended without reporting a result".to_string(),
        None,
      ))
      .await?;
  }

  let stats = tracker.stats;
  info!(
    dispatched = stats.dispatched,
    succeeded = stats.succeeded,
    failed = stats.failed,
    skipped = stats.skipped,
    abandoned = stats.abandoned,
    "matrix execution complete"
  );

  Ok(stats)
}

type BuildResult = Result<Result<BuildReport, BuilderError>, Box<dyn Any + Send>>;

fn into_outcome(index: usize, configuration: Configuration, elapsed: Duration, result: BuildResult) -> BuildOutcome {
  match result {
    Ok(Ok(report)) => BuildOutcome::succeeded(index, configuration, elapsed, report.diagnostics, report.log_path),
    Ok(Err(BuilderError::Cancelled)) => {
      BuildOutcome::skipped(index, configuration, SkipReason::Cancelled, elapsed, "build cancelled")
    }
    Ok(Err(e)) => {
      let log_path = e.log_path().map(Path::to_path_buf);
      BuildOutcome::failed(index, configuration, elapsed, e.to_string(), log_path)
    }
    Err(payload) => BuildOutcome::failed(
      index,
      configuration,
      elapsed,
      format!("builder panicked: {}", panic_message(payload.as_ref())),
      None,
    ),
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

fn first_line(text: &str) -> &str {
  text.lines().next().unwrap_or_default()
}

async fn sleep_until(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}
