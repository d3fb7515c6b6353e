//! Test utilities for buildmatrix-lib.
//!
//! `ScriptedBuilder` lets scheduler tests decide per configuration what a
//! build does, and records how many builds ran at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dimension::DimensionSet;
use crate::matrix::{Configuration, MatrixGenerator};
use crate::schedule::{BuildContext, BuildReport, Builder, BuilderError};

/// What a scripted build does.
#[derive(Debug, Clone, Copy)]
pub enum Step {
  Succeed(Duration),
  Fail(Duration, &'static str),
  Panic,
  /// Runs until cancelled, then reports `BuilderError::Cancelled`.
  WaitForCancel,
  /// Ignores cancellation and sleeps for the given time.
  Stubborn(Duration),
}

type Script = dyn Fn(&Configuration) -> Step + Send + Sync;

pub struct ScriptedBuilder {
  script: Box<Script>,
  running: AtomicUsize,
  peak: AtomicUsize,
  started: Mutex<Vec<usize>>,
}

impl ScriptedBuilder {
  pub fn new(script: impl Fn(&Configuration) -> Step + Send + Sync + 'static) -> Arc<Self> {
    Arc::new(Self {
      script: Box::new(script),
      running: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
      started: Mutex::new(Vec::new()),
    })
  }

  /// Every build succeeds after `delay`.
  pub fn succeeding(delay: Duration) -> Arc<Self> {
    Self::new(move |_| Step::Succeed(delay))
  }

  /// Highest number of builds observed running at once.
  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }

  /// Indices of dispatched configurations in start order.
  pub fn started(&self) -> Vec<usize> {
    self.started.lock().unwrap().clone()
  }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

impl Builder for ScriptedBuilder {
  fn build(
    &self,
    configuration: &Configuration,
    context: &BuildContext,
  ) -> impl Future<Output = Result<BuildReport, BuilderError>> + Send {
    async move {
      self.started.lock().unwrap().push(context.index);
      let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
      let _guard = RunningGuard(&self.running);

      match (self.script)(configuration) {
        Step::Succeed(delay) => {
          tokio::time::sleep(delay).await;
          Ok(BuildReport::new(format!("built {}", configuration.slug())))
        }
        Step::Fail(delay, message) => {
          tokio::time::sleep(delay).await;
          Err(BuilderError::failed(message))
        }
        Step::Panic => panic!("scripted panic for {}", configuration),
        Step::WaitForCancel => {
          context.cancel.cancelled().await;
          Err(BuilderError::Cancelled)
        }
        Step::Stubborn(delay) => {
          tokio::time::sleep(delay).await;
          Ok(BuildReport::new("finished late"))
        }
      }
    }
  }
}

/// `build_type` x `arch` matrix with the given values.
pub fn matrix(build_types: &[&str], archs: &[&str]) -> Vec<Configuration> {
  let mut set = DimensionSet::new();
  set
    .declare("build_type", build_types.iter().copied())
    .unwrap()
    .declare("arch", archs.iter().copied())
    .unwrap();
  MatrixGenerator::new(set).collect_all().unwrap()
}
