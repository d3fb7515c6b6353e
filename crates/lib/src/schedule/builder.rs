//! The builder capability the scheduler dispatches configurations to.
//!
//! The scheduler knows nothing about compilers or package tools: every run
//! receives its builder explicitly, and anything the builder reports as an
//! error becomes a `Failed` outcome.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::matrix::Configuration;

/// Per-dispatch information handed to a builder.
#[derive(Debug, Clone)]
pub struct BuildContext {
  /// Position of the configuration in the scheduler's input.
  pub index: usize,

  /// Fires when the run is cancelled. Builders that can stop early should
  /// watch it and return `BuilderError::Cancelled`.
  pub cancel: CancellationToken,
}

/// What a successful build reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
  pub diagnostics: String,
  pub log_path: Option<PathBuf>,
}

impl BuildReport {
  pub fn new(diagnostics: impl Into<String>) -> Self {
    Self {
      diagnostics: diagnostics.into(),
      log_path: None,
    }
  }

  pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
    self.log_path = Some(path.into());
    self
  }
}

/// Errors a builder can report for one configuration.
#[derive(Debug, Error)]
pub enum BuilderError {
  /// The build ran and failed.
  #[error("{message}")]
  Failed { message: String, log_path: Option<PathBuf> },

  /// The build did not finish within its time limit.
  #[error("timed out after {}", format_timeout(.timeout))]
  TimedOut { timeout: Duration, log_path: Option<PathBuf> },

  /// The build observed cancellation and stopped.
  #[error("build cancelled")]
  Cancelled,

  /// The build command references a dimension the configuration lacks.
  #[error("unknown placeholder '{{{0}}}' in build command")]
  UnknownPlaceholder(String),

  /// I/O error while preparing or running the build.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

fn format_timeout(timeout: &Duration) -> String {
  humantime::format_duration(*timeout).to_string()
}

impl BuilderError {
  pub fn failed(message: impl Into<String>) -> Self {
    BuilderError::Failed {
      message: message.into(),
      log_path: None,
    }
  }

  /// Log written before the failure, if any.
  pub fn log_path(&self) -> Option<&Path> {
    match self {
      BuilderError::Failed { log_path, .. } | BuilderError::TimedOut { log_path, .. } => log_path.as_deref(),
      _ => None,
    }
  }
}

/// Performs one build for one configuration.
///
/// Implementations must not rely on shared mutable state between
/// invocations: several builds run concurrently, each expected to use its
/// own working directory.
pub trait Builder: Send + Sync + 'static {
  fn build(
    &self,
    configuration: &Configuration,
    context: &BuildContext,
  ) -> impl Future<Output = Result<BuildReport, BuilderError>> + Send;
}

impl<B: Builder> Builder for Arc<B> {
  fn build(
    &self,
    configuration: &Configuration,
    context: &BuildContext,
  ) -> impl Future<Output = Result<BuildReport, BuilderError>> + Send {
    (**self).build(configuration, context)
  }
}

/// Adapts a synchronous build function by running it on the blocking pool.
///
/// Blocking builds cannot observe cancellation; if the run is cancelled
/// they are abandoned after the grace period and their result discarded.
pub struct BlockingBuilder<F> {
  func: Arc<F>,
}

impl<F> BlockingBuilder<F>
where
  F: Fn(&Configuration) -> Result<BuildReport, BuilderError> + Send + Sync + 'static,
{
  pub fn new(func: F) -> Self {
    Self { func: Arc::new(func) }
  }
}

impl<F> Builder for BlockingBuilder<F>
where
  F: Fn(&Configuration) -> Result<BuildReport, BuilderError> + Send + Sync + 'static,
{
  fn build(
    &self,
    configuration: &Configuration,
    _context: &BuildContext,
  ) -> impl Future<Output = Result<BuildReport, BuilderError>> + Send {
    let func = Arc::clone(&self.func);
    let configuration = configuration.clone();
    async move {
      tokio::task::spawn_blocking(move || func(&configuration))
        .await
        .map_err(|e| BuilderError::failed(format!("blocking build task failed: {}", e)))?
    }
  }
}
