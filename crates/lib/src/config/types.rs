//! Types for matrix options and recipe files.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::consts::{
  ARCH_DIMENSION, BUILD_TYPE_DIMENSION, DEFAULT_ARCHS, DEFAULT_BUILD_TYPES, DEFAULT_GRACE_PERIOD, DEFAULT_WORK_DIR,
};
use crate::dimension::DeclarationError;
use crate::matrix::Shard;
use crate::schedule::FailurePolicy;

/// Errors while loading or validating matrix options.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid value for {key}: {message}")]
  InvalidValue { key: String, message: String },

  #[error("concurrency must be at least 1")]
  ZeroConcurrency,

  #[error(transparent)]
  Declaration(#[from] DeclarationError),
}

impl ConfigError {
  pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
    ConfigError::InvalidValue {
      key: key.into(),
      message: message.into(),
    }
  }
}

/// On-disk recipe, e.g. `matrix.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeFile {
  pub concurrency: Option<usize>,
  pub failure_policy: Option<FailurePolicy>,
  pub build_command: Option<String>,
  pub work_dir: Option<PathBuf>,
  pub timeout_secs: Option<u64>,
  pub grace_period_secs: Option<u64>,

  #[serde(default, rename = "dimension")]
  pub dimensions: Vec<DimensionEntry>,

  /// Each table lists `dimension = "value"` pairs that must all match.
  #[serde(default, rename = "exclude")]
  pub exclusions: Vec<BTreeMap<String, String>>,
}

/// One `[[dimension]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionEntry {
  pub name: String,
  pub values: Vec<String>,
}

/// Layer of settings applied on top of the recipe: the environment or the
/// command line. `None`/empty means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub build_types: Option<Vec<String>>,
  pub archs: Option<Vec<String>>,
  /// Dimensions to add, or to replace by name.
  pub dimensions: Vec<(String, Vec<String>)>,
  /// Value exclusions appended to the recipe's.
  pub exclusions: Vec<Vec<(String, String)>>,
  pub concurrency: Option<usize>,
  pub fail_fast: Option<bool>,
  pub build_command: Option<String>,
  pub work_dir: Option<PathBuf>,
  pub timeout: Option<Duration>,
  pub grace_period: Option<Duration>,
  pub shard: Option<Shard>,
}

/// Complete, validated options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixOptions {
  /// Dimensions in declaration order.
  pub dimensions: Vec<(String, Vec<String>)>,
  pub exclusions: Vec<Vec<(String, String)>>,
  /// `(dimension, value)` pairs a later layer removed. Exclusions naming
  /// one of them no longer apply.
  pub narrowed: BTreeSet<(String, String)>,
  pub concurrency_limit: NonZeroUsize,
  pub failure_policy: FailurePolicy,
  pub build_command: Option<String>,
  pub work_dir: PathBuf,
  pub timeout: Option<Duration>,
  pub grace_period: Duration,
  pub shard: Option<Shard>,
}

impl Default for MatrixOptions {
  fn default() -> Self {
    Self {
      dimensions: vec![
        (BUILD_TYPE_DIMENSION.to_string(), to_strings(DEFAULT_BUILD_TYPES)),
        (ARCH_DIMENSION.to_string(), to_strings(DEFAULT_ARCHS)),
      ],
      exclusions: Vec::new(),
      narrowed: BTreeSet::new(),
      concurrency_limit: NonZeroUsize::MIN,
      failure_policy: FailurePolicy::ContinueOnError,
      build_command: None,
      work_dir: PathBuf::from(DEFAULT_WORK_DIR),
      timeout: None,
      grace_period: DEFAULT_GRACE_PERIOD,
      shard: None,
    }
  }
}

fn to_strings(values: &[&str]) -> Vec<String> {
  values.iter().map(|v| v.to_string()).collect()
}
