//! Matrix options: defaults, recipe file, environment and command line.
//!
//! Later layers replace earlier ones: defaults, then the TOML recipe, then
//! `BMX_*` environment variables, then command-line flags. Exclusions are
//! the exception and accumulate across layers.

mod types;

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::consts::{ARCH_DIMENSION, BUILD_TYPE_DIMENSION, ENV_PREFIX};
use crate::dimension::{DimensionSet, ValueExclusion};
use crate::schedule::{FailurePolicy, ScheduleConfig};

pub use types::{ConfigError, DimensionEntry, MatrixOptions, Overrides, RecipeFile};

impl MatrixOptions {
  /// Defaults with the recipe at `path` applied.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let recipe: RecipeFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, dimensions = recipe.dimensions.len(), "loaded recipe");

    let mut options = MatrixOptions::default();
    options.apply_recipe(recipe)?;
    Ok(options)
  }

  /// Resolve every layer: defaults, optional recipe, environment, `cli`.
  pub fn load(recipe: Option<&Path>, cli: Overrides) -> Result<Self, ConfigError> {
    let mut options = match recipe {
      Some(path) => Self::from_file(path)?,
      None => Self::default(),
    };
    options.apply(Overrides::from_env()?)?;
    options.apply(cli)?;
    Ok(options)
  }

  pub fn apply_recipe(&mut self, recipe: RecipeFile) -> Result<(), ConfigError> {
    if !recipe.dimensions.is_empty() {
      self.dimensions = recipe
        .dimensions
        .into_iter()
        .map(|entry| (entry.name, entry.values))
        .collect();
    }
    self
      .exclusions
      .extend(recipe.exclusions.into_iter().map(|table| table.into_iter().collect()));

    if let Some(concurrency) = recipe.concurrency {
      self.concurrency_limit = NonZeroUsize::new(concurrency).ok_or(ConfigError::ZeroConcurrency)?;
    }
    if let Some(policy) = recipe.failure_policy {
      self.failure_policy = policy;
    }
    if recipe.build_command.is_some() {
      self.build_command = recipe.build_command;
    }
    if let Some(work_dir) = recipe.work_dir {
      self.work_dir = work_dir;
    }
    if let Some(secs) = recipe.timeout_secs {
      self.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(secs) = recipe.grace_period_secs {
      self.grace_period = Duration::from_secs(secs);
    }
    Ok(())
  }

  /// Apply one override layer.
  pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
    if let Some(values) = overrides.build_types {
      self.set_dimension(BUILD_TYPE_DIMENSION, values);
    }
    if let Some(values) = overrides.archs {
      self.set_dimension(ARCH_DIMENSION, values);
    }
    for (name, values) in overrides.dimensions {
      self.set_dimension(&name, values);
    }
    self.exclusions.extend(overrides.exclusions);

    if let Some(concurrency) = overrides.concurrency {
      self.concurrency_limit = NonZeroUsize::new(concurrency).ok_or(ConfigError::ZeroConcurrency)?;
    }
    if let Some(fail_fast) = overrides.fail_fast {
      self.failure_policy = if fail_fast {
        FailurePolicy::FailFast
      } else {
        FailurePolicy::ContinueOnError
      };
    }
    if overrides.build_command.is_some() {
      self.build_command = overrides.build_command;
    }
    if let Some(work_dir) = overrides.work_dir {
      self.work_dir = work_dir;
    }
    if overrides.timeout.is_some() {
      self.timeout = overrides.timeout;
    }
    if let Some(grace_period) = overrides.grace_period {
      self.grace_period = grace_period;
    }
    if overrides.shard.is_some() {
      self.shard = overrides.shard;
    }
    Ok(())
  }

  /// Replace a dimension's values in place, or append a new dimension.
  pub fn set_dimension(&mut self, name: &str, values: Vec<String>) {
    match self.dimensions.iter_mut().find(|(n, _)| n == name) {
      Some((_, existing)) => {
        for old in existing.iter().filter(|v| !values.contains(v)) {
          self.narrowed.insert((name.to_string(), old.clone()));
        }
        for value in &values {
          self.narrowed.remove(&(name.to_string(), value.clone()));
        }
        *existing = values;
      }
      None => self.dimensions.push((name.to_string(), values)),
    }
  }

  /// Declare every dimension and exclusion, validating them.
  ///
  /// Exclusion conditions are put in dimension declaration order. An
  /// exclusion naming a value that a later layer narrowed away is dropped.
  pub fn dimension_set(&self) -> Result<DimensionSet, ConfigError> {
    let mut set = DimensionSet::new();
    for (name, values) in &self.dimensions {
      set.declare(name.as_str(), values.iter().map(String::as_str))?;
    }
    for conditions in &self.exclusions {
      if let Some((dimension, value)) = conditions.iter().find(|c| self.narrowed.contains(*c)) {
        debug!(dimension = %dimension, value = %value, "dropping exclusion for a value no longer in the matrix");
        continue;
      }
      let mut conditions = conditions.clone();
      conditions.sort_by_key(|(name, _)| self.declaration_position(name));
      set.declare_exclusion(ValueExclusion::new(conditions))?;
    }
    Ok(set)
  }

  fn declaration_position(&self, dimension: &str) -> usize {
    self
      .dimensions
      .iter()
      .position(|(name, _)| name == dimension)
      .unwrap_or(usize::MAX)
  }

  pub fn schedule_config(&self, cancel: CancellationToken) -> ScheduleConfig {
    ScheduleConfig {
      concurrency_limit: self.concurrency_limit,
      failure_policy: self.failure_policy,
      grace_period: self.grace_period,
      cancel,
    }
  }
}

impl Overrides {
  /// Read `BMX_BUILD_TYPES`, `BMX_ARCHS`, `BMX_CONCURRENCY` and
  /// `BMX_FAIL_FAST`.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut overrides = Overrides::default();

    if let Some(value) = env_var("BUILD_TYPES") {
      overrides.build_types = Some(parse_list(&env_key("BUILD_TYPES"), &value)?);
    }
    if let Some(value) = env_var("ARCHS") {
      overrides.archs = Some(parse_list(&env_key("ARCHS"), &value)?);
    }
    if let Some(value) = env_var("CONCURRENCY") {
      let concurrency = value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::invalid(env_key("CONCURRENCY"), e.to_string()))?;
      overrides.concurrency = Some(concurrency);
    }
    if let Some(value) = env_var("FAIL_FAST") {
      overrides.fail_fast = Some(parse_bool(&env_key("FAIL_FAST"), &value)?);
    }

    Ok(overrides)
  }
}

fn env_key(suffix: &str) -> String {
  format!("{}{}", ENV_PREFIX, suffix)
}

fn env_var(suffix: &str) -> Option<String> {
  std::env::var(env_key(suffix)).ok()
}

/// Parse a comma separated list such as `Release,Debug`.
pub fn parse_list(key: &str, value: &str) -> Result<Vec<String>, ConfigError> {
  let items: Vec<String> = value.split(',').map(|item| item.trim().to_string()).collect();
  if items.iter().any(String::is_empty) {
    return Err(ConfigError::invalid(key, format!("malformed list '{}'", value)));
  }
  Ok(items)
}

/// Parse `name=a,b` into a dimension declaration.
pub fn parse_dimension(value: &str) -> Result<(String, Vec<String>), ConfigError> {
  let (name, values) = value
    .split_once('=')
    .ok_or_else(|| ConfigError::invalid("dimension", format!("expected NAME=VALUE[,VALUE...], got '{}'", value)))?;
  let name = name.trim();
  if name.is_empty() {
    return Err(ConfigError::invalid("dimension", format!("missing name in '{}'", value)));
  }
  Ok((name.to_string(), parse_list(name, values)?))
}

/// Parse `k=v,k=v` into the conditions of a value exclusion.
pub fn parse_exclusion(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
  value
    .split(',')
    .map(|pair| {
      let (k, v) = pair
        .split_once('=')
        .ok_or_else(|| ConfigError::invalid("exclude", format!("expected DIM=VALUE, got '{}'", pair.trim())))?;
      let (k, v) = (k.trim(), v.trim());
      if k.is_empty() || v.is_empty() {
        return Err(ConfigError::invalid("exclude", format!("expected DIM=VALUE, got '{}'", pair.trim())));
      }
      Ok((k.to_string(), v.to_string()))
    })
    .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    other => Err(ConfigError::invalid(key, format!("expected a boolean, got '{}'", other))),
  }
}
