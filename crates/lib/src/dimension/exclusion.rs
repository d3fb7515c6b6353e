//! Exclusion rules that prune configurations from the matrix.
//!
//! A rule is evaluated against every candidate configuration during
//! generation; a match removes the candidate entirely.

use std::fmt;

use thiserror::Error;

use crate::matrix::Configuration;

/// A rule failed while being evaluated. Aborts generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("exclusion rule '{rule}' failed: {message}")]
pub struct ExclusionRuleError {
  pub rule: String,
  pub message: String,
}

/// A predicate over a configuration that marks it invalid.
pub trait ExclusionRule: fmt::Debug + Send + Sync {
  /// Human-readable name used in logs and errors.
  fn describe(&self) -> String;

  /// Dimension names this rule reads. Checked at declaration time.
  fn dimensions(&self) -> Vec<&str>;

  /// `(dimension, value)` pairs that must exist for the rule to be meaningful.
  fn required_values(&self) -> Vec<(&str, &str)> {
    Vec::new()
  }

  /// Returns `true` when the configuration must be excluded.
  fn matches(&self, configuration: &Configuration) -> Result<bool, ExclusionRuleError>;
}

/// Excludes configurations where every listed `dimension=value` pair holds.
///
/// `ValueExclusion::new([("build_type", "Debug"), ("arch", "arm64")])`
/// removes only the `Debug`/`arm64` combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExclusion {
  conditions: Vec<(String, String)>,
}

impl ValueExclusion {
  pub fn new<I, K, V>(conditions: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      conditions: conditions.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }

  pub fn conditions(&self) -> &[(String, String)] {
    &self.conditions
  }
}

impl ExclusionRule for ValueExclusion {
  fn describe(&self) -> String {
    self
      .conditions
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join(" AND ")
  }

  fn dimensions(&self) -> Vec<&str> {
    self.conditions.iter().map(|(k, _)| k.as_str()).collect()
  }

  fn required_values(&self) -> Vec<(&str, &str)> {
    self.conditions.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
  }

  fn matches(&self, configuration: &Configuration) -> Result<bool, ExclusionRuleError> {
    Ok(
      self
        .conditions
        .iter()
        .all(|(k, v)| configuration.get(k) == Some(v.as_str())),
    )
  }
}

type Predicate = dyn Fn(&Configuration) -> Result<bool, String> + Send + Sync;

/// Excludes configurations for which an arbitrary predicate returns `true`.
///
/// The predicate reports evaluation problems as `Err(message)`, which
/// surfaces as an `ExclusionRuleError`.
pub struct PredicateExclusion {
  name: String,
  dimensions: Vec<String>,
  predicate: Box<Predicate>,
}

impl PredicateExclusion {
  pub fn new<I, S, F>(name: impl Into<String>, dimensions: I, predicate: F) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn(&Configuration) -> Result<bool, String> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      dimensions: dimensions.into_iter().map(Into::into).collect(),
      predicate: Box::new(predicate),
    }
  }
}

impl fmt::Debug for PredicateExclusion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PredicateExclusion")
      .field("name", &self.name)
      .field("dimensions", &self.dimensions)
      .finish_non_exhaustive()
  }
}

impl ExclusionRule for PredicateExclusion {
  fn describe(&self) -> String {
    self.name.clone()
  }

  fn dimensions(&self) -> Vec<&str> {
    self.dimensions.iter().map(String::as_str).collect()
  }

  fn matches(&self, configuration: &Configuration) -> Result<bool, ExclusionRuleError> {
    (self.predicate)(configuration).map_err(|message| ExclusionRuleError {
      rule: self.name.clone(),
      message,
    })
  }
}
