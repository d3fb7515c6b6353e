//! Dimension and dimension-set types.
//!
//! A `DimensionSet` is built during a declaration phase and then handed to
//! the matrix generator by value, after which it can no longer be mutated.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::exclusion::ExclusionRule;

/// Errors raised while declaring dimensions and exclusion rules.
///
/// All of these are fatal at setup time: no build runs once one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
  /// A dimension with this name was already declared.
  #[error("dimension '{0}' is already declared")]
  DuplicateDimension(String),

  /// The dimension was declared without any values.
  #[error("dimension '{0}' has no values")]
  EmptyValueSet(String),

  /// A value appears more than once within one dimension.
  #[error("dimension '{dimension}' lists value '{value}' more than once")]
  DuplicateValue { dimension: String, value: String },

  /// Dimension names must be non-empty and free of surrounding whitespace.
  #[error("invalid dimension name '{0}'")]
  InvalidName(String),

  /// An exclusion rule references a dimension that was never declared.
  #[error("exclusion rule '{rule}' references unknown dimension '{dimension}'")]
  UnknownDimension { rule: String, dimension: String },

  /// An exclusion rule names a value its dimension does not declare.
  #[error("exclusion rule '{rule}' references unknown value '{value}' for dimension '{dimension}'")]
  UnknownValue {
    rule: String,
    dimension: String,
    value: String,
  },

  /// An exclusion rule with no conditions would exclude every configuration.
  #[error("exclusion rule '{0}' has no conditions")]
  EmptyExclusion(String),
}

/// A named axis of build variation with an ordered set of allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
  name: String,
  values: Vec<String>,
}

impl Dimension {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Values in declaration order.
  pub fn values(&self) -> &[String] {
    &self.values
  }

  pub fn contains(&self, value: &str) -> bool {
    self.values.iter().any(|v| v == value)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// The declared axes of a run plus the rules that prune their cross-product.
#[derive(Debug, Clone, Default)]
pub struct DimensionSet {
  dimensions: Vec<Dimension>,
  exclusions: Vec<Arc<dyn ExclusionRule>>,
}

impl DimensionSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a new dimension.
  ///
  /// # Errors
  ///
  /// - `InvalidName` if the name is empty or padded with whitespace
  /// - `DuplicateDimension` if the name is already declared
  /// - `EmptyValueSet` if `values` is empty
  /// - `DuplicateValue` if a value repeats
  pub fn declare<I, S>(&mut self, name: impl Into<String>, values: I) -> Result<&mut Self, DeclarationError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let name = name.into();
    if name.is_empty() || name.trim() != name {
      return Err(DeclarationError::InvalidName(name));
    }
    if self.dimension(&name).is_some() {
      return Err(DeclarationError::DuplicateDimension(name));
    }

    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    if values.is_empty() {
      return Err(DeclarationError::EmptyValueSet(name));
    }

    let mut seen = HashSet::new();
    for value in &values {
      if !seen.insert(value.as_str()) {
        return Err(DeclarationError::DuplicateValue {
          dimension: name,
          value: value.clone(),
        });
      }
    }

    debug!(dimension = %name, values = ?values, "declared dimension");
    self.dimensions.push(Dimension { name, values });
    Ok(self)
  }

  /// Register an exclusion rule.
  ///
  /// Rules may only reference dimensions declared before this call.
  pub fn declare_exclusion<R>(&mut self, rule: R) -> Result<&mut Self, DeclarationError>
  where
    R: ExclusionRule + 'static,
  {
    let rule_name = rule.describe();

    let referenced = rule.dimensions();
    if referenced.is_empty() {
      return Err(DeclarationError::EmptyExclusion(rule_name));
    }

    for dimension in referenced {
      if self.dimension(dimension).is_none() {
        return Err(DeclarationError::UnknownDimension {
          rule: rule_name,
          dimension: dimension.to_string(),
        });
      }
    }

    for (dimension, value) in rule.required_values() {
      let declared = self.dimension(dimension).is_some_and(|d| d.contains(value));
      if !declared {
        return Err(DeclarationError::UnknownValue {
          rule: rule_name,
          dimension: dimension.to_string(),
          value: value.to_string(),
        });
      }
    }

    debug!(rule = %rule_name, "declared exclusion rule");
    self.exclusions.push(Arc::new(rule));
    Ok(self)
  }

  pub fn dimension(&self, name: &str) -> Option<&Dimension> {
    self.dimensions.iter().find(|d| d.name == name)
  }

  /// Dimensions in declaration order.
  pub fn dimensions(&self) -> &[Dimension] {
    &self.dimensions
  }

  pub fn exclusions(&self) -> &[Arc<dyn ExclusionRule>] {
    &self.exclusions
  }

  pub fn len(&self) -> usize {
    self.dimensions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dimensions.is_empty()
  }

  /// Size of the unpruned cross-product (0 when no dimension is declared).
  pub fn cardinality(&self) -> usize {
    if self.dimensions.is_empty() {
      return 0;
    }
    self.dimensions.iter().fold(1usize, |acc, d| acc.saturating_mul(d.len()))
  }
}
