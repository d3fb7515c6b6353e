//! A single point in the build matrix.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::util::hash::{ConfigId, Hashable};

/// One concrete selection of a value for every declared dimension.
///
/// Values are kept in dimension declaration order. A configuration is
/// immutable once created and is used as an identity key, so it is `Hash`
/// and `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
  values: Vec<(String, String)>,
}

impl Configuration {
  /// Create a configuration from `(dimension, value)` pairs in order.
  ///
  /// The matrix generator is the normal source of configurations; this is
  /// also useful for builders and tests that need one directly.
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }

  /// Value selected for a dimension.
  pub fn get(&self, dimension: &str) -> Option<&str> {
    self
      .values
      .iter()
      .find(|(name, _)| name == dimension)
      .map(|(_, value)| value.as_str())
  }

  /// `(dimension, value)` pairs in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Stable short id derived from the canonical form.
  pub fn id(&self) -> ConfigId {
    self.compute_id()
  }

  /// Filesystem-safe label, e.g. `Release-x86_64`.
  pub fn slug(&self) -> String {
    if self.values.is_empty() {
      return "default".to_string();
    }
    self
      .values
      .iter()
      .map(|(_, value)| sanitize(value))
      .collect::<Vec<_>>()
      .join("-")
  }
}

fn sanitize(value: &str) -> String {
  value
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

impl Hashable for Configuration {
  fn canonical_form(&self) -> String {
    self
      .values
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

impl fmt::Display for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (name, value) in &self.values {
      if !first {
        write!(f, ", ")?;
      }
      write!(f, "{}={}", name, value)?;
      first = false;
    }
    Ok(())
  }
}

impl Serialize for Configuration {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(self.values.iter().map(|(k, v)| (k, v)))
  }
}
