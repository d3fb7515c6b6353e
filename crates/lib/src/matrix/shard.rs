//! Splitting a matrix across CI jobs.
//!
//! A shard `i/n` (1-based) selects the configurations whose zero-based
//! matrix position `p` satisfies `p % n == i - 1`. Because generation order
//! is stable, every shard of the same matrix sees a disjoint slice and the
//! union of all shards is the full matrix.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
  #[error("invalid shard '{0}': expected INDEX/TOTAL, e.g. 1/4")]
  Malformed(String),

  #[error("shard total must be at least 1")]
  ZeroTotal,

  #[error("shard index {index} out of range 1..={total}")]
  IndexOutOfRange { index: usize, total: usize },
}

/// One slice of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shard {
  index: usize,
  total: usize,
}

impl Shard {
  pub fn new(index: usize, total: usize) -> Result<Self, ShardError> {
    if total == 0 {
      return Err(ShardError::ZeroTotal);
    }
    if index == 0 || index > total {
      return Err(ShardError::IndexOutOfRange { index, total });
    }
    Ok(Self { index, total })
  }

  /// 1-based shard index.
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn total(&self) -> usize {
    self.total
  }

  /// Whether the configuration at matrix position `position` belongs here.
  pub fn contains(&self, position: usize) -> bool {
    position % self.total == self.index - 1
  }

  /// Keep only the items that belong to this shard, preserving order.
  pub fn select<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
    items
      .into_iter()
      .enumerate()
      .filter(|(position, _)| self.contains(*position))
      .map(|(_, item)| item)
      .collect()
  }
}

impl fmt::Display for Shard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.index, self.total)
  }
}

impl FromStr for Shard {
  type Err = ShardError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (index, total) = s.split_once('/').ok_or_else(|| ShardError::Malformed(s.to_string()))?;
    let index = index
      .trim()
      .parse::<usize>()
      .map_err(|_| ShardError::Malformed(s.to_string()))?;
    let total = total
      .trim()
      .parse::<usize>()
      .map_err(|_| ShardError::Malformed(s.to_string()))?;
    Shard::new(index, total)
  }
}
