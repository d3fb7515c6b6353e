//! Matrix generation.
//!
//! Turns a validated `DimensionSet` into the ordered sequence of
//! configurations to build. Ordering is part of the contract: dimensions
//! iterate in declaration order with the last declared dimension varying
//! fastest, values in declared order (odometer order). Downstream tooling
//! such as CI sharding relies on this being stable across runs.

mod configuration;
mod shard;

use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::dimension::{DimensionSet, ExclusionRuleError};

pub use configuration::Configuration;
pub use shard::{Shard, ShardError};

/// Generates configurations from an immutable dimension set.
///
/// Taking the set by value ends its declaration phase.
#[derive(Debug, Clone)]
pub struct MatrixGenerator {
  dimensions: Arc<DimensionSet>,
}

impl MatrixGenerator {
  pub fn new(dimensions: DimensionSet) -> Self {
    Self {
      dimensions: Arc::new(dimensions),
    }
  }

  pub fn dimensions(&self) -> &DimensionSet {
    &self.dimensions
  }

  /// Lazily enumerate the pruned cross-product from scratch.
  ///
  /// Every call restarts the enumeration and yields the same sequence. An
  /// exclusion rule that fails to evaluate is yielded as an error and ends
  /// the sequence.
  pub fn generate(&self) -> MatrixIter {
    MatrixIter::new(Arc::clone(&self.dimensions))
  }

  /// Materialize the whole matrix, stopping at the first rule error.
  pub fn collect_all(&self) -> Result<Vec<Configuration>, ExclusionRuleError> {
    let configurations: Vec<Configuration> = self.generate().collect::<Result<_, _>>()?;
    debug!(
      generated = configurations.len(),
      upper_bound = self.len_upper_bound(),
      "matrix generated"
    );
    Ok(configurations)
  }

  /// Number of candidates before exclusion rules are applied.
  pub fn len_upper_bound(&self) -> usize {
    self.dimensions.cardinality()
  }
}

/// Odometer-style iterator over the cross-product.
#[derive(Debug)]
pub struct MatrixIter {
  dimensions: Arc<DimensionSet>,
  cursor: Vec<usize>,
  done: bool,
}

impl MatrixIter {
  fn new(dimensions: Arc<DimensionSet>) -> Self {
    let done = dimensions.is_empty();
    let cursor = vec![0; dimensions.len()];
    Self {
      dimensions,
      cursor,
      done,
    }
  }

  fn current(&self) -> Configuration {
    Configuration::from_pairs(
      self
        .dimensions
        .dimensions()
        .iter()
        .zip(&self.cursor)
        .map(|(dimension, &i)| (dimension.name(), dimension.values()[i].as_str())),
    )
  }

  /// Step the cursor; marks the iterator done after the last combination.
  fn advance(&mut self) {
    let dims = self.dimensions.dimensions();
    for pos in (0..self.cursor.len()).rev() {
      self.cursor[pos] += 1;
      if self.cursor[pos] < dims[pos].len() {
        return;
      }
      self.cursor[pos] = 0;
    }
    self.done = true;
  }
}

impl Iterator for MatrixIter {
  type Item = Result<Configuration, ExclusionRuleError>;

  fn next(&mut self) -> Option<Self::Item> {
    while !self.done {
      let candidate = self.current();
      self.advance();

      let mut excluded = false;
      for rule in self.dimensions.exclusions() {
        match rule.matches(&candidate) {
          Ok(true) => {
            trace!(configuration = %candidate, rule = %rule.describe(), "configuration excluded");
            excluded = true;
            break;
          }
          Ok(false) => {}
          Err(e) => {
            self.done = true;
            return Some(Err(e));
          }
        }
      }

      if !excluded {
        return Some(Ok(candidate));
      }
    }
    None
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    if self.done {
      (0, Some(0))
    } else {
      (0, Some(self.dimensions.cardinality()))
    }
  }
}

impl FusedIterator for MatrixIter {}
