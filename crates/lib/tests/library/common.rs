//! Shared helpers for library integration tests.

use std::num::NonZeroUsize;
use std::time::Duration;

use buildmatrix_lib::dimension::DimensionSet;
use buildmatrix_lib::schedule::{FailurePolicy, ScheduleConfig};
use tokio_util::sync::CancellationToken;

/// Dimension set built from `(name, values)` pairs in declaration order.
pub fn dimensions(axes: &[(&str, &[&str])]) -> DimensionSet {
  let mut set = DimensionSet::new();
  for (name, values) in axes {
    set.declare(*name, values.iter().copied()).unwrap();
  }
  set
}

pub fn schedule(concurrency: usize, policy: FailurePolicy) -> ScheduleConfig {
  ScheduleConfig {
    concurrency_limit: NonZeroUsize::new(concurrency).unwrap(),
    failure_policy: policy,
    grace_period: Duration::from_secs(2),
    cancel: CancellationToken::new(),
  }
}
