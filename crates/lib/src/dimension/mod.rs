//! Dimensions of build variation and the rules that prune them.
//!
//! This is the declaration phase of a run: axes and exclusion rules are
//! validated here, before anything is generated or built.

mod exclusion;
mod types;

pub use exclusion::{ExclusionRule, ExclusionRuleError, PredicateExclusion, ValueExclusion};
pub use types::{DeclarationError, Dimension, DimensionSet};
