//! buildmatrix-lib: build-matrix generation and execution
//!
//! This crate provides the pieces behind the `bmx` command:
//! - `DimensionSet`: axes of variation and exclusion rules
//! - `MatrixGenerator`: the ordered, pruned cross-product of configurations
//! - `schedule::run`: bounded-concurrency execution through a `Builder`
//! - `Report`: the aggregated outcome of a run
//! - `MatrixOptions`: recipe file, environment and command-line settings

pub mod config;
pub mod consts;
pub mod dimension;
pub mod matrix;
pub mod orchestrate;
pub mod report;
pub mod schedule;
pub mod util;

pub use orchestrate::{OrchestrateError, run_matrix};
