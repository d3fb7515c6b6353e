//! Integration tests for buildmatrix-lib.

mod common;
mod matrix_tests;
mod run_tests;
