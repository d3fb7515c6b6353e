//! Integration tests for the bmx binary.

mod common;
mod list_tests;
mod run_tests;
