//! CLI smoke tests for bmx.
//!
//! These tests verify that the commands run without panicking and return
//! the documented exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the bmx binary, isolated from BMX_* settings.
fn bmx_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("bmx");
  for var in ["BMX_BUILD_TYPES", "BMX_ARCHS", "BMX_CONCURRENCY", "BMX_FAIL_FAST", "RUST_LOG"] {
    cmd.env_remove(var);
  }
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  bmx_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  bmx_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("bmx"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["run", "list"] {
    bmx_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn unknown_subcommand_fails() {
  bmx_cmd().arg("explode").assert().failure();
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn list_defaults_to_release_and_debug_on_x86_64() {
  bmx_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("build_type=Release, arch=x86_64"))
    .stdout(predicate::str::contains("build_type=Debug, arch=x86_64"));
}

#[test]
fn run_without_command_is_a_setup_error() {
  let temp = TempDir::new().unwrap();
  bmx_cmd()
    .current_dir(temp.path())
    .arg("run")
    .assert()
    .code(2)
    .stderr(predicate::str::contains("No build command"));
}

#[cfg(unix)]
#[test]
fn run_default_matrix_succeeds() {
  let temp = TempDir::new().unwrap();
  bmx_cmd()
    .current_dir(temp.path())
    .args(["run", "--command", "true"])
    .assert()
    .code(0)
    .stdout(predicate::str::contains("All 2 configuration(s) built"));
}
