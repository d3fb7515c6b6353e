//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the recipe, the
/// working directories and the report file.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Create with `matrix.toml` holding `recipe`.
  pub fn with_recipe(recipe: &str) -> Self {
    let env = Self::empty();
    env.write_file("matrix.toml", recipe);
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Get a pre-configured Command for the bmx binary.
  ///
  /// Runs inside the temp directory with every `BMX_*` override removed.
  pub fn bmx_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("bmx");
    cmd.current_dir(self.temp.path());
    for var in ["BMX_BUILD_TYPES", "BMX_ARCHS", "BMX_CONCURRENCY", "BMX_FAIL_FAST", "RUST_LOG"] {
      cmd.env_remove(var);
    }
    cmd
  }
}
