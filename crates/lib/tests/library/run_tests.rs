use std::sync::Arc;
use std::time::Duration;

use buildmatrix_lib::matrix::MatrixGenerator;
use buildmatrix_lib::report::OverallStatus;
use buildmatrix_lib::run_matrix;
use buildmatrix_lib::schedule::{BlockingBuilder, BuildReport, BuilderError, CommandBuilder, FailurePolicy};
use tempfile::TempDir;

use super::common::{dimensions, schedule};

#[tokio::test]
async fn blocking_builder_runs_whole_matrix() {
  let set = dimensions(&[("build_type", &["Release", "Debug"]), ("arch", &["x86_64"])]);
  let builder = Arc::new(BlockingBuilder::new(|c: &buildmatrix_lib::matrix::Configuration| {
    std::thread::sleep(Duration::from_millis(10));
    Ok(BuildReport::new(format!("compiled {}", c.slug())))
  }));

  let report = run_matrix(&MatrixGenerator::new(set), None, builder, &schedule(2, FailurePolicy::ContinueOnError))
    .await
    .unwrap();

  assert_eq!(report.status, OverallStatus::AllSucceeded);
  assert_eq!(report.exit_code(), 0);
  assert_eq!(report.outcomes[0].diagnostics, "compiled Release-x86_64");
  assert_eq!(report.outcomes[1].diagnostics, "compiled Debug-x86_64");
}

#[tokio::test]
async fn continue_on_error_reports_every_configuration() {
  let set = dimensions(&[("build_type", &["Release", "Debug"]), ("arch", &["x86_64", "arm64"])]);
  let builder = Arc::new(BlockingBuilder::new(|c: &buildmatrix_lib::matrix::Configuration| {
    if c.get("build_type") == Some("Debug") {
      Err(BuilderError::failed("assertion failed in debug build"))
    } else {
      Ok(BuildReport::default())
    }
  }));

  let report = run_matrix(&MatrixGenerator::new(set), None, builder, &schedule(1, FailurePolicy::ContinueOnError))
    .await
    .unwrap();

  assert_eq!(report.outcomes.len(), 4);
  assert_eq!(report.status, OverallStatus::SomeFailed);
  assert_eq!(report.summary().failed, 2);
  assert_eq!(report.exit_code(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn command_builder_runs_in_isolated_directories() {
  let work = TempDir::new().unwrap();
  let set = dimensions(&[("build_type", &["Release", "Debug"]), ("arch", &["x86_64"])]);
  let builder = Arc::new(CommandBuilder::new(
    "echo {build_type} > artifact.txt && echo \"done $BMX_ARCH\"",
    work.path(),
  ));

  let report = run_matrix(&MatrixGenerator::new(set), None, builder, &schedule(2, FailurePolicy::ContinueOnError))
    .await
    .unwrap();

  assert_eq!(report.status, OverallStatus::AllSucceeded);
  let release = std::fs::read_to_string(work.path().join("0-Release-x86_64/artifact.txt")).unwrap();
  let debug = std::fs::read_to_string(work.path().join("1-Debug-x86_64/artifact.txt")).unwrap();
  assert_eq!(release.trim(), "Release");
  assert_eq!(debug.trim(), "Debug");
  assert_eq!(report.outcomes[0].diagnostics, "done x86_64");
  assert!(report.outcomes[0].log_path.as_ref().unwrap().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn command_builder_fail_fast_skips_the_rest() {
  let work = TempDir::new().unwrap();
  let set = dimensions(&[("build_type", &["Release", "Debug", "RelWithDebInfo"]), ("arch", &["x86_64"])]);
  let builder = Arc::new(CommandBuilder::new("test \"$BMX_BUILD_TYPE\" = Release", work.path()));

  let report = run_matrix(&MatrixGenerator::new(set), None, builder, &schedule(1, FailurePolicy::FailFast))
    .await
    .unwrap();

  assert!(report.outcomes[0].status.is_succeeded());
  assert!(report.outcomes[1].status.is_failed());
  assert!(report.outcomes[1].diagnostics.contains("exit code 1"));
  assert!(report.outcomes[2].status.is_cancelled());
  assert_eq!(report.status, OverallStatus::SomeFailed);
  assert!(!work.path().join("2-RelWithDebInfo-x86_64").exists());
}
