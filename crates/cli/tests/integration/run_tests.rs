#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn run_builds_every_configuration_in_its_own_directory() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "run",
      "--archs",
      "x86_64,armv8",
      "-j",
      "2",
      "--work-dir",
      "out",
      "--command",
      "echo {build_type} > built.txt",
    ])
    .assert()
    .code(0)
    .stdout(predicate::str::contains("All 4 configuration(s) built"));

  let built = std::fs::read_to_string(env.path("out/3-Debug-armv8/built.txt")).unwrap();
  assert_eq!(built.trim(), "Debug");
  assert!(env.path("out/0-Release-x86_64/build.log").exists());
}

#[test]
fn failing_configuration_exits_one() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "run",
      "--work-dir",
      "out",
      "--command",
      "test \"$BMX_BUILD_TYPE\" = Release || { echo 'debug assertions tripped'; exit 4; }",
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("command failed with exit code 4"))
    .stderr(predicate::str::contains("1 of 2 configuration(s) failed"));
}

#[test]
fn fail_fast_from_recipe_skips_remaining() {
  let env = TestEnv::with_recipe(
    r#"
failure_policy = "fail-fast"
build_command = "exit 1"
work_dir = "out"

[[dimension]]
name = "build_type"
values = ["Release", "Debug", "RelWithDebInfo"]
"#,
  );

  let output = env
    .bmx_cmd()
    .args(["run", "--file", "matrix.toml", "-o", "json"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["status"], "some_failed");
  assert_eq!(report["summary"]["failed"], 1);
  assert_eq!(report["summary"]["skipped"], 2);
  assert_eq!(report["outcomes"][2]["reason"], "cancelled");
}

#[test]
fn timeout_fails_the_build() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "run",
      "--build-types",
      "Release",
      "--work-dir",
      "out",
      "--timeout",
      "200ms",
      "--command",
      "sleep 5",
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("timed out after 200ms"));
}

#[test]
fn report_file_is_written() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "run",
      "--work-dir",
      "out",
      "--command",
      "true",
      "--report-file",
      "report.json",
    ])
    .assert()
    .code(0);

  let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(env.path("report.json")).unwrap()).unwrap();
  assert_eq!(report["status"], "all_succeeded");
  assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);
}

#[test]
fn unwritable_report_file_only_warns() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "run",
      "--work-dir",
      "out",
      "--command",
      "true",
      "--report-file",
      "missing/dir/report.json",
    ])
    .assert()
    .code(0)
    .stdout(predicate::str::contains("All 2 configuration(s) built"))
    .stderr(predicate::str::contains("Failed to write report"));
}

#[test]
fn unknown_placeholder_fails_configuration() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args(["run", "--work-dir", "out", "--command", "make {compiler}"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("unknown placeholder '{compiler}'"));
}
