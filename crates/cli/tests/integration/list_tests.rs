use predicates::prelude::*;

use super::common::TestEnv;

const RECIPE: &str = r#"
[[dimension]]
name = "build_type"
values = ["Release", "Debug"]

[[dimension]]
name = "arch"
values = ["x86_64", "armv8"]

[[exclude]]
build_type = "Debug"
arch = "armv8"
"#;

#[test]
fn list_applies_recipe_exclusions() {
  let env = TestEnv::with_recipe(RECIPE);

  env
    .bmx_cmd()
    .args(["list", "--file", "matrix.toml"])
    .assert()
    .success()
    .stdout(predicate::str::contains("build_type=Release, arch=armv8"))
    .stdout(predicate::str::contains("build_type=Debug, arch=armv8").not())
    .stdout(predicate::str::contains("Configurations: 3"));
}

#[test]
fn list_json_is_ordered() {
  let env = TestEnv::empty();

  let output = env
    .bmx_cmd()
    .args(["list", "--build-types", "Release,Debug", "--archs", "x86_64,armv8", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let slugs: Vec<&str> = items
    .as_array()
    .unwrap()
    .iter()
    .map(|item| item["slug"].as_str().unwrap())
    .collect();
  assert_eq!(slugs, vec!["Release-x86_64", "Release-armv8", "Debug-x86_64", "Debug-armv8"]);
  assert_eq!(items[0]["configuration"]["build_type"], "Release");
}

#[test]
fn list_extra_dimension_and_exclude_flags() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args([
      "list",
      "--dimension",
      "compiler=gcc,clang",
      "--exclude",
      "build_type=Debug,compiler=clang",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("build_type=Release, arch=x86_64, compiler=clang"))
    .stdout(predicate::str::contains("build_type=Debug, arch=x86_64, compiler=clang").not())
    .stdout(predicate::str::contains("Configurations: 3"));
}

#[test]
fn list_shard_selects_slice() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .args(["list", "--shard", "2/2"])
    .assert()
    .success()
    .stdout(predicate::str::contains("build_type=Debug, arch=x86_64"))
    .stdout(predicate::str::contains("build_type=Release").not());
}

#[test]
fn environment_overrides_defaults() {
  let env = TestEnv::empty();

  env
    .bmx_cmd()
    .env("BMX_ARCHS", "armv8")
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("build_type=Release, arch=armv8"))
    .stdout(predicate::str::contains("x86_64").not());
}

#[test]
fn invalid_inputs_exit_with_setup_error() {
  let env = TestEnv::with_recipe("concurency = 2\n");

  env
    .bmx_cmd()
    .args(["list", "--file", "matrix.toml"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("Failed to load matrix options"));

  env
    .bmx_cmd()
    .args(["list", "--exclude", "compiler=gcc"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("Invalid matrix declaration"));

  env.bmx_cmd().args(["list", "--shard", "3/2"]).assert().failure();
}
