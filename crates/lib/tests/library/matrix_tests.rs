use std::collections::HashSet;

use buildmatrix_lib::dimension::ValueExclusion;
use buildmatrix_lib::matrix::{Configuration, MatrixGenerator, Shard};

use super::common::dimensions;

#[test]
fn cross_product_size_is_product_of_cardinalities() {
  let set = dimensions(&[
    ("build_type", &["Release", "Debug"]),
    ("arch", &["x86_64", "armv8", "x86"]),
    ("shared", &["True", "False"]),
  ]);
  let configs = MatrixGenerator::new(set).collect_all().unwrap();

  assert_eq!(configs.len(), 12);
  let unique: HashSet<&Configuration> = configs.iter().collect();
  assert_eq!(unique.len(), 12);
}

#[test]
fn excluded_subset_is_subtracted() {
  let mut set = dimensions(&[
    ("build_type", &["Release", "Debug"]),
    ("arch", &["x86_64", "armv8", "x86"]),
    ("shared", &["True", "False"]),
  ]);
  // Matches Debug/x86/True and Debug/x86/False.
  set
    .declare_exclusion(ValueExclusion::new([("build_type", "Debug"), ("arch", "x86")]))
    .unwrap();

  let configs = MatrixGenerator::new(set).collect_all().unwrap();
  assert_eq!(configs.len(), 10);
  assert!(
    !configs
      .iter()
      .any(|c| c.get("build_type") == Some("Debug") && c.get("arch") == Some("x86"))
  );
}

#[test]
fn first_configuration_uses_first_value_of_every_dimension() {
  let set = dimensions(&[("build_type", &["Release", "Debug"]), ("arch", &["x86_64", "armv8"])]);
  let mut iter = MatrixGenerator::new(set).generate();
  let first = iter.next().unwrap().unwrap();
  assert_eq!(first.to_string(), "build_type=Release, arch=x86_64");
  let second = iter.next().unwrap().unwrap();
  assert_eq!(second.to_string(), "build_type=Release, arch=armv8");
}

#[test]
fn configuration_ids_are_stable_and_distinct() {
  let set = dimensions(&[("build_type", &["Release", "Debug"]), ("arch", &["x86_64"])]);
  let generator = MatrixGenerator::new(set);
  let first: Vec<_> = generator.generate().map(|c| c.unwrap().id()).collect();
  let second: Vec<_> = generator.generate().map(|c| c.unwrap().id()).collect();

  assert_eq!(first, second);
  assert_ne!(first[0], first[1]);
  assert_eq!(first[0].0.len(), 12);
}

#[test]
fn shards_partition_a_generated_matrix() {
  let set = dimensions(&[
    ("build_type", &["Release", "Debug"]),
    ("arch", &["x86_64", "armv8", "x86"]),
  ]);
  let configs = MatrixGenerator::new(set).collect_all().unwrap();

  let mut seen = Vec::new();
  for index in 1..=4 {
    let shard: Shard = format!("{}/4", index).parse().unwrap();
    seen.extend(shard.select(configs.iter().cloned()));
  }

  assert_eq!(seen.len(), configs.len());
  let unique: HashSet<_> = seen.into_iter().collect();
  assert_eq!(unique.len(), configs.len());
}
