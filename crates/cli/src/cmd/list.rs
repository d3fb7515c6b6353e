//! Implementation of the `bmx list` command.
//!
//! Prints the configurations a run would build, in build order, without
//! building anything.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use buildmatrix_lib::matrix::Configuration;
use buildmatrix_lib::util::hash::ConfigId;

use super::{MatrixArgs, load_matrix};
use crate::output::{OutputFormat, print_info, print_json, print_stat};

#[derive(Args, Debug)]
pub struct ListArgs {
  #[command(flatten)]
  pub matrix: MatrixArgs,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ListItem {
  index: usize,
  id: ConfigId,
  slug: String,
  configuration: Configuration,
}

pub fn cmd_list(args: ListArgs) -> Result<i32> {
  let (options, generator) = load_matrix(args.matrix.file.as_deref(), args.matrix.overrides()?)?;

  let mut configurations = generator.collect_all().context("Matrix generation failed")?;
  let generated = configurations.len();
  if let Some(shard) = options.shard {
    configurations = shard.select(configurations);
  }

  if args.output.is_json() {
    let items: Vec<ListItem> = configurations
      .into_iter()
      .enumerate()
      .map(|(index, configuration)| ListItem {
        index,
        id: configuration.id(),
        slug: configuration.slug(),
        configuration,
      })
      .collect();
    print_json(&items)?;
    return Ok(0);
  }

  if configurations.is_empty() {
    print_info("Matrix is empty: every combination is excluded.");
    return Ok(0);
  }

  for (index, configuration) in configurations.iter().enumerate() {
    println!("{:>4}  {}  {}", index, configuration.id(), configuration);
  }
  println!();
  print_stat("Configurations", &configurations.len().to_string());
  print_stat("Upper bound", &generator.len_upper_bound().to_string());
  if let Some(shard) = options.shard {
    print_stat("Shard", &format!("{} ({} of {} generated)", shard, configurations.len(), generated));
  }

  Ok(0)
}
