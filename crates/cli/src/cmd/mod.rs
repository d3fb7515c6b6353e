mod list;
mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use buildmatrix_lib::config::{self, MatrixOptions, Overrides};
use buildmatrix_lib::matrix::{MatrixGenerator, Shard};

pub use list::{ListArgs, cmd_list};
pub use run::{RunArgs, cmd_run};

/// Flags that shape the matrix, shared by `run` and `list`.
#[derive(Args, Debug, Default)]
pub struct MatrixArgs {
  /// Recipe file (TOML) declaring dimensions, exclusions and run settings
  #[arg(short, long)]
  pub file: Option<PathBuf>,

  /// Build types, comma separated (e.g. "Release,Debug")
  #[arg(long, value_name = "LIST")]
  pub build_types: Option<String>,

  /// Target architectures, comma separated (e.g. "x86_64,armv8")
  #[arg(long, value_name = "LIST")]
  pub archs: Option<String>,

  /// Extra dimension, repeatable (e.g. "compiler=gcc,clang")
  #[arg(long = "dimension", value_name = "NAME=VALUES")]
  pub dimensions: Vec<String>,

  /// Exclude combinations where every pair matches, repeatable (e.g. "build_type=Debug,arch=armv8")
  #[arg(long = "exclude", value_name = "DIM=VALUE,...")]
  pub exclusions: Vec<String>,

  /// Only handle slice INDEX of TOTAL (1-based, e.g. "2/4")
  #[arg(long, value_name = "INDEX/TOTAL")]
  pub shard: Option<Shard>,
}

impl MatrixArgs {
  pub fn overrides(&self) -> Result<Overrides> {
    let build_types = self
      .build_types
      .as_deref()
      .map(|v| config::parse_list("--build-types", v))
      .transpose()?;
    let archs = self
      .archs
      .as_deref()
      .map(|v| config::parse_list("--archs", v))
      .transpose()?;
    let dimensions = self
      .dimensions
      .iter()
      .map(|d| config::parse_dimension(d))
      .collect::<Result<Vec<_>, _>>()?;
    let exclusions = self
      .exclusions
      .iter()
      .map(|e| config::parse_exclusion(e))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Overrides {
      build_types,
      archs,
      dimensions,
      exclusions,
      shard: self.shard,
      ..Default::default()
    })
  }
}

/// Resolve options from every layer and validate the matrix.
pub fn load_matrix(file: Option<&std::path::Path>, overrides: Overrides) -> Result<(MatrixOptions, MatrixGenerator)> {
  let options = MatrixOptions::load(file, overrides).context("Failed to load matrix options")?;
  let dimensions = options.dimension_set().context("Invalid matrix declaration")?;
  Ok((options, MatrixGenerator::new(dimensions)))
}
