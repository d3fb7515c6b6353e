mod cmd;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{ListArgs, RunArgs, cmd_list, cmd_run};
use crate::output::print_error;

/// Exit code for problems found before any build started.
const SETUP_ERROR_EXIT: i32 = 2;

/// bmx - build a project across a matrix of configurations
#[derive(Parser)]
#[command(name = "bmx")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every configuration of the matrix
  Run(RunArgs),

  /// Print the configurations that would be built
  List(ListArgs),
}

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Run(args) => cmd_run(args),
    Commands::List(args) => cmd_list(args),
  };

  match result {
    Ok(code) => std::process::exit(code),
    Err(e) => {
      print_error(&format!("{:#}", e));
      std::process::exit(SETUP_ERROR_EXIT);
    }
  }
}
