mod args;
mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imgpub_lib::ArchiveTransport;
use imgpub_lib::consts::DEFAULT_ARCHIVE_ROOT;

use crate::args::TargetArgs;
use crate::cmd::{cmd_discover, cmd_publish, cmd_remove};
use crate::output::OutputFormat;

/// imgpub - publish multi-architecture container manifest lists
#[derive(Parser)]
#[command(name = "imgpub")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create a manifest list from local archives and push it to the registry
  Publish {
    #[command(flatten)]
    target: TargetArgs,

    /// Print the tool invocations instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Create and inspect the manifest list, but do not log in or push
    #[arg(long)]
    skip_push: bool,
  },

  /// List the archives a publish would reference
  Discover {
    /// Directory to search for *.tar.gz archives
    #[arg(default_value = DEFAULT_ARCHIVE_ROOT)]
    root: PathBuf,

    /// Transport prefix for each archive reference
    #[arg(long, default_value = "docker-archive")]
    transport: ArchiveTransport,
  },

  /// Remove the local manifest list left behind by an earlier run
  Remove {
    #[command(flatten)]
    target: TargetArgs,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Publish {
      target,
      dry_run,
      skip_push,
    } => cmd_publish(target, dry_run, skip_push, cli.output),
    Commands::Discover { root, transport } => cmd_discover(&root, transport, cli.output),
    Commands::Remove { target } => cmd_remove(target, cli.output),
  }
}
