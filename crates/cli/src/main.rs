//! refsnap CLI - review recorded references and failed snapshot artifacts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use refsnap::SnapshotConfig;

mod commands;
mod output;

use commands::{artifacts, references, Context};

/// Review snapshot references and failed artifacts
#[derive(Parser)]
#[command(name = "refsnap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory searched for __Snapshots__ directories
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Failed-artifact directory [default: SNAPSHOT_ARTIFACTS, config file or the temp dir]
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Platform subdirectory; pass an empty string for references without one
    #[arg(long, global = true)]
    platform: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recorded references
    List {
        /// Only references of the configured platform
        #[arg(long)]
        current: bool,
    },

    /// List failed artifacts waiting for review
    Pending,

    /// Replace references with their failed artifacts
    Accept(artifacts::Selection),

    /// Delete failed artifacts, keeping the references
    Discard(artifacts::Selection),

    /// Delete every pending failed artifact
    Clean,

    /// Show the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = SnapshotConfig::from_env()?;
    if let Some(artifacts) = cli.artifacts {
        config.artifacts_dir = Some(artifacts);
    }
    if let Some(platform) = cli.platform {
        config.platform = Some(platform).filter(|p| !p.trim().is_empty());
    }
    tracing::debug!(?config, root = %cli.root.display(), "Effective configuration");

    let ctx = Context {
        root: cli.root,
        config,
        format: cli.format,
    };

    match cli.command {
        Commands::List { current } => references::list(&ctx, current)?,
        Commands::Pending => artifacts::pending(&ctx)?,
        Commands::Accept(selection) => artifacts::accept(&ctx, &selection)?,
        Commands::Discard(selection) => artifacts::discard(&ctx, &selection)?,
        Commands::Clean => artifacts::clean(&ctx)?,
        Commands::Config => commands::config::show(&ctx)?,
    }

    Ok(())
}
