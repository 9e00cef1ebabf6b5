mod cli;

use anyhow::Result;
use brewdigest::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brewdigest", version, about = "Local LLM API with a Homebrew new-formula digest")]
struct Cli {
    /// Config file (defaults to ~/.brewdigest/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the formula mirror, start the model runtime and serve HTTP (default)
    Serve,
    /// Run one new-formula digest and print it
    Digest {
        /// Look-back window, e.g. "5 days"
        #[arg(long)]
        since: Option<String>,
    },
    /// Clone or update the mirrored repositories
    Sync,
    /// Manage the model weight file
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Check git, the model file and the mirror
    Doctor,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured GGUF model
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Log to stderr so `digest` output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => brewdigest::server::serve(config).await?,
        Command::Digest { since } => cli::digest::digest(&config, since).await?,
        Command::Sync => {
            tokio::task::spawn_blocking(move || cli::sync::sync(&config)).await??;
        }
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config).await?,
        },
        Command::Doctor => cli::doctor::doctor(&config).await?,
    }

    Ok(())
}
