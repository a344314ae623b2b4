//! Ragway CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `ingest`: Split and embed documents, report what was indexed
//! - `chat`: Interactive chat or single-message mode

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod session;
mod startup;

#[derive(Parser)]
#[command(
    name = "ragway",
    about = "Ragway — a retrieval-augmented assistant for your own documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (includes model requests and responses)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.ragway/config.toml
    #[arg(short, long, global = true, env = "RAGWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Ingest documents and report segment and embedding counts
    Ingest {
        /// Files or directories to ingest; defaults to the configured sources
        paths: Vec<PathBuf>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| ragway_config::AppConfig::config_dir().join("config.toml"));

    match cli.command {
        Commands::Init { force } => commands::init::run(&config_path, force)?,
        Commands::Ingest { paths, json } => commands::ingest::run(&config_path, paths, json).await?,
        Commands::Chat { message } => commands::chat::run(&config_path, message).await?,
    }

    Ok(())
}
