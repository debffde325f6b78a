//! vodcache CLI.
//!
//! Thin command-line surface over the vodcache library: download objects,
//! drive a queue file, inspect the store, and run the range server.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing::debug;
use vodcache::ConfigFile;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "vodcache", version, about = "Offline video chunk store with byte-range playback")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve stored objects over HTTP with byte-range support
    Serve(commands::serve::ServeArgs),

    /// Download a single object into the store
    Download(commands::download::DownloadArgs),

    /// Download every item listed in a queue file, in order
    Queue(commands::queue::QueueArgs),

    /// Inspect and manage stored objects
    #[command(subcommand)]
    Objects(commands::objects::ObjectsAction),

    /// Show or initialize the configuration file
    #[command(subcommand)]
    Config(commands::config::ConfigAction),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = ConfigFile::load().unwrap_or_default();
    let _guard = vodcache::telemetry::init(&config.log_level, config.log_file.as_deref());
    debug!(command = ?cli.command, "dispatching");

    let result: Result<(), CliError> = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &config).await,
        Commands::Download(args) => commands::download::run(args, &config).await,
        Commands::Queue(args) => commands::queue::run(args, &config).await,
        Commands::Objects(action) => commands::objects::run(action, &config).await,
        Commands::Config(action) => commands::config::run(action, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
