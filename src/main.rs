use std::sync::Arc;

use clap::{Parser, Subcommand};

mod cli;
mod config;
mod core;
mod error;
mod server;
mod services;
mod signal_handler;
mod utils;

#[cfg(test)]
mod test_utils;

use cli::*;
use config::Config;
use error::{Result, SheetFinderError};
use services::AppServices;

#[derive(Parser)]
#[command(name = "sheet-finder")]
#[command(about = "Search a shared Google Drive folder of sheet music by title, key or lyrics")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP search service
    Serve(serve::ServeArgs),

    /// Run one search and print the matching files
    Search(search::SearchArgs),

    /// List every file in the configured folder
    Index(index::IndexArgs),

    /// Report missing settings and try the credentials
    Check,

    /// Show configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init_logging(cli.verbose).map_err(SheetFinderError::Internal)?;

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            let services = Arc::new(AppServices::new(config)?);
            serve::execute(services).await.map_err(SheetFinderError::Internal)
        }
        Commands::Search(args) => {
            args.apply(&mut config);
            let services = AppServices::new(config)?;
            search::execute(args, &services).await.map_err(SheetFinderError::Internal)
        }
        Commands::Index(args) => {
            let services = AppServices::new(config)?;
            index::execute(args, &services).await.map_err(SheetFinderError::Internal)
        }
        Commands::Check => {
            let services = AppServices::new(config)?;
            check::execute(&services).await.map_err(SheetFinderError::Internal)
        }
        Commands::Config(args) => cli::config::execute(args, &config).await.map_err(SheetFinderError::Internal),
    }
}
