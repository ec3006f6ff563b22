//! Stalebot CLI entry point.

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use stalebot::cli::commands;
use stalebot::cli::{handle_error, Cli, Commands};
use stalebot::domain::models::Config;
use stalebot::infrastructure::config::ConfigLoader;
use stalebot::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

/// Load application config and install logging. The logger must outlive the command.
fn bootstrap(path: Option<&Path>) -> Result<(Config, LoggerImpl)> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;
    Ok((config, logger))
}

async fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, json).await,
        Commands::Run => {
            let (config, _logger) = bootstrap(config_path)?;
            commands::run::execute(config, json).await
        }
        Commands::Sweep(args) => {
            let (config, _logger) = bootstrap(config_path)?;
            commands::sweep::execute(args, config, json).await
        }
        Commands::Event(args) => {
            let (config, _logger) = bootstrap(config_path)?;
            commands::event::execute(args, config, json).await
        }
    }
}
