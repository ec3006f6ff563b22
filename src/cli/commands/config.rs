//! Repository configuration commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::output;
use crate::domain::models::{ItemKind, RepoId, RepositoryConfig};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Parse a stale.yml and print the effective configuration
    Check {
        /// Path to the document
        file: PathBuf,

        /// Show the configuration applied to pull requests instead of issues
        #[arg(long)]
        pulls: bool,
    },
}

pub async fn execute(args: ConfigArgs, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Check { file, pulls } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let config = RepositoryConfig::from_yaml(RepoId::new("local", "check"), &text)
                .with_context(|| format!("Invalid configuration in {}", file.display()))?;
            let kind = if pulls { ItemKind::PullRequest } else { ItemKind::Issue };
            output(&config.for_kind(kind), json_mode);
            Ok(())
        }
    }
}
