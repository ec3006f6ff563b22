//! Command-line interface.

pub mod commands;
pub mod output;
pub mod runtime;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigArgs;
use commands::event::EventArgs;
use commands::sweep::SweepArgs;

#[derive(Parser, Debug)]
#[command(name = "stalebot")]
#[command(about = "Marks, unmarks and closes inactive issues and pull requests", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Application config file (defaults to .stalebot/config.yaml + local.yaml)
    #[arg(short, long, global = true, env = "STALEBOT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed the schedule from config and sweep due repositories until Ctrl-C
    Run,

    /// Sweep one repository now
    Sweep(SweepArgs),

    /// Route one webhook payload
    Event(EventArgs),

    /// Inspect repository configuration documents
    Config(ConfigArgs),
}

/// Print an error in the selected format and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "chain": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
