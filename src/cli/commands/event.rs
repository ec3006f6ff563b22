//! Route a stored webhook delivery, e.g. one captured from GitHub's
//! "Recent Deliveries" page.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::github::parse_webhook;
use crate::cli::output::output;
use crate::cli::runtime::github_router;
use crate::domain::models::{Config, Trigger};

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Webhook event name (X-GitHub-Event), e.g. issue_comment
    #[arg(long)]
    pub kind: String,

    /// File holding the JSON payload
    #[arg(long)]
    pub payload: PathBuf,
}

pub async fn execute(args: EventArgs, config: Config, json_mode: bool) -> Result<()> {
    let body = tokio::fs::read_to_string(&args.payload)
        .await
        .with_context(|| format!("Failed to read payload {}", args.payload.display()))?;
    let event = parse_webhook(&args.kind, &body).context("Invalid webhook payload")?;

    let router = github_router(&config)?;
    let outcome = router.handle(Trigger::Activity(event)).await;
    output(&outcome, json_mode);
    Ok(())
}
