//! One-off sweep of a single repository.

use anyhow::{bail, Result};
use clap::Args;

use crate::cli::output::output;
use crate::cli::runtime::github_router;
use crate::domain::models::{Config, RepoId, Trigger};
use crate::services::RouteOutcome;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Repository as owner/name
    pub repo: String,

    /// Report every decision without changing the repository
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: SweepArgs, mut config: Config, json_mode: bool) -> Result<()> {
    let repo = RepoId::parse(&args.repo)?;
    config.dry_run |= args.dry_run;

    let router = github_router(&config)?;
    let outcome = router.handle(Trigger::Sweep { repo }).await;
    output(&outcome, json_mode);

    if let RouteOutcome::Failed { reason, .. } = outcome {
        bail!("sweep failed: {reason}");
    }
    Ok(())
}
