//! Long-running scheduler.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::cli::runtime::github_router;
use crate::domain::models::{Config, RepoId};
use crate::services::RepoScheduler;

pub async fn execute(config: Config, json_mode: bool) -> Result<()> {
    let repos = config
        .repositories
        .iter()
        .map(|r| RepoId::parse(r))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid repository in configuration")?;
    if repos.is_empty() {
        tracing::warn!("No repositories configured; the scheduler will idle");
    }

    let router = github_router(&config)?;
    let scheduler = RepoScheduler::new(router, Duration::from_secs(config.scheduler.tick_interval_secs));
    let seeded = scheduler.seed(&repos).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;

    if json_mode {
        println!("{}", serde_json::json!({ "stopped": true, "repositories": seeded }));
    } else {
        println!("Scheduler stopped after watching {seeded} repositories.");
    }
    Ok(())
}
