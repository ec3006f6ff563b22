//! Wiring of the production object graph.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::github::{GitHubClient, GitHubPlatform};
use crate::adapters::memory::InMemoryScheduleStore;
use crate::domain::models::Config;
use crate::domain::ports::SystemClock;
use crate::services::{EventRouter, RouterSettings};

/// Router backed by the GitHub API, an in-memory schedule and the system clock.
pub fn github_router(config: &Config) -> Result<Arc<EventRouter>> {
    let client = GitHubClient::from_config(config).context("Failed to build GitHub client")?;
    let platform = Arc::new(GitHubPlatform::new(client));

    Ok(Arc::new(EventRouter::new(
        platform,
        Arc::new(InMemoryScheduleStore::new()),
        Arc::new(SystemClock),
        RouterSettings::from_config(config),
    )))
}
