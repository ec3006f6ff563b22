//! Per-repository configuration resolution.
//!
//! Fetches the committed stale document, resolves it against defaults and
//! decides whether the repository is processed at all. A repository without
//! a readable document is disabled and dropped from the visit schedule.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RepoId, RepositoryConfig, CONFIG_PATH};
use crate::domain::ports::{IssuePlatform, ScheduleStore};

pub struct ConfigResolver {
    platform: Arc<dyn IssuePlatform>,
    schedule: Arc<dyn ScheduleStore>,
    dry_run: bool,
}

impl ConfigResolver {
    pub fn new(platform: Arc<dyn IssuePlatform>, schedule: Arc<dyn ScheduleStore>) -> Self {
        Self {
            platform,
            schedule,
            dry_run: false,
        }
    }

    /// Force report-only mode for every repository this resolver serves.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve the effective configuration. Never fails: any retrieval or
    /// parse problem yields the disabled sentinel and deactivates the
    /// repository's schedule entry.
    pub async fn resolve(&self, repo: &RepoId) -> RepositoryConfig {
        match self.load(repo).await {
            Ok(config) if self.dry_run => config.into_dry_run(),
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "Stale configuration unavailable, disabling repository");
                self.deactivate(repo).await;
                RepositoryConfig::disabled(repo.clone())
            }
        }
    }

    async fn load(&self, repo: &RepoId) -> DomainResult<RepositoryConfig> {
        let unavailable = |reason: String| DomainError::ConfigurationUnavailable {
            repo: repo.clone(),
            reason,
        };

        let content = match self.platform.get_config_content(repo, CONFIG_PATH).await {
            Ok(Some(content)) => content,
            Ok(None) => return Err(unavailable(format!("{CONFIG_PATH} not found"))),
            Err(DomainError::ConfigurationUnavailable { reason, .. }) => return Err(unavailable(reason)),
            Err(e) => return Err(unavailable(e.to_string())),
        };

        let config = RepositoryConfig::from_yaml(repo.clone(), &content)
            .map_err(|e| unavailable(e.to_string()))?;

        tracing::debug!(
            repo = %repo,
            stale_label = %config.stale_label,
            days_until_stale = config.days_until_stale,
            days_until_close = ?config.days_until_close,
            perform = config.perform,
            "Resolved stale configuration"
        );
        Ok(config)
    }

    async fn deactivate(&self, repo: &RepoId) {
        match self.schedule.remove(repo).await {
            Ok(true) => tracing::info!(repo = %repo, "Removed repository from visit schedule"),
            Ok(false) => {}
            Err(e) => tracing::error!(repo = %repo, error = %e, "Failed to remove repository from schedule"),
        }
    }
}
