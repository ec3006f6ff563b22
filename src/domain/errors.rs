//! Domain errors for the stale lifecycle system.

use std::time::Duration;

use thiserror::Error;

use crate::domain::models::RepoId;

/// Domain-level errors that can occur while resolving configuration,
/// fetching items, or mutating them on the hosting platform.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration unavailable for {repo}: {reason}")]
    ConfigurationUnavailable { repo: RepoId, reason: String },

    #[error("Failed to fetch {repo}#{number}: {reason}")]
    ItemFetchFailure {
        repo: RepoId,
        number: u64,
        reason: String,
    },

    #[error("Failed to {action} on {repo}#{number}: {reason}")]
    MutationFailure {
        repo: RepoId,
        number: u64,
        action: String,
        reason: String,
    },

    #[error("Rate limited by platform, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Invalid repository '{0}', expected owner/name")]
    InvalidRepository(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Wrap an arbitrary failure of a single-item mutation.
    pub fn mutation(repo: &RepoId, number: u64, action: &str, reason: impl ToString) -> Self {
        Self::MutationFailure {
            repo: repo.clone(),
            number,
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure only concerns a single item and must not abort a batch.
    pub const fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::ItemFetchFailure { .. } | Self::MutationFailure { .. }
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}
