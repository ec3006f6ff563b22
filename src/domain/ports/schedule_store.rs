//! Repository port for the visitation schedule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{RepoId, ScheduleEntry};

/// Store of which repositories are actively visited and when.
///
/// Removal is an idempotent set-removal, so concurrent deactivation of the
/// same repository is harmless.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Get the entry for a repository, creating a due one if absent.
    async fn ensure(&self, repo: &RepoId, now: DateTime<Utc>) -> DomainResult<ScheduleEntry>;

    /// Get the entry for a repository.
    async fn get(&self, repo: &RepoId) -> DomainResult<Option<ScheduleEntry>>;

    /// Replace an existing entry. Unknown repositories are ignored.
    async fn update(&self, entry: &ScheduleEntry) -> DomainResult<()>;

    /// Remove a repository from the schedule. Returns whether it was present.
    async fn remove(&self, repo: &RepoId) -> DomainResult<bool>;

    /// Enabled entries whose next visit is at or before `now`.
    async fn due(&self, now: DateTime<Utc>) -> DomainResult<Vec<ScheduleEntry>>;

    /// All entries.
    async fn list(&self) -> DomainResult<Vec<ScheduleEntry>>;
}
