//! In-memory schedule store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RepoId, ScheduleEntry};
use crate::domain::ports::ScheduleStore;

/// [`ScheduleStore`] backed by a `BTreeMap`; contents do not survive a restart.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    entries: RwLock<BTreeMap<RepoId, ScheduleEntry>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn ensure(&self, repo: &RepoId, now: DateTime<Utc>) -> DomainResult<ScheduleEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(repo.clone())
            .or_insert_with(|| ScheduleEntry::new(repo.clone(), now));
        Ok(entry.clone())
    }

    async fn get(&self, repo: &RepoId) -> DomainResult<Option<ScheduleEntry>> {
        Ok(self.entries.read().await.get(repo).cloned())
    }

    async fn update(&self, entry: &ScheduleEntry) -> DomainResult<()> {
        if let Some(existing) = self.entries.write().await.get_mut(&entry.repo) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn remove(&self, repo: &RepoId) -> DomainResult<bool> {
        Ok(self.entries.write().await.remove(repo).is_some())
    }

    async fn due(&self, now: DateTime<Utc>) -> DomainResult<Vec<ScheduleEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_due(now))
            .cloned()
            .collect())
    }

    async fn list(&self) -> DomainResult<Vec<ScheduleEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
