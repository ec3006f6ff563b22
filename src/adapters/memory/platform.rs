//! In-memory issue platform.
//!
//! Holds items and configuration documents in maps and records every
//! successful mutation, so lifecycle behaviour can be asserted without a
//! network. Failures can be injected per item or per repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ItemState, RepoId, TrackedItem};
use crate::domain::ports::{Clock, IssuePlatform, ItemQuery, SystemClock};

/// A mutation applied to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddLabel { repo: RepoId, number: u64, label: String },
    RemoveLabel { repo: RepoId, number: u64, label: String },
    Comment { repo: RepoId, number: u64, body: String },
    Close { repo: RepoId, number: u64 },
}

impl Mutation {
    pub const fn number(&self) -> u64 {
        match self {
            Self::AddLabel { number, .. }
            | Self::RemoveLabel { number, .. }
            | Self::Comment { number, .. }
            | Self::Close { number, .. } => *number,
        }
    }
}

type ItemKey = (RepoId, u64);

#[derive(Default)]
struct Failures {
    configs: HashSet<RepoId>,
    listings: HashSet<RepoId>,
    fetches: HashSet<u64>,
    mutations: HashSet<u64>,
}

/// In-memory [`IssuePlatform`].
pub struct InMemoryPlatform {
    items: RwLock<HashMap<ItemKey, TrackedItem>>,
    configs: RwLock<HashMap<RepoId, String>>,
    label_applied: RwLock<HashMap<(RepoId, u64, String), DateTime<Utc>>>,
    mutations: RwLock<Vec<Mutation>>,
    failures: RwLock<Failures>,
    clock: Arc<dyn Clock>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Label application times are stamped with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            label_applied: RwLock::new(HashMap::new()),
            mutations: RwLock::new(Vec::new()),
            failures: RwLock::new(Failures::default()),
            clock,
        }
    }

    pub async fn insert(&self, item: TrackedItem) {
        if let Some(at) = item.stale_since {
            for label in &item.labels {
                self.label_applied
                    .write()
                    .await
                    .insert((item.repo.clone(), item.number, label.clone()), at);
            }
        }
        self.items
            .write()
            .await
            .insert((item.repo.clone(), item.number), item);
    }

    pub async fn item(&self, repo: &RepoId, number: u64) -> Option<TrackedItem> {
        self.items.read().await.get(&(repo.clone(), number)).cloned()
    }

    /// Commit a configuration document for a repository.
    pub async fn set_config(&self, repo: &RepoId, content: impl Into<String>) {
        self.configs.write().await.insert(repo.clone(), content.into());
    }

    /// Record when a label was applied, as the platform's event log would.
    pub async fn set_label_applied_at(&self, repo: &RepoId, number: u64, label: &str, at: DateTime<Utc>) {
        self.label_applied
            .write()
            .await
            .insert((repo.clone(), number, label.to_string()), at);
    }

    /// Successful mutations, in order.
    pub async fn mutations(&self) -> Vec<Mutation> {
        self.mutations.read().await.clone()
    }

    pub async fn clear_mutations(&self) {
        self.mutations.write().await.clear();
    }

    /// Make every mutation on item `number` fail.
    pub async fn fail_mutations_for(&self, number: u64) {
        self.failures.write().await.mutations.insert(number);
    }

    /// Make detail fetches of item `number` fail.
    pub async fn fail_fetch_for(&self, number: u64) {
        self.failures.write().await.fetches.insert(number);
    }

    /// Make configuration retrieval for `repo` fail with a transport error.
    pub async fn fail_config_for(&self, repo: &RepoId) {
        self.failures.write().await.configs.insert(repo.clone());
    }

    /// Make item enumeration for `repo` fail.
    pub async fn fail_listing_for(&self, repo: &RepoId) {
        self.failures.write().await.listings.insert(repo.clone());
    }

    async fn check_mutation(&self, repo: &RepoId, number: u64, action: &str) -> DomainResult<()> {
        if self.failures.read().await.mutations.contains(&number) {
            return Err(DomainError::mutation(repo, number, action, "injected failure"));
        }
        if !self.items.read().await.contains_key(&(repo.clone(), number)) {
            return Err(DomainError::mutation(repo, number, action, "not found"));
        }
        Ok(())
    }

    async fn record(&self, mutation: Mutation) {
        self.mutations.write().await.push(mutation);
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssuePlatform for InMemoryPlatform {
    async fn get_item(&self, repo: &RepoId, number: u64) -> DomainResult<TrackedItem> {
        if self.failures.read().await.fetches.contains(&number) {
            return Err(DomainError::ItemFetchFailure {
                repo: repo.clone(),
                number,
                reason: "injected failure".to_string(),
            });
        }
        self.item(repo, number)
            .await
            .ok_or_else(|| DomainError::ItemFetchFailure {
                repo: repo.clone(),
                number,
                reason: "not found".to_string(),
            })
    }

    async fn list_open_items(&self, repo: &RepoId, query: &ItemQuery) -> DomainResult<Vec<TrackedItem>> {
        if self.failures.read().await.listings.contains(repo) {
            return Err(DomainError::ExecutionFailed(format!(
                "listing items of {repo} failed"
            )));
        }
        let mut items: Vec<TrackedItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| &item.repo == repo && query.matches(item))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.number);
        Ok(items)
    }

    async fn add_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()> {
        self.check_mutation(repo, number, "add label").await?;
        let now = self.clock.now();
        let added = {
            let mut items = self.items.write().await;
            items
                .get_mut(&(repo.clone(), number))
                .is_some_and(|item| item.labels.insert(label.to_string()))
        };
        if added {
            self.set_label_applied_at(repo, number, label, now).await;
        }
        self.record(Mutation::AddLabel {
            repo: repo.clone(),
            number,
            label: label.to_string(),
        })
        .await;
        Ok(())
    }

    async fn remove_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()> {
        self.check_mutation(repo, number, "remove label").await?;
        if let Some(item) = self.items.write().await.get_mut(&(repo.clone(), number)) {
            item.labels.remove(label);
        }
        self.record(Mutation::RemoveLabel {
            repo: repo.clone(),
            number,
            label: label.to_string(),
        })
        .await;
        Ok(())
    }

    async fn create_comment(&self, repo: &RepoId, number: u64, body: &str) -> DomainResult<()> {
        self.check_mutation(repo, number, "comment").await?;
        if let Some(item) = self.items.write().await.get_mut(&(repo.clone(), number)) {
            item.updated_at = self.clock.now();
        }
        self.record(Mutation::Comment {
            repo: repo.clone(),
            number,
            body: body.to_string(),
        })
        .await;
        Ok(())
    }

    async fn close_item(&self, repo: &RepoId, number: u64) -> DomainResult<()> {
        self.check_mutation(repo, number, "close").await?;
        if let Some(item) = self.items.write().await.get_mut(&(repo.clone(), number)) {
            item.state = ItemState::Closed;
        }
        self.record(Mutation::Close {
            repo: repo.clone(),
            number,
        })
        .await;
        Ok(())
    }

    async fn get_config_content(&self, repo: &RepoId, _path: &str) -> DomainResult<Option<String>> {
        if self.failures.read().await.configs.contains(repo) {
            return Err(DomainError::ConfigurationUnavailable {
                repo: repo.clone(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.configs.read().await.get(repo).cloned())
    }

    async fn label_applied_at(
        &self,
        repo: &RepoId,
        number: u64,
        label: &str,
    ) -> DomainResult<Option<DateTime<Utc>>> {
        Ok(self
            .label_applied
            .read()
            .await
            .get(&(repo.clone(), number, label.to_string()))
            .copied())
    }
}
