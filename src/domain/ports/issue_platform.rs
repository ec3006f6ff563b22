//! Hosting platform port: the outbound calls the lifecycle engine needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ItemKind, RepoId, TrackedItem};

/// Cheap filters pushed down to enumeration.
///
/// Adapters may apply them server-side (e.g. as a search query); the
/// classifier re-checks every item regardless, so an adapter that returns a
/// superset is still correct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    /// Restrict to one kind; `None` lists both.
    pub kind: Option<ItemKind>,
    /// Only items carrying this label.
    pub with_label: Option<String>,
    /// Exclude items carrying any of these labels.
    pub without_labels: Vec<String>,
    /// Only items whose last activity is at or before this instant.
    pub updated_before: Option<DateTime<Utc>>,
}

impl ItemQuery {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.with_label = Some(label.into());
        self
    }

    pub fn without_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.without_labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn updated_before(mut self, at: DateTime<Utc>) -> Self {
        self.updated_before = Some(at);
        self
    }

    /// Whether an open item satisfies the query.
    pub fn matches(&self, item: &TrackedItem) -> bool {
        if !item.is_open() {
            return false;
        }
        if self.kind.is_some_and(|kind| kind != item.kind) {
            return false;
        }
        if let Some(label) = &self.with_label {
            if !item.has_label(label) {
                return false;
            }
        }
        if self.without_labels.iter().any(|l| item.has_label(l)) {
            return false;
        }
        self.updated_before.is_none_or(|before| item.updated_at <= before)
    }
}

/// Operations against the issue hosting platform.
///
/// Rate-limit backoff is the adapter's responsibility and transparent to
/// callers.
#[async_trait]
pub trait IssuePlatform: Send + Sync {
    /// Fetch full item detail, including labels.
    async fn get_item(&self, repo: &RepoId, number: u64) -> DomainResult<TrackedItem>;

    /// List open items matching the query.
    async fn list_open_items(&self, repo: &RepoId, query: &ItemQuery) -> DomainResult<Vec<TrackedItem>>;

    /// Add a label. Adding a label that is already present changes nothing.
    async fn add_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()>;

    /// Remove a label. Removing an absent label is not an error.
    async fn remove_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()>;

    /// Post a comment.
    async fn create_comment(&self, repo: &RepoId, number: u64, body: &str) -> DomainResult<()>;

    /// Transition the item to closed.
    async fn close_item(&self, repo: &RepoId, number: u64) -> DomainResult<()>;

    /// Raw content of a file on the default branch; `None` when absent.
    async fn get_config_content(&self, repo: &RepoId, path: &str) -> DomainResult<Option<String>>;

    /// When `label` was most recently applied to the item, if known.
    async fn label_applied_at(
        &self,
        repo: &RepoId,
        number: u64,
        label: &str,
    ) -> DomainResult<Option<DateTime<Utc>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_query_matches() {
        let now = Utc::now();
        let repo = RepoId::new("o", "r");
        let item = TrackedItem::new(repo, 1, ItemKind::Issue, now - Duration::days(10)).with_label("bug");

        assert!(ItemQuery::new(ItemKind::Issue).matches(&item));
        assert!(!ItemQuery::new(ItemKind::PullRequest).matches(&item));
        assert!(!ItemQuery::new(ItemKind::Issue).with_label("wontfix").matches(&item));
        assert!(!ItemQuery::new(ItemKind::Issue).without_labels(["bug"]).matches(&item));
        assert!(ItemQuery::new(ItemKind::Issue)
            .updated_before(now - Duration::days(5))
            .matches(&item));
        assert!(!ItemQuery::new(ItemKind::Issue)
            .updated_before(now - Duration::days(20))
            .matches(&item));
    }

    #[test]
    fn test_query_never_matches_closed() {
        let item = TrackedItem::new(RepoId::new("o", "r"), 1, ItemKind::Issue, Utc::now())
            .with_state(crate::domain::models::ItemState::Closed);
        assert!(!ItemQuery::default().matches(&item));
    }
}
