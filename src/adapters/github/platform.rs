//! [`IssuePlatform`] over the GitHub REST API.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::client::GitHubClient;
use super::error::GitHubError;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ItemKind, RepoId, TrackedItem};
use crate::domain::ports::{IssuePlatform, ItemQuery};

pub struct GitHubPlatform {
    client: GitHubClient,
}

impl GitHubPlatform {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

/// Search qualifier for a label, quoted so names with spaces survive.
fn label_qualifier(prefix: &str, label: &str) -> String {
    format!("{prefix}label:\"{}\"", label.replace('"', ""))
}

/// Translate an [`ItemQuery`] into GitHub search syntax.
pub fn search_query(repo: &RepoId, query: &ItemQuery) -> String {
    let mut parts = vec![format!("repo:{repo}"), "is:open".to_string()];
    match query.kind {
        Some(ItemKind::Issue) => parts.push("is:issue".to_string()),
        Some(ItemKind::PullRequest) => parts.push("is:pr".to_string()),
        None => {}
    }
    if let Some(label) = &query.with_label {
        parts.push(label_qualifier("", label));
    }
    for label in &query.without_labels {
        parts.push(label_qualifier("-", label));
    }
    if let Some(before) = query.updated_before {
        parts.push(format!("updated:<={}", before.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    parts.join(" ")
}

fn fetch_failure(repo: &RepoId, number: u64, err: GitHubError) -> DomainError {
    match err {
        GitHubError::RateLimited { retry_after } => DomainError::RateLimited { retry_after },
        other => DomainError::ItemFetchFailure {
            repo: repo.clone(),
            number,
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl IssuePlatform for GitHubPlatform {
    async fn get_item(&self, repo: &RepoId, number: u64) -> DomainResult<TrackedItem> {
        self.client
            .get_issue(&repo.owner, &repo.name, number)
            .await
            .map(|issue| issue.into_tracked(repo.clone()))
            .map_err(|e| fetch_failure(repo, number, e))
    }

    async fn list_open_items(&self, repo: &RepoId, query: &ItemQuery) -> DomainResult<Vec<TrackedItem>> {
        let q = search_query(repo, query);
        tracing::debug!(repo = %repo, query = %q, "Searching candidates");
        let issues = self.client.search_issues(&q).await?;

        // the search index lags; re-check what it returned
        Ok(issues
            .into_iter()
            .map(|issue| issue.into_tracked(repo.clone()))
            .filter(|item| query.matches(item))
            .collect())
    }

    async fn add_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()> {
        self.client
            .add_labels(&repo.owner, &repo.name, number, &[label.to_string()])
            .await
            .map_err(|e| DomainError::mutation(repo, number, "add label", e))
    }

    async fn remove_label(&self, repo: &RepoId, number: u64, label: &str) -> DomainResult<()> {
        self.client
            .remove_label(&repo.owner, &repo.name, number, label)
            .await
            .map_err(|e| DomainError::mutation(repo, number, "remove label", e))
    }

    async fn create_comment(&self, repo: &RepoId, number: u64, body: &str) -> DomainResult<()> {
        self.client
            .post_comment(&repo.owner, &repo.name, number, body)
            .await
            .map_err(|e| DomainError::mutation(repo, number, "comment", e))
    }

    async fn close_item(&self, repo: &RepoId, number: u64) -> DomainResult<()> {
        self.client
            .update_issue_state(&repo.owner, &repo.name, number, "closed")
            .await
            .map_err(|e| DomainError::mutation(repo, number, "close", e))
    }

    async fn get_config_content(&self, repo: &RepoId, path: &str) -> DomainResult<Option<String>> {
        self.client
            .get_file_content(&repo.owner, &repo.name, path)
            .await
            .map_err(|e| DomainError::ConfigurationUnavailable {
                repo: repo.clone(),
                reason: e.to_string(),
            })
    }

    async fn label_applied_at(
        &self,
        repo: &RepoId,
        number: u64,
        label: &str,
    ) -> DomainResult<Option<DateTime<Utc>>> {
        let events = self
            .client
            .list_issue_events(&repo.owner, &repo.name, number)
            .await
            .map_err(|e| fetch_failure(repo, number, e))?;

        Ok(events
            .into_iter()
            .filter(|e| e.event == "labeled" && e.label.as_ref().is_some_and(|l| l.name == label))
            .map(|e| e.created_at)
            .max())
    }
}
