//! GitHub REST API v3 payloads.
//!
//! These structs map to the JSON the API exchanges and stay internal to the
//! GitHub adapter; conversion into domain types happens here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{ItemKind, ItemState, RepoId, TrackedItem};

/// An issue or pull request as returned by the issues and search endpoints.
///
/// Pull requests carry a non-null `pull_request` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub pull_request: Option<GitHubPullRequestRef>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub author_association: Option<String>,
    #[serde(default)]
    pub milestone: Option<GitHubMilestone>,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
}

impl GitHubIssue {
    pub const fn kind(&self) -> ItemKind {
        if self.pull_request.is_some() {
            ItemKind::PullRequest
        } else {
            ItemKind::Issue
        }
    }

    pub fn into_tracked(self, repo: RepoId) -> TrackedItem {
        let kind = self.kind();
        let mut item = TrackedItem::new(repo, self.number, kind, self.updated_at).with_title(self.title);
        item.state = ItemState::from_str(&self.state).unwrap_or(ItemState::Open);
        item.labels = self.labels.into_iter().map(|l| l.name).collect();
        item.author_association = self.author_association;
        item.milestone = self.milestone.map(|m| m.title);
        item.assignees = self.assignees.into_iter().map(|u| u.login).collect();
        item
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// Present on pull requests, absent on plain issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPullRequestRef {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubMilestone {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    /// `User`, `Bot` or `Organization`.
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

impl GitHubUser {
    pub fn is_bot(&self) -> bool {
        self.user_type.as_deref() == Some("Bot") || self.login.ends_with("[bot]")
    }
}

/// Response of `GET /search/issues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<GitHubIssue>,
}

/// Response of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// One entry of `GET /repos/{owner}/{repo}/issues/{number}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssueEvent {
    pub event: String,
    #[serde(default)]
    pub label: Option<GitHubLabel>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabelsRequest {
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssueUpdateRequest {
    pub state: String,
}
