//! Tracked issues and pull requests.
//!
//! A [`TrackedItem`] is created and updated by platform activity. The only
//! mutations this system performs on it are adding/removing the stale label
//! and closing it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repository::RepoId;

/// Whether an item is an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull_request",
        }
    }

    /// Key used for per-kind overrides in the repository config document.
    pub const fn config_key(&self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::PullRequest => "pulls",
        }
    }

    pub const fn all() -> [Self; 2] {
        [Self::Issue, Self::PullRequest]
    }
}

/// Open/closed state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// An issue or pull request as seen by the lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedItem {
    pub repo: RepoId,
    pub number: u64,
    pub kind: ItemKind,
    pub state: ItemState,
    pub title: String,
    pub labels: BTreeSet<String>,

    /// Last activity on the item.
    pub updated_at: DateTime<Utc>,
    /// When the stale label was applied, if known.
    pub stale_since: Option<DateTime<Utc>>,

    /// Author association reported by the platform (OWNER, MEMBER, NONE, ...).
    pub author_association: Option<String>,
    pub milestone: Option<String>,
    pub assignees: Vec<String>,
    pub in_project: bool,
}

impl TrackedItem {
    /// Create an open item with no labels.
    pub fn new(repo: RepoId, number: u64, kind: ItemKind, updated_at: DateTime<Utc>) -> Self {
        Self {
            repo,
            number,
            kind,
            state: ItemState::Open,
            title: String::new(),
            labels: BTreeSet::new(),
            updated_at,
            stale_since: None,
            author_association: None,
            milestone: None,
            assignees: Vec::new(),
            in_project: false,
        }
    }

    // Builder methods
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn with_stale_since(mut self, at: DateTime<Utc>) -> Self {
        self.stale_since = Some(at);
        self
    }

    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    pub fn with_assignee(mut self, login: impl Into<String>) -> Self {
        self.assignees.push(login.into());
        self
    }

    pub fn with_project(mut self) -> Self {
        self.in_project = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.state == ItemState::Open
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// `owner/name#number`, used as a log field.
    pub fn reference(&self) -> String {
        format!("{}#{}", self.repo, self.number)
    }
}
