//! Inbound triggers: real-time activity notifications and scheduled sweeps.

use serde::{Deserialize, Serialize};

use super::item::TrackedItem;
use super::repository::RepoId;

/// Platform event families that count as activity on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    IssueComment,
    Issue,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
}

impl ActivityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IssueComment => "issue_comment",
            Self::Issue => "issues",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
        }
    }

    /// Map a webhook event name (`X-GitHub-Event`) to a kind.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "issue_comment" => Some(Self::IssueComment),
            "issues" => Some(Self::Issue),
            "pull_request" => Some(Self::PullRequest),
            "pull_request_review" => Some(Self::PullRequestReview),
            "pull_request_review_comment" => Some(Self::PullRequestReviewComment),
            _ => None,
        }
    }
}

/// Who caused an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    pub is_bot: bool,
}

impl Actor {
    pub fn user(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            is_bot: false,
        }
    }

    pub fn bot(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            is_bot: true,
        }
    }
}

/// A real-time activity notification about one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub repo: RepoId,
    pub number: u64,
    pub actor: Actor,
    pub kind: ActivityKind,
    /// Webhook action, e.g. `created`, `edited`, `labeled`.
    pub action: String,
    /// Label payload, present when `action` is `labeled` / `unlabeled`.
    pub label: Option<String>,
    /// Item snapshot carried by the payload.
    pub item: Option<TrackedItem>,
    /// Some payloads omit labels; the snapshot's label set is then meaningless.
    pub labels_known: bool,
}

impl ActivityEvent {
    pub fn new(repo: RepoId, number: u64, actor: Actor, kind: ActivityKind, action: impl Into<String>) -> Self {
        Self {
            repo,
            number,
            actor,
            kind,
            action: action.into(),
            label: None,
            item: None,
            labels_known: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a payload snapshot whose labels are complete.
    pub fn with_item(mut self, item: TrackedItem) -> Self {
        self.item = Some(item);
        self.labels_known = true;
        self
    }

    /// Attach a payload snapshot that did not include labels.
    pub fn with_partial_item(mut self, item: TrackedItem) -> Self {
        self.item = Some(item);
        self.labels_known = false;
        self
    }

    /// The label this event applied, if it is a `labeled` event.
    pub fn applied_label(&self) -> Option<&str> {
        if self.action == "labeled" {
            self.label.as_deref()
        } else {
            None
        }
    }
}

/// Anything that can start work for a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Activity(ActivityEvent),
    Sweep { repo: RepoId },
}

impl Trigger {
    pub const fn repo(&self) -> &RepoId {
        match self {
            Self::Activity(event) => &event.repo,
            Self::Sweep { repo } => repo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_round_trip() {
        for kind in [
            ActivityKind::IssueComment,
            ActivityKind::Issue,
            ActivityKind::PullRequest,
            ActivityKind::PullRequestReview,
            ActivityKind::PullRequestReviewComment,
        ] {
            assert_eq!(ActivityKind::from_event_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityKind::from_event_name("push"), None);
    }

    #[test]
    fn test_applied_label_only_for_labeled_action() {
        let repo = RepoId::new("o", "r");
        let labeled = ActivityEvent::new(repo.clone(), 1, Actor::user("a"), ActivityKind::Issue, "labeled")
            .with_label("wontfix");
        let unlabeled = ActivityEvent::new(repo, 1, Actor::user("a"), ActivityKind::Issue, "unlabeled")
            .with_label("wontfix");

        assert_eq!(labeled.applied_label(), Some("wontfix"));
        assert_eq!(unlabeled.applied_label(), None);
    }
}
