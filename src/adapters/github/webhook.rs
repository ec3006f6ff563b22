//! GitHub webhook payloads to activity events.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::models::{GitHubLabel, GitHubMilestone, GitHubPullRequestRef, GitHubUser};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ActivityEvent, ActivityKind, Actor, ItemKind, ItemState, RepoId, TrackedItem};

#[derive(Debug, Deserialize)]
struct WebhookRepository {
    name: String,
    owner: GitHubUser,
}

/// Issue or pull request object embedded in a webhook. Some payloads omit
/// `labels`, which is why it is optional here.
#[derive(Debug, Deserialize)]
struct WebhookItem {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    labels: Option<Vec<GitHubLabel>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: Option<GitHubPullRequestRef>,
    #[serde(default)]
    author_association: Option<String>,
    #[serde(default)]
    milestone: Option<GitHubMilestone>,
    #[serde(default)]
    assignees: Vec<GitHubUser>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: String,
    repository: WebhookRepository,
    sender: GitHubUser,
    #[serde(default)]
    label: Option<GitHubLabel>,
    #[serde(default)]
    issue: Option<WebhookItem>,
    #[serde(default)]
    pull_request: Option<WebhookItem>,
}

/// Build an [`ActivityEvent`] from an `X-GitHub-Event` name and JSON body.
pub fn parse_webhook(event_name: &str, body: &str) -> DomainResult<ActivityEvent> {
    let kind = ActivityKind::from_event_name(event_name)
        .ok_or_else(|| DomainError::ValidationFailed(format!("unsupported webhook event '{event_name}'")))?;
    let payload: WebhookPayload = serde_json::from_str(body)?;

    let repo = RepoId::new(payload.repository.owner.login, payload.repository.name);
    let (raw, is_pull) = match (payload.issue, payload.pull_request) {
        (Some(issue), _) => {
            let is_pull = issue.pull_request.is_some();
            (issue, is_pull)
        }
        (None, Some(pull)) => (pull, true),
        (None, None) => {
            return Err(DomainError::ValidationFailed(format!(
                "{event_name} payload carries neither issue nor pull_request"
            )))
        }
    };

    let actor = Actor {
        is_bot: payload.sender.is_bot(),
        login: payload.sender.login,
    };
    let mut event = ActivityEvent::new(repo.clone(), raw.number, actor, kind, payload.action);
    if let Some(label) = payload.label {
        event = event.with_label(label.name);
    }

    let kind = if is_pull { ItemKind::PullRequest } else { ItemKind::Issue };
    let labels_known = raw.labels.is_some();
    let mut item = TrackedItem::new(repo, raw.number, kind, raw.updated_at.unwrap_or_else(Utc::now)).with_title(raw.title);
    item.state = raw
        .state
        .as_deref()
        .and_then(ItemState::from_str)
        .unwrap_or(ItemState::Open);
    item.labels = raw.labels.unwrap_or_default().into_iter().map(|l| l.name).collect();
    item.author_association = raw.author_association;
    item.milestone = raw.milestone.map(|m| m.title);
    item.assignees = raw.assignees.into_iter().map(|u| u.login).collect();

    Ok(if labels_known {
        event.with_item(item)
    } else {
        event.with_partial_item(item)
    })
}
