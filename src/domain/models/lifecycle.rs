//! Classifier verdicts, planned lifecycle actions and sweep reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repository::RepoId;

/// Outcome of classifying one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NoOp,
    Mark,
    Unmark,
    Close,
}

impl Verdict {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Mark => "mark",
            Self::Unmark => "unmark",
            Self::Close => "close",
        }
    }

    pub const fn is_actionable(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// A single mutation (or report) the lifecycle engine performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LifecycleAction {
    AddLabel { label: String },
    RemoveLabel { label: String },
    Comment { body: String },
    Close,
    /// Report-only stand-in for a verdict: logged and counted, never applied.
    Report { verdict: Verdict },
}

impl LifecycleAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AddLabel { .. } => "add label",
            Self::RemoveLabel { .. } => "remove label",
            Self::Comment { .. } => "comment",
            Self::Close => "close",
            Self::Report { .. } => "report",
        }
    }
}

/// Phases of one sweep invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPhase {
    Enumerate,
    Classify,
    Act,
    Done,
}

/// Counters produced by one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub repo: RepoId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub examined: usize,
    pub marked: usize,
    pub unmarked: usize,
    pub closed: usize,
    /// Verdicts suppressed by report-only mode.
    pub would_mark: usize,
    pub would_unmark: usize,
    pub would_close: usize,
    /// Actionable items left for the next sweep because of `limitPerRun`.
    pub deferred: usize,
    pub failures: usize,
}

impl SweepReport {
    pub fn new(repo: RepoId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            repo,
            started_at,
            finished_at: None,
            examined: 0,
            marked: 0,
            unmarked: 0,
            closed: 0,
            would_mark: 0,
            would_unmark: 0,
            would_close: 0,
            deferred: 0,
            failures: 0,
        }
    }

    /// Count one handled verdict, applied or only reported.
    pub fn record(&mut self, verdict: Verdict, reported: bool) {
        let counter = match (verdict, reported) {
            (Verdict::NoOp, _) => return,
            (Verdict::Mark, false) => &mut self.marked,
            (Verdict::Unmark, false) => &mut self.unmarked,
            (Verdict::Close, false) => &mut self.closed,
            (Verdict::Mark, true) => &mut self.would_mark,
            (Verdict::Unmark, true) => &mut self.would_unmark,
            (Verdict::Close, true) => &mut self.would_close,
        };
        *counter += 1;
    }

    /// Verdicts that changed the repository.
    pub const fn actions_applied(&self) -> usize {
        self.marked + self.unmarked + self.closed
    }

    /// Verdicts that were only reported.
    pub const fn actions_reported(&self) -> usize {
        self.would_mark + self.would_unmark + self.would_close
    }
}
