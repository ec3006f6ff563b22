//! Repository visitation schedule.
//!
//! One [`ScheduleEntry`] governs the sweep cadence of exactly one
//! repository. Entries are created on the first sweep trigger, removed when
//! the repository turns out to be unconfigured, and otherwise re-armed after
//! every visit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::repository::RepoId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub repo: RepoId,
    pub next_visit_at: DateTime<Utc>,
    pub enabled: bool,
    pub last_visited_at: Option<DateTime<Utc>>,
    /// Failed visits since the last successful one.
    pub consecutive_failures: u32,
}

impl ScheduleEntry {
    /// New entry, due immediately.
    pub fn new(repo: RepoId, now: DateTime<Utc>) -> Self {
        Self {
            repo,
            next_visit_at: now,
            enabled: true,
            last_visited_at: None,
            consecutive_failures: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_visit_at <= now
    }

    /// Record a successful visit and schedule the next one. A successful
    /// visit also lifts a disable caused by earlier failures.
    pub fn rearm(&mut self, now: DateTime<Utc>, interval: Duration) {
        self.last_visited_at = Some(now);
        self.next_visit_at = next_visit(now, interval);
        self.consecutive_failures = 0;
        self.enabled = true;
    }

    /// Record a failed visit. Disables the entry once `max_failures` is reached.
    /// Returns whether the entry is still enabled.
    pub fn record_failure(&mut self, now: DateTime<Utc>, interval: Duration, max_failures: u32) -> bool {
        self.last_visited_at = Some(now);
        self.next_visit_at = next_visit(now, interval);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= max_failures {
            self.enabled = false;
        }
        self.enabled
    }
}

/// `now + interval`, saturating at the latest representable instant.
fn next_visit(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    now.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
