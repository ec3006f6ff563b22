//! Common test utilities for integration tests
//!
//! Builds an [`EventRouter`] over in-memory adapters with a manually driven
//! clock, plus item fixtures aged relative to that clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use stalebot::adapters::memory::{InMemoryPlatform, InMemoryScheduleStore};
use stalebot::domain::models::{ItemKind, RepoId, TrackedItem};
use stalebot::domain::ports::FixedClock;
use stalebot::services::{EventRouter, RouterSettings};

pub const MARK_COMMENT: &str = "Marked stale after a long silence.";
pub const CLOSE_COMMENT: &str = "Closing for inactivity.";

/// Standard document used by the scenarios.
pub const STALE_YML: &str = "\
daysUntilStale: 60
daysUntilClose: 7
staleLabel: wontfix
exemptLabels:
  - pinned
markComment: Marked stale after a long silence.
closeComment: Closing for inactivity.
";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn repo() -> RepoId {
    RepoId::new("octo", "widgets")
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// Open issue last touched `days` days before [`now`].
pub fn issue(number: u64, days: i64) -> TrackedItem {
    TrackedItem::new(repo(), number, ItemKind::Issue, days_ago(days))
}

/// Issue labelled stale `stale_days` ago.
pub fn stale_issue(number: u64, stale_days: i64) -> TrackedItem {
    issue(number, stale_days)
        .with_label("wontfix")
        .with_stale_since(days_ago(stale_days))
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub platform: Arc<InMemoryPlatform>,
    pub schedule: Arc<InMemoryScheduleStore>,
    pub router: Arc<EventRouter>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(RouterSettings::default())
    }

    pub fn with_settings(settings: RouterSettings) -> Self {
        let clock = Arc::new(FixedClock::new(now()));
        let platform = Arc::new(InMemoryPlatform::with_clock(clock.clone()));
        let schedule = Arc::new(InMemoryScheduleStore::new());
        let router = Arc::new(EventRouter::new(
            platform.clone(),
            schedule.clone(),
            clock.clone(),
            settings,
        ));
        Self {
            clock,
            platform,
            schedule,
            router,
        }
    }

    /// Harness whose repository carries [`STALE_YML`].
    pub async fn configured() -> Self {
        let harness = Self::new();
        harness.platform.set_config(&repo(), STALE_YML).await;
        harness
    }
}
