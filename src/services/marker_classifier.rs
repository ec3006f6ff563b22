//! Marker classification.
//!
//! Pure predicates deciding whether an item carries the stale marker and
//! which lifecycle transition, if any, applies to it. Nothing in here
//! touches the platform; callers pass the per-kind configuration
//! (`RepositoryConfig::for_kind`) and the current time.

use chrono::{DateTime, Duration, Utc};

use crate::domain::models::{ActivityEvent, CloseAgeBasis, RepositoryConfig, TrackedItem, Verdict};

/// Whether the item carries the configured stale label.
pub fn has_stale_label(item: &TrackedItem, config: &RepositoryConfig) -> bool {
    item.has_label(&config.stale_label)
}

/// Whether the item is shielded from marking.
pub fn is_exempt(item: &TrackedItem, config: &RepositoryConfig) -> bool {
    if !config.processes(item.kind) {
        return true;
    }
    if item.labels.iter().any(|label| config.exempt_labels.contains(label)) {
        return true;
    }
    if !config.only_labels.is_empty() && !item.labels.iter().any(|label| config.only_labels.contains(label)) {
        return true;
    }
    if config.exempt_projects && item.in_project {
        return true;
    }
    if config.exempt_milestones && item.milestone.is_some() {
        return true;
    }
    config.exempt_assignees && !item.assignees.is_empty()
}

/// Time elapsed since `since`, saturating at zero for future timestamps.
fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).max(Duration::zero())
}

/// The instant the close threshold is measured from.
pub fn close_reference(item: &TrackedItem, config: &RepositoryConfig) -> DateTime<Utc> {
    match config.close_age_basis {
        CloseAgeBasis::StaleLabel => item.stale_since.unwrap_or(item.updated_at),
        CloseAgeBasis::LastActivity => item.updated_at,
    }
}

/// Whether an item inactive since `updated_at` has crossed `daysUntilStale`.
pub fn is_stale_by_age(item: &TrackedItem, config: &RepositoryConfig, now: DateTime<Utc>) -> bool {
    age(item.updated_at, now) >= Duration::days(i64::from(config.days_until_stale))
}

fn is_closable(item: &TrackedItem, config: &RepositoryConfig, now: DateTime<Utc>) -> bool {
    config.days_until_close.is_some_and(|days| {
        age(close_reference(item, config), now) >= Duration::days(i64::from(days))
    })
}

/// Sweep-path verdict for one item.
///
/// An item already carrying the stale label is only ever evaluated for
/// closure, never re-marked.
pub fn classify(item: &TrackedItem, config: &RepositoryConfig, now: DateTime<Utc>) -> Verdict {
    if !config.enabled || !item.is_open() || !config.processes(item.kind) {
        return Verdict::NoOp;
    }

    if has_stale_label(item, config) {
        return if is_closable(item, config, now) {
            Verdict::Close
        } else {
            Verdict::NoOp
        };
    }

    if !is_exempt(item, config) && is_stale_by_age(item, config, now) {
        Verdict::Mark
    } else {
        Verdict::NoOp
    }
}

/// Whether the event is the application of the stale label itself.
pub fn is_self_trigger(event: &ActivityEvent, config: &RepositoryConfig) -> bool {
    event.applied_label() == Some(config.stale_label.as_str())
}

/// Activity-path verdict: only the unmark branch is evaluated.
pub fn classify_activity(item: &TrackedItem, config: &RepositoryConfig, event: &ActivityEvent) -> Verdict {
    if !config.enabled || !item.is_open() {
        return Verdict::NoOp;
    }
    if has_stale_label(item, config) && !is_self_trigger(event, config) {
        Verdict::Unmark
    } else {
        Verdict::NoOp
    }
}
