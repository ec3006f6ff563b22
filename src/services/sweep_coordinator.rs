//! Mark-and-sweep over one repository.
//!
//! A sweep walks `Enumerate → Classify → Act → Done`. Cheap filters are
//! pushed into the enumeration queries; every candidate is then classified
//! and the actionable ones are applied with bounded concurrency. A failure on
//! one item is logged and counted and never aborts the batch. Only an
//! enumeration failure aborts the sweep, leaving the rest to the next visit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CloseAgeBasis, ItemKind, RepositoryConfig, SweepPhase, SweepReport, TrackedItem, Verdict,
};
use crate::domain::ports::{IssuePlatform, ItemQuery};
use crate::services::lifecycle_engine::LifecycleEngine;
use crate::services::marker_classifier;

/// Default number of items mutated concurrently within one repository.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// A candidate together with the per-kind configuration that governs it.
struct Candidate {
    item: TrackedItem,
    config: RepositoryConfig,
}

pub struct SweepCoordinator {
    platform: Arc<dyn IssuePlatform>,
    engine: Arc<LifecycleEngine>,
    max_concurrency: usize,
}

impl SweepCoordinator {
    pub fn new(platform: Arc<dyn IssuePlatform>, engine: Arc<LifecycleEngine>) -> Self {
        Self {
            platform,
            engine,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Run one sweep of `config.repo`.
    pub async fn sweep(&self, config: &RepositoryConfig, now: DateTime<Utc>) -> DomainResult<SweepReport> {
        let mut report = SweepReport::new(config.repo.clone(), now);
        if !config.enabled {
            report.finished_at = Some(Utc::now());
            return Ok(report);
        }

        enter(&report, SweepPhase::Enumerate);
        let candidates = self.enumerate(config, now).await?;
        let candidates = self.fill_stale_since(candidates).await;

        enter(&report, SweepPhase::Classify);
        report.examined = candidates.len();
        let mut actionable: Vec<(Verdict, Candidate)> = candidates
            .into_iter()
            .filter_map(|c| {
                let verdict = marker_classifier::classify(&c.item, &c.config, now);
                tracing::trace!(item = %c.item.reference(), verdict = verdict.as_str(), "Classified");
                verdict.is_actionable().then_some((verdict, c))
            })
            .collect();

        if actionable.len() > config.limit_per_run {
            report.deferred = actionable.len() - config.limit_per_run;
            actionable.truncate(config.limit_per_run);
            tracing::info!(
                repo = %config.repo,
                limit = config.limit_per_run,
                deferred = report.deferred,
                "Action limit reached, deferring remaining items to next sweep"
            );
        }

        enter(&report, SweepPhase::Act);
        self.act(actionable, &mut report).await?;

        report.finished_at = Some(Utc::now());
        enter(&report, SweepPhase::Done);
        tracing::info!(
            repo = %report.repo,
            run_id = %report.run_id,
            examined = report.examined,
            marked = report.marked,
            unmarked = report.unmarked,
            closed = report.closed,
            reported = report.actions_reported(),
            deferred = report.deferred,
            failures = report.failures,
            "Sweep complete"
        );
        Ok(report)
    }

    /// Open candidates per processed kind, de-duplicated by number.
    async fn enumerate(&self, config: &RepositoryConfig, now: DateTime<Utc>) -> DomainResult<Vec<Candidate>> {
        let mut found: BTreeMap<u64, Candidate> = BTreeMap::new();

        for kind in ItemKind::all() {
            if !config.processes(kind) {
                continue;
            }
            let kind_config = config.for_kind(kind);

            for query in candidate_queries(kind, &kind_config, now) {
                let items = self
                    .platform
                    .list_open_items(&config.repo, &query)
                    .await
                    .inspect_err(|e| {
                        tracing::error!(repo = %config.repo, kind = kind.as_str(), error = %e, "Enumeration failed");
                    })?;
                for item in items {
                    found.entry(item.number).or_insert_with(|| Candidate {
                        item,
                        config: kind_config.clone(),
                    });
                }
            }
        }

        tracing::debug!(repo = %config.repo, candidates = found.len(), "Enumerated candidates");
        Ok(found.into_values().collect())
    }

    /// Look up when the stale label was applied where enumeration could not
    /// tell. Lookups run under the same concurrency bound as mutations.
    async fn fill_stale_since(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut filled = Vec::with_capacity(candidates.len());
        let mut handles = Vec::new();

        for candidate in candidates {
            if !needs_label_lookup(&candidate) {
                filled.push(candidate);
                continue;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                filled.push(candidate);
                continue;
            };
            let platform = self.platform.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let Candidate { mut item, config } = candidate;
                match platform.label_applied_at(&item.repo, item.number, &config.stale_label).await {
                    Ok(at) => item.stale_since = at,
                    Err(e) => tracing::warn!(
                        item = %item.reference(),
                        error = %e,
                        "Could not determine when stale label was applied, using last activity"
                    ),
                }
                Candidate { item, config }
            }));
        }

        for handle in futures::future::join_all(handles).await {
            match handle {
                Ok(candidate) => filled.push(candidate),
                Err(e) => tracing::error!(error = %e, "Label lookup task panicked"),
            }
        }
        filled.sort_by_key(|c| c.item.number);
        filled
    }

    async fn act(&self, actionable: Vec<(Verdict, Candidate)>, report: &mut SweepReport) -> DomainResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(actionable.len());

        for (verdict, Candidate { item, config }) in actionable {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DomainError::ExecutionFailed("Semaphore closed".to_string()))?;
            let engine = self.engine.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = engine.execute(verdict, &item, &config).await;
                (verdict, item, result)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((verdict, item, Ok(outcome))) => {
                    tracing::info!(
                        item = %item.reference(),
                        verdict = verdict.as_str(),
                        reported = outcome.reported,
                        "Handled verdict"
                    );
                    report.record(verdict, outcome.reported);
                }
                Ok((verdict, item, Err(e))) => {
                    tracing::warn!(
                        item = %item.reference(),
                        verdict = verdict.as_str(),
                        error = %e,
                        "Item failed, continuing sweep"
                    );
                    report.failures += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Sweep task panicked");
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }
}

fn needs_label_lookup(candidate: &Candidate) -> bool {
    let Candidate { item, config } = candidate;
    item.stale_since.is_none()
        && config.close_age_basis == CloseAgeBasis::StaleLabel
        && config.days_until_close.is_some()
        && marker_classifier::has_stale_label(item, config)
}

/// Enumeration queries for one kind: unmarked items idle past the stale
/// threshold, and (when closing is enabled) items already carrying the label.
///
/// A threshold reaching past the earliest representable instant selects
/// nothing, so the mark query is dropped rather than computed.
pub fn candidate_queries(kind: ItemKind, config: &RepositoryConfig, now: DateTime<Utc>) -> Vec<ItemQuery> {
    let mut queries = Vec::with_capacity(2);
    if let Some(stale_cutoff) = now.checked_sub_signed(Duration::days(i64::from(config.days_until_stale))) {
        queries.push(
            ItemQuery::new(kind)
                .without_labels(
                    std::iter::once(config.stale_label.clone()).chain(config.exempt_labels.iter().cloned()),
                )
                .updated_before(stale_cutoff),
        );
    }

    if config.days_until_close.is_some() {
        queries.push(ItemQuery::new(kind).with_label(config.stale_label.clone()));
    }
    queries
}

fn enter(report: &SweepReport, phase: SweepPhase) {
    tracing::debug!(repo = %report.repo, run_id = %report.run_id, phase = ?phase, "Sweep phase");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlatform;
    use crate::domain::models::{ItemState, RepoId, StaleConfigDocument};

    fn repo() -> RepoId {
        RepoId::new("octo", "widgets")
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn issue(number: u64, days_idle: i64) -> TrackedItem {
        TrackedItem::new(repo(), number, ItemKind::Issue, now() - Duration::days(days_idle))
    }

    fn coordinator(platform: &Arc<InMemoryPlatform>) -> SweepCoordinator {
        let engine = Arc::new(LifecycleEngine::new(platform.clone()));
        SweepCoordinator::new(platform.clone(), engine)
    }

    fn config(yaml: &str) -> RepositoryConfig {
        RepositoryConfig::from_yaml(repo(), yaml).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_marks_and_closes() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 61)).await;
        platform.insert(issue(2, 10)).await;
        platform
            .insert(issue(3, 70).with_label("wontfix").with_stale_since(now() - Duration::days(8)))
            .await;
        platform.insert(issue(4, 200).with_label("pinned")).await;

        let report = coordinator(&platform)
            .sweep(&config("closeComment: Closing.\n"), now())
            .await
            .unwrap();

        assert_eq!(report.marked, 1);
        assert_eq!(report.closed, 1);
        assert_eq!(report.failures, 0);
        assert!(platform.item(&repo(), 1).await.unwrap().has_label("wontfix"));
        assert!(!platform.item(&repo(), 2).await.unwrap().has_label("wontfix"));
        assert_eq!(platform.item(&repo(), 3).await.unwrap().state, ItemState::Closed);
        assert!(!platform.item(&repo(), 4).await.unwrap().has_label("wontfix"));
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_on_one_item_does_not_abort_batch() {
        let platform = Arc::new(InMemoryPlatform::new());
        for number in 1..=3 {
            platform.insert(issue(number, 90)).await;
        }
        platform.fail_mutations_for(2).await;

        let report = coordinator(&platform).sweep(&config(""), now()).await.unwrap();

        assert_eq!(report.marked, 2);
        assert_eq!(report.failures, 1);
        assert!(platform.item(&repo(), 1).await.unwrap().has_label("wontfix"));
        assert!(platform.item(&repo(), 3).await.unwrap().has_label("wontfix"));
    }

    #[tokio::test]
    async fn test_limit_per_run_defers_excess() {
        let platform = Arc::new(InMemoryPlatform::new());
        for number in 1..=5 {
            platform.insert(issue(number, 90)).await;
        }

        let report = coordinator(&platform)
            .with_max_concurrency(2)
            .sweep(&config("limitPerRun: 2\n"), now())
            .await
            .unwrap();

        assert_eq!(report.marked, 2);
        assert_eq!(report.deferred, 3);
    }

    #[tokio::test]
    async fn test_report_only_sweep_mutates_nothing() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 90)).await;
        platform
            .insert(issue(9, 70).with_label("wontfix").with_stale_since(now() - Duration::days(30)))
            .await;

        let report = coordinator(&platform)
            .sweep(&config("perform: false\ncloseComment: Closing.\n"), now())
            .await
            .unwrap();

        assert_eq!(report.marked, 0);
        assert_eq!(report.closed, 0);
        assert_eq!(report.would_mark, 1);
        assert_eq!(report.would_close, 1);
        assert_eq!(report.actions_applied(), 0);
        assert!(!platform.item(&repo(), 1).await.unwrap().has_label("wontfix"));
        assert_eq!(platform.item(&repo(), 9).await.unwrap().state, ItemState::Open);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_config_mutates_nothing() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 90)).await;
        let config = config("pulls:\n  perform: true\n").into_dry_run();

        let report = coordinator(&platform).sweep(&config, now()).await.unwrap();

        assert_eq!(report.would_mark, 1);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_does_not_panic() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 400)).await;
        let doc = StaleConfigDocument::from_yaml("daysUntilStale: 100000000\n").unwrap();
        let config = RepositoryConfig::from_document(repo(), &doc);

        let queries = candidate_queries(ItemKind::Issue, &config, now());
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].with_label.as_deref(), Some("wontfix"));

        let report = coordinator(&platform).sweep(&config, now()).await.unwrap();
        assert_eq!(report.marked, 0);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_label_lookups_cover_every_labelled_candidate() {
        let platform = Arc::new(InMemoryPlatform::new());
        for number in 1..=4 {
            platform.insert(issue(number, 70).with_label("wontfix")).await;
            platform
                .set_label_applied_at(&repo(), number, "wontfix", now() - Duration::days(10))
                .await;
        }

        let report = coordinator(&platform)
            .with_max_concurrency(2)
            .sweep(&config(""), now())
            .await
            .unwrap();

        assert_eq!(report.examined, 4);
        assert_eq!(report.closed, 4);
    }

    #[tokio::test]
    async fn test_stale_since_is_looked_up() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(5, 70).with_label("wontfix")).await;
        platform
            .set_label_applied_at(&repo(), 5, "wontfix", now() - Duration::days(2))
            .await;

        let report = coordinator(&platform).sweep(&config(""), now()).await.unwrap();

        // 70 days idle but labelled two days ago: not yet closable
        assert_eq!(report.closed, 0);
        assert_eq!(report.examined, 1);
    }

    #[tokio::test]
    async fn test_enumeration_failure_aborts() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.fail_listing_for(&repo()).await;

        let result = coordinator(&platform).sweep(&config(""), now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_disabled_config_does_nothing() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 400)).await;

        let report = coordinator(&platform)
            .sweep(&RepositoryConfig::disabled(repo()), now())
            .await
            .unwrap();

        assert_eq!(report.examined, 0);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_override_applies() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert(issue(1, 20)).await;
        platform
            .insert(TrackedItem::new(repo(), 2, ItemKind::PullRequest, now() - Duration::days(20)))
            .await;

        let report = coordinator(&platform)
            .sweep(&config("pulls:\n  daysUntilStale: 14\n"), now())
            .await
            .unwrap();

        assert_eq!(report.marked, 1);
        assert!(platform.item(&repo(), 2).await.unwrap().has_label("wontfix"));
        assert!(!platform.item(&repo(), 1).await.unwrap().has_label("wontfix"));
    }

    #[test]
    fn test_candidate_queries_push_down_filters() {
        let queries = candidate_queries(ItemKind::Issue, &config(""), now());
        assert_eq!(queries.len(), 2);
        assert!(queries[0].without_labels.contains(&"wontfix".to_string()));
        assert!(queries[0].without_labels.contains(&"pinned".to_string()));
        assert_eq!(queries[0].updated_before, Some(now() - Duration::days(60)));
        assert_eq!(queries[1].with_label.as_deref(), Some("wontfix"));

        let no_close = candidate_queries(ItemKind::Issue, &config("daysUntilClose: false\n"), now());
        assert_eq!(no_close.len(), 1);
    }
}
