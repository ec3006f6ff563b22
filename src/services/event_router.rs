//! Trigger dispatch.
//!
//! Activity notifications run the unmark branch on the single affected
//! item; scheduled sweeps run a full mark-and-sweep. The decision part
//! ([`route`], [`needs_detail_fetch`]) is pure; [`EventRouter::handle`]
//! performs the effects around it.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::domain::models::{
    ActivityEvent, Config, LifecycleAction, RepoId, RepositoryConfig, SweepReport, TrackedItem, Trigger,
    Verdict,
};
use crate::domain::ports::{Clock, IssuePlatform, ScheduleStore};
use crate::services::config_resolver::ConfigResolver;
use crate::services::lifecycle_engine::{self, ActionOutcome, LifecycleEngine};
use crate::services::marker_classifier;
use crate::services::sweep_coordinator::{SweepCoordinator, DEFAULT_MAX_CONCURRENCY};

/// Verdict plus the explicit actions that realise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub verdict: Verdict,
    pub actions: Vec<LifecycleAction>,
}

/// What handling one trigger amounted to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Bot-authored activity, dropped at the boundary.
    IgnoredBot,
    /// The repository has no usable configuration.
    Disabled { repo: RepoId },
    /// Activity that required no change.
    Unchanged { repo: RepoId, number: u64 },
    /// Activity whose verdict was applied.
    Applied {
        repo: RepoId,
        number: u64,
        verdict: Verdict,
        outcome: ActionOutcome,
    },
    Swept(SweepReport),
    /// The trigger could not be completed; unrelated work is unaffected.
    Failed { repo: RepoId, reason: String },
}

/// Whether the payload lacks what the unmark branch needs, so the item must
/// be fetched before classification.
pub fn needs_detail_fetch(event: &ActivityEvent) -> bool {
    event.item.is_none() || !event.labels_known
}

/// Decide the unmark branch for one activity event.
pub fn route(event: &ActivityEvent, item: &TrackedItem, config: &RepositoryConfig) -> RoutingDecision {
    let config = config.for_kind(item.kind);
    let verdict = if config.processes(item.kind) {
        marker_classifier::classify_activity(item, &config, event)
    } else {
        Verdict::NoOp
    };
    RoutingDecision {
        verdict,
        actions: lifecycle_engine::plan(verdict, &config),
    }
}

/// Tunables for routing and schedule bookkeeping.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub dry_run: bool,
    pub max_concurrency: usize,
    pub visit_interval: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            visit_interval: Duration::hours(1),
            max_consecutive_failures: 5,
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            max_concurrency: config.sweep.max_concurrency,
            visit_interval: i64::try_from(config.scheduler.visit_interval_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or_else(|| Duration::hours(1)),
            max_consecutive_failures: config.scheduler.max_consecutive_failures,
        }
    }
}

pub struct EventRouter {
    platform: Arc<dyn IssuePlatform>,
    schedule: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    resolver: ConfigResolver,
    engine: Arc<LifecycleEngine>,
    coordinator: SweepCoordinator,
    settings: RouterSettings,
}

impl EventRouter {
    pub fn new(
        platform: Arc<dyn IssuePlatform>,
        schedule: Arc<dyn ScheduleStore>,
        clock: Arc<dyn Clock>,
        settings: RouterSettings,
    ) -> Self {
        let resolver = ConfigResolver::new(platform.clone(), schedule.clone()).with_dry_run(settings.dry_run);
        let engine = Arc::new(LifecycleEngine::new(platform.clone()));
        let coordinator =
            SweepCoordinator::new(platform.clone(), engine.clone()).with_max_concurrency(settings.max_concurrency);

        Self {
            platform,
            schedule,
            clock,
            resolver,
            engine,
            coordinator,
            settings,
        }
    }

    pub fn schedule(&self) -> &Arc<dyn ScheduleStore> {
        &self.schedule
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Handle one trigger. Never fails the caller: problems are logged and
    /// reported as [`RouteOutcome::Failed`].
    pub async fn handle(&self, trigger: Trigger) -> RouteOutcome {
        match trigger {
            Trigger::Activity(event) => self.handle_activity(event).await,
            Trigger::Sweep { repo } => self.handle_sweep(repo).await,
        }
    }

    async fn handle_activity(&self, event: ActivityEvent) -> RouteOutcome {
        if event.actor.is_bot {
            tracing::debug!(repo = %event.repo, number = event.number, actor = %event.actor.login, "Ignoring bot activity");
            return RouteOutcome::IgnoredBot;
        }

        let config = self.resolver.resolve(&event.repo).await;
        if !config.enabled {
            return RouteOutcome::Disabled { repo: event.repo };
        }

        let item = match (&event.item, needs_detail_fetch(&event)) {
            (Some(item), false) => item.clone(),
            _ => match self.platform.get_item(&event.repo, event.number).await {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(repo = %event.repo, number = event.number, error = %e, "Item fetch failed, skipping");
                    return RouteOutcome::Failed {
                        repo: event.repo,
                        reason: e.to_string(),
                    };
                }
            },
        };

        let decision = route(&event, &item, &config);
        if !decision.verdict.is_actionable() {
            return RouteOutcome::Unchanged {
                repo: event.repo,
                number: event.number,
            };
        }

        match self.engine.apply(&item, &decision.actions).await {
            Ok(outcome) => {
                tracing::info!(
                    item = %item.reference(),
                    verdict = decision.verdict.as_str(),
                    activity = event.kind.as_str(),
                    actor = %event.actor.login,
                    "Applied verdict for activity"
                );
                RouteOutcome::Applied {
                    repo: event.repo,
                    number: event.number,
                    verdict: decision.verdict,
                    outcome,
                }
            }
            Err(e) => {
                tracing::warn!(item = %item.reference(), error = %e, "Mutation failed");
                RouteOutcome::Failed {
                    repo: event.repo,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn handle_sweep(&self, repo: RepoId) -> RouteOutcome {
        let config = self.resolver.resolve(&repo).await;
        if !config.enabled {
            tracing::debug!(repo = %repo, "Repository disabled, skipping sweep");
            return RouteOutcome::Disabled { repo };
        }

        let now = self.clock.now();
        let mut entry = match self.schedule.ensure(&repo, now).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(repo = %repo, error = %e, "Schedule store unavailable, sweeping without bookkeeping");
                None
            }
        };

        let result = self.coordinator.sweep(&config, now).await;

        if let Some(entry) = entry.as_mut() {
            match &result {
                Ok(_) => entry.rearm(now, self.settings.visit_interval),
                Err(_) => {
                    let still_enabled =
                        entry.record_failure(now, self.settings.visit_interval, self.settings.max_consecutive_failures);
                    if !still_enabled {
                        tracing::warn!(
                            repo = %repo,
                            failures = entry.consecutive_failures,
                            "Repository disabled after repeated sweep failures"
                        );
                    }
                }
            }
            if let Err(e) = self.schedule.update(entry).await {
                tracing::error!(repo = %repo, error = %e, "Failed to update schedule entry");
            }
        }

        match result {
            Ok(report) => RouteOutcome::Swept(report),
            Err(e) => RouteOutcome::Failed {
                repo,
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPlatform, InMemoryScheduleStore};
    use crate::domain::models::{ActivityKind, Actor, ItemKind};
    use crate::domain::ports::FixedClock;
    use chrono::{DateTime, Utc};

    fn repo() -> RepoId {
        RepoId::new("octo", "widgets")
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Harness {
        platform: Arc<InMemoryPlatform>,
        schedule: Arc<InMemoryScheduleStore>,
        router: EventRouter,
    }

    fn harness() -> Harness {
        let clock = Arc::new(FixedClock::new(now()));
        let platform = Arc::new(InMemoryPlatform::with_clock(clock.clone()));
        let schedule = Arc::new(InMemoryScheduleStore::new());
        let router = EventRouter::new(platform.clone(), schedule.clone(), clock, RouterSettings::default());
        Harness {
            platform,
            schedule,
            router,
        }
    }

    fn stale_issue() -> TrackedItem {
        TrackedItem::new(repo(), 3, ItemKind::Issue, now() - Duration::days(70)).with_label("wontfix")
    }

    fn comment_by(actor: Actor) -> ActivityEvent {
        ActivityEvent::new(repo(), 3, actor, ActivityKind::IssueComment, "created")
    }

    #[test]
    fn test_route_is_pure_and_plans_actions() {
        let config = RepositoryConfig::from_yaml(repo(), "unmarkComment: Welcome back.\n").unwrap();
        let decision = route(&comment_by(Actor::user("alice")), &stale_issue(), &config);

        assert_eq!(decision.verdict, Verdict::Unmark);
        assert_eq!(decision.actions.len(), 2);
    }

    #[test]
    fn test_needs_detail_fetch() {
        let bare = comment_by(Actor::user("alice"));
        assert!(needs_detail_fetch(&bare));
        assert!(needs_detail_fetch(&bare.clone().with_partial_item(stale_issue())));
        assert!(!needs_detail_fetch(&bare.with_item(stale_issue())));
    }

    #[tokio::test]
    async fn test_comment_unmarks() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.insert(stale_issue()).await;

        let outcome = h
            .router
            .handle(Trigger::Activity(comment_by(Actor::user("alice"))))
            .await;

        assert!(matches!(outcome, RouteOutcome::Applied { verdict: Verdict::Unmark, .. }));
        assert!(!h.platform.item(&repo(), 3).await.unwrap().has_label("wontfix"));
    }

    #[tokio::test]
    async fn test_bot_activity_is_ignored() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.insert(stale_issue()).await;

        let outcome = h
            .router
            .handle(Trigger::Activity(comment_by(Actor::bot("stale[bot]"))))
            .await;

        assert!(matches!(outcome, RouteOutcome::IgnoredBot));
        assert!(h.platform.item(&repo(), 3).await.unwrap().has_label("wontfix"));
    }

    #[tokio::test]
    async fn test_stale_label_event_does_not_unmark() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.insert(stale_issue()).await;
        let event = ActivityEvent::new(repo(), 3, Actor::user("alice"), ActivityKind::Issue, "labeled")
            .with_label("wontfix")
            .with_item(stale_issue());

        let outcome = h.router.handle(Trigger::Activity(event)).await;

        assert!(matches!(outcome, RouteOutcome::Unchanged { .. }));
        assert!(h.platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_payload_without_labels_fetches_item() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.insert(stale_issue()).await;
        let partial = TrackedItem::new(repo(), 3, ItemKind::Issue, now());
        let event = comment_by(Actor::user("alice")).with_partial_item(partial);

        let outcome = h.router.handle(Trigger::Activity(event)).await;
        assert!(matches!(outcome, RouteOutcome::Applied { verdict: Verdict::Unmark, .. }));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.fail_fetch_for(3).await;

        let outcome = h
            .router
            .handle(Trigger::Activity(comment_by(Actor::user("alice"))))
            .await;
        assert!(matches!(outcome, RouteOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_repository_is_disabled_and_unscheduled() {
        let h = harness();
        h.schedule.ensure(&repo(), now()).await.unwrap();
        h.platform
            .insert(TrackedItem::new(repo(), 1, ItemKind::Issue, now() - Duration::days(400)))
            .await;

        let first = h.router.handle(Trigger::Sweep { repo: repo() }).await;
        let second = h.router.handle(Trigger::Sweep { repo: repo() }).await;

        assert!(matches!(first, RouteOutcome::Disabled { .. }));
        assert!(matches!(second, RouteOutcome::Disabled { .. }));
        assert!(h.schedule.get(&repo()).await.unwrap().is_none());
        assert!(h.platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_rearms_schedule() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;

        let outcome = h.router.handle(Trigger::Sweep { repo: repo() }).await;

        assert!(matches!(outcome, RouteOutcome::Swept(_)));
        let entry = h.schedule.get(&repo()).await.unwrap().unwrap();
        assert_eq!(entry.last_visited_at, Some(now()));
        assert_eq!(entry.next_visit_at, now() + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_repeated_sweep_failures_disable_entry() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        h.platform.fail_listing_for(&repo()).await;

        for _ in 0..5 {
            let outcome = h.router.handle(Trigger::Sweep { repo: repo() }).await;
            assert!(matches!(outcome, RouteOutcome::Failed { .. }));
        }

        let entry = h.schedule.get(&repo()).await.unwrap().unwrap();
        assert!(!entry.enabled);
        assert_eq!(entry.consecutive_failures, 5);
    }

    #[tokio::test]
    async fn test_successful_sweep_reenables_disabled_entry() {
        let h = harness();
        h.platform.set_config(&repo(), "").await;
        let mut entry = h.schedule.ensure(&repo(), now()).await.unwrap();
        entry.enabled = false;
        entry.consecutive_failures = 5;
        h.schedule.update(&entry).await.unwrap();

        let outcome = h.router.handle(Trigger::Sweep { repo: repo() }).await;

        assert!(matches!(outcome, RouteOutcome::Swept(_)));
        let entry = h.schedule.get(&repo()).await.unwrap().unwrap();
        assert!(entry.enabled);
        assert_eq!(entry.consecutive_failures, 0);
        assert!(entry.is_due(now() + Duration::hours(1)));
    }

    #[tokio::test]
    async fn test_report_only_activity_keeps_label() {
        let h = harness();
        h.platform.set_config(&repo(), "perform: false\nunmarkComment: Welcome back.\n").await;
        h.platform.insert(stale_issue()).await;

        let outcome = h
            .router
            .handle(Trigger::Activity(comment_by(Actor::user("alice"))))
            .await;

        match outcome {
            RouteOutcome::Applied { verdict, outcome, .. } => {
                assert_eq!(verdict, Verdict::Unmark);
                assert!(outcome.reported);
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert!(h.platform.item(&repo(), 3).await.unwrap().has_label("wontfix"));
        assert!(h.platform.mutations().await.is_empty());
    }

    #[test]
    fn test_route_outcome_json_for_every_variant() {
        let report = SweepReport::new(repo(), now());
        let outcomes = [
            (RouteOutcome::IgnoredBot, "ignored_bot"),
            (RouteOutcome::Disabled { repo: repo() }, "disabled"),
            (RouteOutcome::Unchanged { repo: repo(), number: 3 }, "unchanged"),
            (
                RouteOutcome::Applied {
                    repo: repo(),
                    number: 3,
                    verdict: Verdict::Mark,
                    outcome: ActionOutcome::default(),
                },
                "applied",
            ),
            (RouteOutcome::Swept(report), "swept"),
            (
                RouteOutcome::Failed {
                    repo: repo(),
                    reason: "boom".to_string(),
                },
                "failed",
            ),
        ];

        for (outcome, tag) in outcomes {
            let value = serde_json::to_value(&outcome).unwrap();
            assert_eq!(value["result"], tag, "{value}");
        }
    }
}
