//! Repository visitation loop.
//!
//! Every tick the scheduler asks the schedule store for due repositories and
//! dispatches one sweep trigger per repository. Sweeps for different
//! repositories run in parallel; a tick waits for all of its sweeps, so the
//! same repository is never swept twice concurrently by the scheduler.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RepoId, Trigger};
use crate::services::event_router::{EventRouter, RouteOutcome};

pub struct RepoScheduler {
    router: Arc<EventRouter>,
    tick_interval: Duration,
}

impl RepoScheduler {
    pub fn new(router: Arc<EventRouter>, tick_interval: Duration) -> Self {
        Self {
            router,
            tick_interval: tick_interval.max(Duration::from_millis(10)),
        }
    }

    /// Register repositories so the first tick visits them.
    pub async fn seed(&self, repos: &[RepoId]) -> DomainResult<usize> {
        let now = self.router.clock().now();
        for repo in repos {
            self.router.schedule().ensure(repo, now).await?;
        }
        tracing::info!(count = repos.len(), "Seeded visit schedule");
        Ok(repos.len())
    }

    /// Sweep every due repository once.
    pub async fn tick(&self) -> DomainResult<Vec<RouteOutcome>> {
        let now = self.router.clock().now();
        let due = self.router.schedule().due(now).await?;
        if due.is_empty() {
            return Ok(vec![]);
        }
        tracing::debug!(due = due.len(), "Dispatching scheduled sweeps");

        let handles: Vec<_> = due
            .into_iter()
            .map(|entry| {
                let router = self.router.clone();
                tokio::spawn(async move { router.handle(Trigger::Sweep { repo: entry.repo }).await })
            })
            .collect();

        let outcomes = join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| {
                joined
                    .inspect_err(|e| tracing::error!(error = %e, "Scheduled sweep panicked"))
                    .ok()
            })
            .collect();
        Ok(outcomes)
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(tick_secs = self.tick_interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Scheduler tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
