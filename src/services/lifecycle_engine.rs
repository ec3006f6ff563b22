//! Lifecycle engine: turns classifier verdicts into platform mutations.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LifecycleAction, RepositoryConfig, TrackedItem, Verdict};
use crate::domain::ports::IssuePlatform;

/// What applying a plan actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub applied: Vec<LifecycleAction>,
    /// The verdict was only reported because `perform` is off.
    pub reported: bool,
}

/// Expand a verdict into the ordered actions that realise it.
///
/// Mark adds the label before commenting; close comments before closing so
/// the explanation lands on the item while it is still open. With `perform`
/// off every actionable verdict collapses to a single [`LifecycleAction::Report`].
pub fn plan(verdict: Verdict, config: &RepositoryConfig) -> Vec<LifecycleAction> {
    let label = config.stale_label.clone();
    let comment = |body: &Option<String>| {
        body.as_ref()
            .filter(|b| !b.trim().is_empty())
            .map(|b| LifecycleAction::Comment { body: b.clone() })
    };

    match verdict {
        Verdict::NoOp => vec![],
        _ if !config.perform => vec![LifecycleAction::Report { verdict }],
        Verdict::Mark => std::iter::once(LifecycleAction::AddLabel { label })
            .chain(comment(&config.mark_comment))
            .collect(),
        Verdict::Unmark => std::iter::once(LifecycleAction::RemoveLabel { label })
            .chain(comment(&config.unmark_comment))
            .collect(),
        Verdict::Close => comment(&config.close_comment)
            .into_iter()
            .chain(std::iter::once(LifecycleAction::Close))
            .collect(),
    }
}

/// Applies planned actions through the platform port.
pub struct LifecycleEngine {
    platform: Arc<dyn IssuePlatform>,
}

impl LifecycleEngine {
    pub fn new(platform: Arc<dyn IssuePlatform>) -> Self {
        Self { platform }
    }

    /// Plan and apply in one step.
    pub async fn execute(
        &self,
        verdict: Verdict,
        item: &TrackedItem,
        config: &RepositoryConfig,
    ) -> DomainResult<ActionOutcome> {
        let actions = plan(verdict, config);
        self.apply(item, &actions).await
    }

    /// Apply actions in order. The first failing action stops the item and
    /// is returned as a `MutationFailure`; the caller decides whether the
    /// batch continues.
    pub async fn apply(&self, item: &TrackedItem, actions: &[LifecycleAction]) -> DomainResult<ActionOutcome> {
        let mut outcome = ActionOutcome::default();

        for action in actions {
            let result = match action {
                LifecycleAction::AddLabel { label } => {
                    self.platform.add_label(&item.repo, item.number, label).await
                }
                LifecycleAction::RemoveLabel { label } => {
                    self.platform.remove_label(&item.repo, item.number, label).await
                }
                LifecycleAction::Comment { body } => {
                    self.platform.create_comment(&item.repo, item.number, body).await
                }
                LifecycleAction::Close => self.platform.close_item(&item.repo, item.number).await,
                LifecycleAction::Report { verdict } => {
                    tracing::info!(
                        item = %item.reference(),
                        title = %item.title,
                        verdict = verdict.as_str(),
                        "Report only, perform disabled"
                    );
                    outcome.reported = true;
                    Ok(())
                }
            };

            result.map_err(|e| match e {
                DomainError::MutationFailure { .. } => e,
                other => DomainError::mutation(&item.repo, item.number, action.as_str(), other),
            })?;

            tracing::debug!(item = %item.reference(), action = action.as_str(), "Applied action");
            outcome.applied.push(action.clone());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPlatform, Mutation};
    use crate::domain::models::{ItemKind, ItemState, RepoId};
    use chrono::{Duration, Utc};

    fn repo() -> RepoId {
        RepoId::new("octo", "widgets")
    }

    fn config(yaml: &str) -> RepositoryConfig {
        RepositoryConfig::from_yaml(repo(), yaml).unwrap()
    }

    fn stale_issue() -> TrackedItem {
        TrackedItem::new(repo(), 7, ItemKind::Issue, Utc::now() - Duration::days(61))
    }

    #[test]
    fn test_plan_mark_with_comment() {
        let actions = plan(Verdict::Mark, &config("markComment: Going stale.\n"));
        assert_eq!(
            actions,
            vec![
                LifecycleAction::AddLabel {
                    label: "wontfix".to_string()
                },
                LifecycleAction::Comment {
                    body: "Going stale.".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_plan_mark_without_comment() {
        let actions = plan(Verdict::Mark, &config("markComment: false\n"));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_plan_close_orders_comment_first() {
        let actions = plan(Verdict::Close, &config("closeComment: Bye.\n"));
        assert_eq!(
            actions,
            vec![
                LifecycleAction::Comment {
                    body: "Bye.".to_string()
                },
                LifecycleAction::Close,
            ]
        );
    }

    #[test]
    fn test_plan_close_in_dry_run_only_reports() {
        let actions = plan(Verdict::Close, &config("perform: false\ncloseComment: Bye.\n"));
        assert_eq!(
            actions,
            vec![LifecycleAction::Report {
                verdict: Verdict::Close
            }]
        );
    }

    #[test]
    fn test_plan_mark_and_unmark_in_dry_run_only_report() {
        let config = config("perform: false
markComment: Going stale.
unmarkComment: Welcome back.
");
        for verdict in [Verdict::Mark, Verdict::Unmark] {
            assert_eq!(plan(verdict, &config), vec![LifecycleAction::Report { verdict }]);
        }
    }

    #[test]
    fn test_plan_noop_is_empty() {
        assert!(plan(Verdict::NoOp, &config("")).is_empty());
    }

    #[tokio::test]
    async fn test_mark_twice_is_idempotent() {
        let platform = Arc::new(InMemoryPlatform::new());
        let item = stale_issue();
        platform.insert(item.clone()).await;
        let engine = LifecycleEngine::new(platform.clone());
        let config = config("markComment: false\n");

        engine.execute(Verdict::Mark, &item, &config).await.unwrap();
        let once = platform.item(&repo(), 7).await.unwrap().labels;
        engine.execute(Verdict::Mark, &item, &config).await.unwrap();
        let twice = platform.item(&repo(), 7).await.unwrap().labels;

        assert_eq!(once, twice);
        assert!(twice.contains("wontfix"));
    }

    #[tokio::test]
    async fn test_unmark_absent_label_is_not_an_error() {
        let platform = Arc::new(InMemoryPlatform::new());
        let item = stale_issue();
        platform.insert(item.clone()).await;
        let engine = LifecycleEngine::new(platform.clone());

        let outcome = engine.execute(Verdict::Unmark, &item, &config("")).await.unwrap();
        assert_eq!(outcome.applied.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_close_never_closes() {
        let platform = Arc::new(InMemoryPlatform::new());
        let item = stale_issue().with_label("wontfix");
        platform.insert(item.clone()).await;
        let engine = LifecycleEngine::new(platform.clone());

        let outcome = engine
            .execute(Verdict::Close, &item, &config("perform: false\n"))
            .await
            .unwrap();

        assert!(outcome.reported);
        assert_eq!(platform.item(&repo(), 7).await.unwrap().state, ItemState::Open);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_mark_leaves_item_untouched() {
        let platform = Arc::new(InMemoryPlatform::new());
        let item = stale_issue();
        platform.insert(item.clone()).await;
        let engine = LifecycleEngine::new(platform.clone());

        let outcome = engine
            .execute(Verdict::Mark, &item, &config("perform: false
markComment: Going stale.
"))
            .await
            .unwrap();

        assert!(outcome.reported);
        assert!(!platform.item(&repo(), 7).await.unwrap().has_label("wontfix"));
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported_as_mutation_failure() {
        let platform = Arc::new(InMemoryPlatform::new());
        let item = stale_issue();
        platform.insert(item.clone()).await;
        platform.fail_mutations_for(7).await;
        let engine = LifecycleEngine::new(platform.clone());

        let err = engine.execute(Verdict::Mark, &item, &config("")).await.unwrap_err();
        assert!(matches!(err, DomainError::MutationFailure { number: 7, .. }));
        assert!(!platform
            .mutations()
            .await
            .iter()
            .any(|m| matches!(m, Mutation::Comment { .. })));
    }
}
