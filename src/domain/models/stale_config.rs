//! Per-repository stale configuration.
//!
//! The repository-committed document (`.github/stale.yml`) is parsed into a
//! [`StaleConfigDocument`] where every key is optional, then resolved
//! against built-in defaults into a [`RepositoryConfig`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::item::ItemKind;
use super::repository::RepoId;
use crate::domain::errors::{DomainError, DomainResult};

/// Well-known path of the configuration document inside a repository.
pub const CONFIG_PATH: &str = ".github/stale.yml";

pub const DEFAULT_DAYS_UNTIL_STALE: u32 = 60;
pub const DEFAULT_DAYS_UNTIL_CLOSE: u32 = 7;
pub const DEFAULT_STALE_LABEL: &str = "wontfix";
pub const DEFAULT_EXEMPT_LABELS: [&str; 2] = ["pinned", "security"];
pub const DEFAULT_MARK_COMMENT: &str = "This issue has been automatically marked as stale \
because it has not had recent activity. It will be closed if no further activity occurs. \
Thank you for your contributions.";
/// Upper bound on mutating actions per sweep.
pub const MAX_LIMIT_PER_RUN: usize = 30;
/// Upper bound for `daysUntilStale` and `daysUntilClose` (one hundred years).
pub const MAX_DAYS: u32 = 36_500;

/// A value that may be switched off with `false` in the document.
///
/// `false` disables the setting, `true` keeps the default, any other value
/// replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Switch<T> {
    Flag(bool),
    Value(T),
}

impl<T: Clone> Switch<T> {
    fn resolve(&self, default: Option<T>) -> Option<T> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => default,
            Self::Value(v) => Some(v.clone()),
        }
    }
}

/// Which timestamp the close threshold is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseAgeBasis {
    /// Time since the stale label was applied (falls back to last activity
    /// when the platform cannot tell).
    #[default]
    StaleLabel,
    /// Time since the last activity on the item.
    LastActivity,
}

/// Restricts processing to one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlyKind {
    Issues,
    Pulls,
}

impl OnlyKind {
    pub const fn kind(self) -> ItemKind {
        match self {
            Self::Issues => ItemKind::Issue,
            Self::Pulls => ItemKind::PullRequest,
        }
    }
}

/// Raw configuration document as committed to the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_stale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_close: Option<Switch<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt_milestones: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt_assignees: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_comment: Option<Switch<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmark_comment: Option<Switch<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_comment: Option<Switch<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perform: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<OnlyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_per_run: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_age_basis: Option<CloseAgeBasis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Box<StaleConfigDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulls: Option<Box<StaleConfigDocument>>,
}

impl StaleConfigDocument {
    /// Parse YAML text. Empty or comment-only documents yield all defaults.
    pub fn from_yaml(text: &str) -> DomainResult<Self> {
        let blank = text
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if blank {
            return Ok(Self::default());
        }

        let doc: Option<Self> = serde_yaml::from_str(text)?;
        Ok(doc.unwrap_or_default())
    }

    /// Per-kind override section, if present.
    pub fn override_for(&self, kind: ItemKind) -> Option<&Self> {
        match kind {
            ItemKind::Issue => self.issues.as_deref(),
            ItemKind::PullRequest => self.pulls.as_deref(),
        }
    }

    /// Field-wise merge: values from `over` win where set.
    pub fn overlay(&self, over: &Self) -> Self {
        Self {
            days_until_stale: over.days_until_stale.or(self.days_until_stale),
            days_until_close: over
                .days_until_close
                .clone()
                .or_else(|| self.days_until_close.clone()),
            stale_label: over.stale_label.clone().or_else(|| self.stale_label.clone()),
            exempt_labels: over
                .exempt_labels
                .clone()
                .or_else(|| self.exempt_labels.clone()),
            only_labels: over.only_labels.clone().or_else(|| self.only_labels.clone()),
            exempt_projects: over.exempt_projects.or(self.exempt_projects),
            exempt_milestones: over.exempt_milestones.or(self.exempt_milestones),
            exempt_assignees: over.exempt_assignees.or(self.exempt_assignees),
            mark_comment: over.mark_comment.clone().or_else(|| self.mark_comment.clone()),
            unmark_comment: over
                .unmark_comment
                .clone()
                .or_else(|| self.unmark_comment.clone()),
            close_comment: over
                .close_comment
                .clone()
                .or_else(|| self.close_comment.clone()),
            perform: over.perform.or(self.perform),
            only: over.only.or(self.only),
            limit_per_run: over.limit_per_run.or(self.limit_per_run),
            close_age_basis: over.close_age_basis.or(self.close_age_basis),
            // overrides do not nest
            issues: None,
            pulls: None,
        }
    }

    /// Force report-only mode, including inside per-kind overrides.
    pub fn force_dry_run(&mut self) {
        self.perform = Some(false);
        if let Some(issues) = self.issues.as_mut() {
            issues.perform = Some(false);
        }
        if let Some(pulls) = self.pulls.as_mut() {
            pulls.perform = Some(false);
        }
    }
}

/// Fully-defaulted configuration governing one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryConfig {
    pub repo: RepoId,
    /// `false` is the disabled sentinel: nothing is processed.
    pub enabled: bool,
    /// When `false`, every decision is computed and reported but never applied.
    pub perform: bool,
    pub stale_label: String,
    pub days_until_stale: u32,
    /// `None` disables closing.
    pub days_until_close: Option<u32>,
    pub exempt_labels: BTreeSet<String>,
    pub only_labels: BTreeSet<String>,
    pub exempt_projects: bool,
    pub exempt_milestones: bool,
    pub exempt_assignees: bool,
    pub mark_comment: Option<String>,
    pub unmark_comment: Option<String>,
    pub close_comment: Option<String>,
    pub only: Option<ItemKind>,
    pub limit_per_run: usize,
    pub close_age_basis: CloseAgeBasis,

    #[serde(skip)]
    source: StaleConfigDocument,
}

impl RepositoryConfig {
    /// Resolve a document against built-in defaults.
    pub fn from_document(repo: RepoId, doc: &StaleConfigDocument) -> Self {
        let exempt_labels = doc.exempt_labels.as_ref().map_or_else(
            || DEFAULT_EXEMPT_LABELS.iter().map(ToString::to_string).collect(),
            |labels| labels.iter().cloned().collect(),
        );

        Self {
            repo,
            enabled: true,
            perform: doc.perform.unwrap_or(true),
            stale_label: doc
                .stale_label
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STALE_LABEL.to_string()),
            days_until_stale: doc.days_until_stale.unwrap_or(DEFAULT_DAYS_UNTIL_STALE),
            days_until_close: doc
                .days_until_close
                .as_ref()
                .map_or(Some(DEFAULT_DAYS_UNTIL_CLOSE), |s| {
                    s.resolve(Some(DEFAULT_DAYS_UNTIL_CLOSE))
                }),
            exempt_labels,
            only_labels: doc
                .only_labels
                .as_ref()
                .map(|labels| labels.iter().cloned().collect())
                .unwrap_or_default(),
            exempt_projects: doc.exempt_projects.unwrap_or(false),
            exempt_milestones: doc.exempt_milestones.unwrap_or(false),
            exempt_assignees: doc.exempt_assignees.unwrap_or(false),
            mark_comment: doc
                .mark_comment
                .as_ref()
                .map_or_else(|| Some(DEFAULT_MARK_COMMENT.to_string()), |s| {
                    s.resolve(Some(DEFAULT_MARK_COMMENT.to_string()))
                }),
            unmark_comment: doc.unmark_comment.as_ref().and_then(|s| s.resolve(None)),
            close_comment: doc.close_comment.as_ref().and_then(|s| s.resolve(None)),
            only: doc.only.map(OnlyKind::kind),
            limit_per_run: doc
                .limit_per_run
                .unwrap_or(MAX_LIMIT_PER_RUN)
                .clamp(1, MAX_LIMIT_PER_RUN),
            close_age_basis: doc.close_age_basis.unwrap_or_default(),
            source: doc.clone(),
        }
    }

    /// Parse and resolve YAML text in one step.
    pub fn from_yaml(repo: RepoId, text: &str) -> DomainResult<Self> {
        let doc = StaleConfigDocument::from_yaml(text)?;
        let config = Self::from_document(repo, &doc);
        config.validate()?;
        for kind in ItemKind::all() {
            if doc.override_for(kind).is_some() {
                config.for_kind(kind).validate().map_err(|e| match e {
                    DomainError::ValidationFailed(reason) => {
                        DomainError::ValidationFailed(format!("{}: {reason}", kind.config_key()))
                    }
                    other => other,
                })?;
            }
        }
        Ok(config)
    }

    /// Configuration used when the repository has no readable document.
    pub fn disabled(repo: RepoId) -> Self {
        let doc = StaleConfigDocument {
            perform: Some(false),
            ..StaleConfigDocument::default()
        };
        let mut config = Self::from_document(repo, &doc);
        config.enabled = false;
        config
    }

    /// Effective configuration for one item kind, applying `issues:` /
    /// `pulls:` overrides from the document.
    pub fn for_kind(&self, kind: ItemKind) -> Self {
        let Some(over) = self.source.override_for(kind) else {
            return self.clone();
        };
        let mut resolved = Self::from_document(self.repo.clone(), &self.source.overlay(over));
        resolved.enabled = self.enabled;
        resolved.source = self.source.clone();
        resolved
    }

    /// Whether items of `kind` are processed at all.
    pub fn processes(&self, kind: ItemKind) -> bool {
        self.only.is_none_or(|only| only == kind)
    }

    /// Force report-only mode.
    pub fn into_dry_run(mut self) -> Self {
        self.perform = false;
        self.source.force_dry_run();
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.days_until_stale == 0 {
            return Err(DomainError::ValidationFailed(
                "daysUntilStale must be at least 1".to_string(),
            ));
        }
        if self.days_until_stale > MAX_DAYS || self.days_until_close.is_some_and(|d| d > MAX_DAYS) {
            return Err(DomainError::ValidationFailed(format!(
                "daysUntilStale and daysUntilClose must not exceed {MAX_DAYS}"
            )));
        }
        if self.exempt_labels.contains(&self.stale_label) {
            return Err(DomainError::ValidationFailed(format!(
                "staleLabel '{}' cannot also be an exempt label",
                self.stale_label
            )));
        }
        Ok(())
    }
}
