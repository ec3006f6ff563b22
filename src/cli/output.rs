//! Output formatting for CLI commands.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::{LifecycleAction, RepositoryConfig, SweepReport};
use crate::services::RouteOutcome;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

fn key_value_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for (key, value) in rows {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(value).set_alignment(CellAlignment::Left),
        ]);
    }
    table
}

impl CommandOutput for SweepReport {
    fn to_human(&self) -> String {
        let table = key_value_table(&[
            ("Examined", self.examined.to_string()),
            ("Marked", self.marked.to_string()),
            ("Unmarked", self.unmarked.to_string()),
            ("Closed", self.closed.to_string()),
            ("Would mark", self.would_mark.to_string()),
            ("Would unmark", self.would_unmark.to_string()),
            ("Would close", self.would_close.to_string()),
            ("Deferred", self.deferred.to_string()),
            ("Failures", self.failures.to_string()),
        ]);
        format!("Sweep of {} (run {}):\n{table}", self.repo, self.run_id)
    }
}

fn describe(action: &LifecycleAction) -> String {
    match action {
        LifecycleAction::AddLabel { label } => format!("added label '{label}'"),
        LifecycleAction::RemoveLabel { label } => format!("removed label '{label}'"),
        LifecycleAction::Comment { .. } => "commented".to_string(),
        LifecycleAction::Close => "closed".to_string(),
        LifecycleAction::Report { verdict } => format!("would {} (report only)", verdict.as_str()),
    }
}

impl CommandOutput for RouteOutcome {
    fn to_human(&self) -> String {
        match self {
            Self::IgnoredBot => "Ignored: activity by a bot account.".to_string(),
            Self::Disabled { repo } => format!("{repo} has no usable stale configuration; nothing done."),
            Self::Unchanged { repo, number } => format!("{repo}#{number}: no change needed."),
            Self::Applied {
                repo,
                number,
                verdict,
                outcome,
            } => {
                let steps: Vec<String> = outcome.applied.iter().map(describe).collect();
                format!("{repo}#{number}: {} ({})", verdict.as_str(), steps.join(", "))
            }
            Self::Swept(report) => report.to_human(),
            Self::Failed { repo, reason } => format!("{repo}: failed: {reason}"),
        }
    }
}

fn or_none(value: Option<&String>) -> String {
    value.map_or_else(|| "(none)".to_string(), Clone::clone)
}

fn join(labels: &std::collections::BTreeSet<String>) -> String {
    if labels.is_empty() {
        "(none)".to_string()
    } else {
        labels.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl CommandOutput for RepositoryConfig {
    fn to_human(&self) -> String {
        let table = key_value_table(&[
            ("Perform", self.perform.to_string()),
            ("Stale label", self.stale_label.clone()),
            ("Days until stale", self.days_until_stale.to_string()),
            (
                "Days until close",
                self.days_until_close.map_or_else(|| "never".to_string(), |d| d.to_string()),
            ),
            ("Exempt labels", join(&self.exempt_labels)),
            ("Only labels", join(&self.only_labels)),
            ("Exempt projects", self.exempt_projects.to_string()),
            ("Exempt milestones", self.exempt_milestones.to_string()),
            ("Exempt assignees", self.exempt_assignees.to_string()),
            ("Only", self.only.map_or("issues and pulls", |k| k.as_str()).to_string()),
            ("Limit per run", self.limit_per_run.to_string()),
            ("Close age basis", format!("{:?}", self.close_age_basis)),
            ("Mark comment", or_none(self.mark_comment.as_ref())),
            ("Unmark comment", or_none(self.unmark_comment.as_ref())),
            ("Close comment", or_none(self.close_comment.as_ref())),
        ]);
        format!("Effective configuration:\n{table}")
    }
}
