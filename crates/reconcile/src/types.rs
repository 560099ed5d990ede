//! Planned actions and run reports

use crate::object::LocalId;
use crate::resource::RemoteId;
use serde::Serialize;
use std::fmt;

/// What a run does with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Desired object unknown to the backend
    Create,
    /// Remote object differs from the desired one
    Update,
    /// Remote object gone, or no longer desired
    Delete,
    /// Remote object matches
    Skip,
    /// Resource in an impossible stage; aborts the run
    Ignore,
}

impl Action {
    /// Whether the action mutates the backend
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Skip => "skip",
            Self::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// One classified resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// Stable identifier
    pub local_id: LocalId,
    /// Remote id known before the run, if any
    pub remote_id: Option<RemoteId>,
    /// Name of the provider owning the resource
    pub provider: String,
    pub action: Action,
    /// Unified diff lines; empty for skips and deletions
    pub diff: Vec<String>,
}

/// Counts per action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
}

impl PlanSummary {
    /// Total number of backend mutations
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Total number of resources classified
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped
    }

    /// Count one action
    pub fn add(&mut self, action: Action) {
        match action {
            Action::Create => self.created += 1,
            Action::Update => self.updated += 1,
            Action::Delete => self.deleted += 1,
            Action::Skip => self.skipped += 1,
            Action::Ignore => {}
        }
    }
}

/// Outcome of `Monitor::apply`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// The run only planned
    pub dry_run: bool,
    /// The confirmation callback refused the changes
    pub declined: bool,
    /// Providers were asked to apply changes and the state was committed
    pub applied: bool,
    /// Every classified resource, grouped by provider
    pub actions: Vec<PlannedAction>,
    pub summary: PlanSummary,
}

impl ApplyReport {
    /// Record a classified resource
    pub fn push(&mut self, action: PlannedAction) {
        self.summary.add(action.action);
        self.actions.push(action);
    }

    /// Planned actions that mutate the backend
    pub fn changes(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter().filter(|a| a.action.is_change())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = PlanSummary::default();
        for action in [Action::Create, Action::Update, Action::Skip, Action::Delete, Action::Skip] {
            summary.add(action);
        }
        assert_eq!(summary.total_changes(), 3);
        assert_eq!(summary.total(), 5);
        assert!(summary.has_changes());
        assert!(!PlanSummary::default().has_changes());
    }

    #[test]
    fn test_report_changes() {
        let mut report = ApplyReport::default();
        report.push(PlannedAction {
            local_id: LocalId::new("Folder", "ops").unwrap(),
            remote_id: None,
            provider: "memory".into(),
            action: Action::Create,
            diff: vec!["+{}".into()],
        });
        report.push(PlannedAction {
            local_id: LocalId::new("Folder", "dev").unwrap(),
            remote_id: Some("r1".into()),
            provider: "memory".into(),
            action: Action::Skip,
            diff: Vec::new(),
        });
        assert_eq!(report.changes().count(), 1);
        assert_eq!(report.summary.skipped, 1);
    }
}
