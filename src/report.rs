//! Plan display

use colored::{ColoredString, Colorize};
use reconcile::{Action, ApplyReport, PlanSummary, PlannedAction};

/// Symbol shown in front of a planned action
fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::Delete => "-".red(),
        Action::Skip => "=".dimmed(),
        Action::Ignore => "?".dimmed(),
    }
}

/// Color one unified diff line
fn diff_line(line: &str) -> ColoredString {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with("@@") {
        line.cyan()
    } else {
        line.normal()
    }
}

fn describe(action: &PlannedAction) -> String {
    match (&action.action, &action.remote_id) {
        (Action::Create, _) => "(new)".to_string(),
        (Action::Delete, Some(remote_id)) => format!("(will remove {remote_id})"),
        (_, Some(remote_id)) => remote_id.clone(),
        (_, None) => String::new(),
    }
}

/// Display planned actions grouped by provider
///
/// Unchanged objects are only listed when `show_unchanged` is set.
pub fn display_report(report: &ApplyReport, show_unchanged: bool) {
    if !report.summary.has_changes() {
        println!();
        println!(
            "  {} No changes needed ({} up to date)",
            "✓".green(),
            report.summary.skipped
        );
        if !show_unchanged {
            return;
        }
    }

    let mut providers: Vec<&str> = Vec::new();
    for action in &report.actions {
        if !providers.contains(&action.provider.as_str()) {
            providers.push(&action.provider);
        }
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Monitoring Plan".bold()
    );
    println!("│");

    for provider in providers {
        let actions: Vec<&PlannedAction> = report
            .actions
            .iter()
            .filter(|a| a.provider == provider)
            .filter(|a| show_unchanged || a.action != Action::Skip)
            .collect();
        if actions.is_empty() {
            continue;
        }

        println!("│ {}", provider.bold());
        for action in actions {
            println!(
                "│   {} {:<36} {}",
                symbol(action.action),
                action.local_id.to_string(),
                describe(action).dimmed()
            );
            for line in &action.diff {
                println!("│       {}", diff_line(line));
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Summary: {}", summary_line(&report.summary));
    println!("└─────────────────────────────────────────────────────┘");
}

/// "2 to create, 1 to update, 0 to delete, 4 unchanged"
pub fn summary_line(summary: &PlanSummary) -> String {
    format!(
        "{} to create, {} to update, {} to delete, {} unchanged",
        summary.created.to_string().green(),
        summary.updated.to_string().yellow(),
        summary.deleted.to_string().red(),
        summary.skipped
    )
}

/// Print the outcome of an apply
pub fn print_outcome(report: &ApplyReport) {
    println!();
    if report.dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }
    if report.declined {
        println!("  {} Aborted", "✗".red());
        return;
    }
    if !report.summary.has_changes() {
        return;
    }

    println!("  {} Monitoring objects applied!", "✓".green().bold());
    let summary = &report.summary;
    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} updated", summary.updated);
    }
    if summary.deleted > 0 {
        println!("    • {} deleted", summary.deleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::LocalId;

    #[test]
    fn test_describe() {
        let mut action = PlannedAction {
            local_id: LocalId::new("Folder", "ops").unwrap(),
            remote_id: Some("abc".into()),
            provider: "grafana".into(),
            action: Action::Delete,
            diff: Vec::new(),
        };
        assert_eq!(describe(&action), "(will remove abc)");

        action.action = Action::Update;
        assert_eq!(describe(&action), "abc");

        action.action = Action::Create;
        action.remote_id = None;
        assert_eq!(describe(&action), "(new)");
    }

    #[test]
    fn test_summary_line_mentions_every_count() {
        colored::control::set_override(false);
        let summary = PlanSummary {
            created: 2,
            updated: 1,
            deleted: 0,
            skipped: 4,
        };
        assert_eq!(
            summary_line(&summary),
            "2 to create, 1 to update, 0 to delete, 4 unchanged"
        );
    }
}
