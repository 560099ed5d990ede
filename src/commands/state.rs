//! `state list` and `state rm`

use anyhow::{Result, bail};
use reconcile::{LocalId, RemoteId, StateOptions};

use crate::Context;
use crate::config::Config;
use crate::ui;

pub fn list(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    let entries = entries(&config)?;

    ui::header("Tracked objects");
    if entries.is_empty() {
        ui::dim("Nothing tracked yet");
        return Ok(());
    }
    for (local_id, remote_id) in &entries {
        ui::kv(local_id, remote_id);
    }
    println!();
    ui::dim(&ui::plural(entries.len(), "object"));
    Ok(())
}

pub fn rm(ctx: &Context, id: &str) -> Result<()> {
    let config = super::load_config(ctx)?;
    let local_id = LocalId::parse(id)?;
    let remote_id = forget(&config, &local_id)?;
    ui::success(&format!("No longer tracking {local_id} (remote id {remote_id})"));
    Ok(())
}

/// Tracked `(local_id, remote_id)` pairs, read under the state lock
fn entries(config: &Config) -> Result<Vec<(String, String)>> {
    let options = StateOptions {
        save_state: false,
        ..config.state_options()
    };
    let mut state = super::open_state(config, options)?;

    let entries: Vec<(String, String)> = state.session(|state| {
        Ok(state
            .entries()
            .map(|(local_id, remote_id)| (local_id.to_string(), remote_id.to_string()))
            .collect())
    })?;
    Ok(entries)
}

/// Drop one entry from the state file
fn forget(config: &Config, local_id: &LocalId) -> Result<RemoteId> {
    let options = StateOptions {
        save_state: true,
        ..config.state_options()
    };
    let mut state = super::open_state(config, options)?;

    match state.session(|state| Ok(state.forget(local_id)))? {
        Some(remote_id) => Ok(remote_id),
        None => bail!("{local_id} is not tracked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture;
    use reconcile::{Action, AutoConfirm, NoProgress};
    use tempfile::TempDir;

    fn apply(config: &Config) -> reconcile::ApplyReport {
        let objects = crate::document::load_documents(&config.objects_dir()).unwrap();
        let mut monitor = crate::commands::build_monitor(config).unwrap();
        monitor
            .apply_with(objects, false, &mut NoProgress, &mut AutoConfirm)
            .unwrap()
    }

    #[test]
    fn test_entries_empty_before_first_apply() {
        let dir = TempDir::new().unwrap();
        let config = fixture::workspace(dir.path());

        assert!(entries(&config).unwrap().is_empty());
        assert!(!dir.path().join("state/state.json").exists());
    }

    #[test]
    fn test_entries_after_apply() {
        let dir = TempDir::new().unwrap();
        let config = fixture::workspace(dir.path());
        apply(&config);

        let entries = entries(&config).unwrap();
        let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["Alert.cpu", "Folder.ops"]);
    }

    #[test]
    fn test_forget_makes_object_new_again() {
        let dir = TempDir::new().unwrap();
        let config = fixture::workspace(dir.path());
        apply(&config);

        let id = LocalId::new("Alert", "cpu").unwrap();
        forget(&config, &id).unwrap();
        assert!(forget(&config, &id).is_err());

        let report = apply(&config);
        let cpu = report
            .actions
            .iter()
            .find(|a| a.local_id == id)
            .unwrap();
        assert_eq!(cpu.action, Action::Create);
    }
}
