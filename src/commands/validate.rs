//! `validate`

use anyhow::Result;
use reconcile::LocalId;

use crate::Context;
use crate::config::Config;
use crate::document;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let path = Config::locate(ctx.config.as_deref())?;
    let config = Config::load(&path)?;
    if !ctx.quiet {
        ui::info(&format!("Config: {}", path.display()));
    }

    let ids = check(&config)?;
    if ids.is_empty() {
        ui::warn(&format!(
            "No objects found in {}",
            config.objects_dir().display()
        ));
        return Ok(());
    }

    ui::success(&format!(
        "{} across {}",
        ui::plural(ids.len(), "object"),
        ui::plural(config.backends.len(), "backend")
    ));
    Ok(())
}

/// Identifiers of every document, checked against the configured backends
fn check(config: &Config) -> Result<Vec<LocalId>> {
    let objects = document::load_documents(&config.objects_dir())?;
    let monitor = super::build_monitor(config)?;
    Ok(monitor.check(objects)?)
}
