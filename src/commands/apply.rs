//! `plan` and `apply`

use anyhow::Result;
use reconcile::{ApplyReport, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};

use crate::Context;
use crate::config::Config;
use crate::document;
use crate::progress::{PromptConfirm, SpinnerProgress};
use crate::report;

/// Show what apply would change, without changing anything
pub fn plan(ctx: &Context, all: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let report = reconcile(&config, true, &mut NoProgress, &mut AutoConfirm)?;
    report::display_report(&report, all || ctx.verbose > 0);
    Ok(())
}

/// Reconcile the configured backends with the documents
pub fn apply(ctx: &Context, dry_run: bool, yes: bool) -> Result<()> {
    let config = super::load_config(ctx)?;

    let mut progress = SpinnerProgress::new(ctx.quiet);
    let mut confirm = PromptConfirm::new(yes, ctx.verbose > 0);
    let report = reconcile(&config, dry_run, &mut progress, &mut confirm)?;

    // The prompt only shows the plan when there is something to confirm
    if !confirm.shown {
        report::display_report(&report, confirm.show_unchanged);
    }
    report::print_outcome(&report);
    Ok(())
}

fn reconcile<P, C>(
    config: &Config,
    dry_run: bool,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ApplyReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let objects = document::load_documents(&config.objects_dir())?;
    let mut monitor = super::build_monitor(config)?;
    Ok(monitor.apply_with(objects, dry_run, progress, confirm)?)
}
