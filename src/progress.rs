//! Terminal callbacks for reconciliation runs

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyReport, ConfirmCallback, ProgressCallback};
use std::time::Duration;

use crate::report;

/// One spinner per provider while it applies its changes
pub struct SpinnerProgress {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl SpinnerProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_apply_start(&mut self, provider: &str, changes: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(format!("Applying {changes} changes to {provider}..."));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn on_apply_complete(&mut self, provider: &str, applied: usize) {
        self.finish();
        if !self.quiet {
            println!("  {} {provider}: {applied} changes applied", "✓".green());
        }
    }

    fn on_apply_failed(&mut self, provider: &str) {
        self.finish();
        eprintln!("  {} {provider}: apply failed", "✗".red());
    }
}

/// Shows the plan, then asks before anything is applied
pub struct PromptConfirm {
    /// Skip the question (`--yes`)
    pub assume_yes: bool,
    pub show_unchanged: bool,
    /// Whether the plan was displayed by this callback
    pub shown: bool,
}

impl PromptConfirm {
    pub fn new(assume_yes: bool, show_unchanged: bool) -> Self {
        Self {
            assume_yes,
            show_unchanged,
            shown: false,
        }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, plan: &ApplyReport) -> Result<bool> {
        report::display_report(plan, self.show_unchanged);
        self.shown = true;

        if self.assume_yes {
            return Ok(true);
        }

        println!();
        let confirmed = Confirm::new()
            .with_prompt("Apply these changes?")
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}
