//! Run callbacks
//!
//! These traits let tooling observe and gate a run without the engine
//! depending on a particular terminal UI.

use crate::types::ApplyReport;
use anyhow::Result;

/// Progress callback for the apply phase
pub trait ProgressCallback: Send {
    /// Called before a provider applies its actions
    fn on_apply_start(&mut self, provider: &str, changes: usize);

    /// Called after a provider applied its actions
    fn on_apply_complete(&mut self, provider: &str, applied: usize);

    /// Called when the provider failed; the run aborts right after
    fn on_apply_failed(&mut self, _provider: &str) {}
}

/// Confirmation callback, asked once per run before any mutation
pub trait ConfirmCallback: Send {
    /// Ask whether the planned changes should be applied
    ///
    /// Only called when the report contains changes.
    ///
    /// # Returns
    /// `true` to proceed, `false` to stop without touching the backend
    fn confirm(&mut self, report: &ApplyReport) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_apply_start(&mut self, _provider: &str, _changes: usize) {}
    fn on_apply_complete(&mut self, _provider: &str, _applied: usize) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _report: &ApplyReport) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _report: &ApplyReport) -> Result<bool> {
        Ok(false)
    }
}
