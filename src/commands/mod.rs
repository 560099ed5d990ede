pub mod apply;
pub mod state;
pub mod validate;

use anyhow::Result;
use reconcile::{Monitor, State, StateOptions};

use crate::Context;
use crate::backend;
use crate::config::Config;
use crate::document::Document;
use crate::state_file::FileBackend;

/// The monitor used by every command that reconciles
pub type DocumentMonitor = Monitor<Document, FileBackend>;

/// Load the config selected by `--config` (or the default location)
pub fn load_config(ctx: &Context) -> Result<Config> {
    let path = Config::locate(ctx.config.as_deref())?;
    Config::load(&path)
}

/// State store for `config`, with explicit options
pub fn open_state(config: &Config, options: StateOptions) -> Result<State<FileBackend>> {
    let path = config.state_path()?;
    log::debug!("State file: {}", path.display());
    Ok(State::new(FileBackend::new(path), options))
}

/// Monitor wired to the configured backends and state file
pub fn build_monitor(config: &Config) -> Result<DocumentMonitor> {
    let state = open_state(config, config.state_options())?;
    let providers = backend::build_providers(config)?;
    Ok(Monitor::new(providers, state)?)
}
