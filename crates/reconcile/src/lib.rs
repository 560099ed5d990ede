//! # Reconcile
//!
//! A declarative reconciliation engine for monitoring objects.
//!
//! Given a set of desired objects and the identity mapping recorded by the
//! previous run, the engine works out which remote objects to create, update
//! or delete so that every backend matches the desired set, then records the
//! new mapping.
//!
//! ## Core Concepts
//!
//! - **MonitoringObject**: A desired object with a stable identifier
//!   (`"<TypeName>.<key>"`)
//! - **Resource**: One object's record during a run: Local, Mapped, Synced
//!   or Obsolete
//! - **State**: Persisted mapping from stable identifier to remote id
//! - **Provider**: Adapter for one backend, owning a set of object types
//! - **Monitor**: Orchestrates a run: sync, classify, apply, commit
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{MemoryBackend, MemoryProvider, Monitor, State, StateOptions};
//!
//! let provider = MemoryProvider::new("memory", ["Folder", "Alert"]);
//! let state = State::new(MemoryBackend::default(), StateOptions::default());
//! let mut monitor = Monitor::new(vec![Box::new(provider)], state)?;
//!
//! let report = monitor.apply(objects, false)?;
//! println!("{} changes", report.summary.total_changes());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives apply progress per provider
//! - [`ConfirmCallback`]: Gates the apply phase
//!
//! Neither depends on a terminal UI, so tooling decides how to render them.

pub mod context;
pub mod diff;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod object;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{Exclusions, canonicalize};
pub use error::{Error, Result};
pub use memory::{CallLog, MemoryBackend, MemoryHandle, MemoryProvider};
pub use monitor::Monitor;
pub use object::{ID_SEPARATOR, LocalId, MonitoringObject, is_same_type};
pub use provider::{BoxedProvider, HandlerProvider, Provider, ResourceHandler, group_by_type};
pub use registry::ProviderRegistry;
pub use resource::{
    Identified, LocalResource, MappedResource, ObsoleteResource, RemoteId, Resource, SyncResult,
    SyncedResource,
};
pub use state::{State, StateBackend, StateData, StateOptions};
pub use types::{Action, ApplyReport, PlanSummary, PlannedAction};
