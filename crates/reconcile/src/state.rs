//! Persisted identity mapping
//!
//! The state store remembers one thing per managed object: which remote id
//! the backend assigned to its stable identifier. Remote values are always
//! fetched again from the backend, never trusted from the store.

use crate::error::{Error, Result};
use crate::object::{LocalId, MonitoringObject};
use crate::resource::{Identified, LocalResource, MappedResource, ObsoleteResource, RemoteId, SyncedResource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// State Data
// ============================================================================

/// Serialized form of the state store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateData {
    /// Stable identifier → remote id
    #[serde(default)]
    pub resources: BTreeMap<String, RemoteId>,
}

impl StateData {
    /// Build state data from `(local_id, remote_id)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RemoteId>,
    {
        Self {
            resources: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// Backend Contract
// ============================================================================

/// Storage behind a `State`
///
/// `lock` and `unlock` bracket every session; `load` and `save` only happen
/// between them.
pub trait StateBackend: Send {
    /// Take exclusive access to the store
    fn lock(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release exclusive access
    fn unlock(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Read the persisted mapping
    fn load(&mut self) -> anyhow::Result<StateData>;

    /// Persist the mapping
    fn save(&mut self, data: &StateData) -> anyhow::Result<()>;
}

/// Per-store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateOptions {
    /// Persist the mapping when a session ends
    pub save_state: bool,
    /// Leave tracked objects alone when they are missing from the desired set
    pub persist_untracked: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            save_state: true,
            persist_untracked: false,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// The state store used by a `Monitor`
pub struct State<B> {
    backend: B,
    data: StateData,
    options: StateOptions,
}

impl<B: StateBackend> State<B> {
    pub fn new(backend: B, options: StateOptions) -> Self {
        Self {
            backend,
            data: StateData::default(),
            options,
        }
    }

    /// Mapping as of the last load or commit
    pub fn data(&self) -> &StateData {
        &self.data
    }

    pub fn options(&self) -> StateOptions {
        self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Run `body` with the store locked and loaded
    ///
    /// The lock is released on every exit path. When `save_state` is set the
    /// mapping is saved after the body whether it succeeded or not, so
    /// commits made before a failure are persisted. Nothing is saved when
    /// loading failed. A body error takes precedence over a save error.
    pub fn session<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.backend.lock().map_err(|source| state_error("lock", source))?;

        match self.backend.load() {
            Ok(data) => {
                log::debug!("Loaded state with {} entries", data.resources.len());
                self.data = data;
            }
            Err(source) => {
                if let Err(e) = self.backend.unlock() {
                    log::warn!("Failed to unlock state after load error: {e:#}");
                }
                return Err(state_error("load", source));
            }
        }

        let mut result = body(self);

        if self.options.save_state {
            match self.backend.save(&self.data) {
                Ok(()) => log::debug!("Saved state with {} entries", self.data.resources.len()),
                Err(source) => {
                    result = match result {
                        Ok(_) => Err(state_error("save", source)),
                        Err(e) => {
                            log::warn!("Failed to save state after error: {source:#}");
                            Err(e)
                        }
                    };
                }
            }
        }

        if let Err(source) = self.backend.unlock() {
            result = match result {
                Ok(_) => Err(state_error("unlock", source)),
                Err(e) => {
                    log::warn!("Failed to unlock state after error: {source:#}");
                    Err(e)
                }
            };
        }

        result
    }

    /// Split local resources into still-unknown ones and those with a
    /// recorded remote id
    pub fn fill_identifiers<O: MonitoringObject>(
        &self,
        resources: Vec<LocalResource<O>>,
    ) -> (Vec<LocalResource<O>>, Vec<MappedResource<O>>) {
        let mut remaining = Vec::new();
        let mut mapped = Vec::new();

        for resource in resources {
            match self.data.resources.get(&resource.local_id().to_string()) {
                Some(remote_id) => {
                    let remote_id = remote_id.clone();
                    mapped.push(resource.into_mapped(remote_id));
                }
                None => remaining.push(resource),
            }
        }

        (remaining, mapped)
    }

    /// Tracked entries that none of `mentioned` refers to
    ///
    /// Always empty when `persist_untracked` is set.
    pub fn untracked_resources<'a, I>(&self, mentioned: I) -> Result<Vec<ObsoleteResource>>
    where
        I: IntoIterator<Item = &'a LocalId>,
    {
        if self.options.persist_untracked {
            return Ok(Vec::new());
        }

        let mentioned: HashSet<String> = mentioned.into_iter().map(ToString::to_string).collect();

        self.data
            .resources
            .iter()
            .filter(|(local_id, _)| !mentioned.contains(*local_id))
            .map(|(local_id, remote_id)| {
                Ok(ObsoleteResource::new(LocalId::parse(local_id)?, remote_id.clone()))
            })
            .collect()
    }

    /// Record the outcome of an applied batch
    pub fn commit<O>(&mut self, synced: &[SyncedResource<O>], removed: &[ObsoleteResource]) {
        for resource in synced {
            self.data
                .resources
                .insert(resource.local_id().to_string(), resource.remote_id().to_string());
        }
        for resource in removed {
            self.data.resources.remove(&resource.local_id().to_string());
        }
    }

    /// Drop a single entry without touching the backend
    pub fn forget(&mut self, local_id: &LocalId) -> Option<RemoteId> {
        self.data.resources.remove(&local_id.to_string())
    }

    /// Iterate over `(local_id, remote_id)` entries in identifier order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data
            .resources
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn state_error(operation: &'static str, source: anyhow::Error) -> Error {
    // Backends report lock contention with the engine's own error
    match source.downcast::<Error>() {
        Ok(err @ Error::StateLocked { .. }) => err,
        Ok(other) => Error::State {
            operation,
            source: other.into(),
        },
        Err(source) => Error::State { operation, source },
    }
}

// ============================================================================
// Tests
// ============================================================================
