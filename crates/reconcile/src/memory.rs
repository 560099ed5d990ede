//! In-memory provider and state backend
//!
//! Both keep their data behind a shared handle so that callers can hand the
//! provider or backend to a `Monitor` and still inspect what happened. They
//! are used by the engine's own tests and are handy for dry runs of tooling.

use crate::diff::Exclusions;
use crate::error::Error;
use crate::object::{LocalId, MonitoringObject};
use crate::provider::{Provider, group_by_type};
use crate::resource::{
    Identified, LocalResource, MappedResource, ObsoleteResource, RemoteId, SyncResult,
    SyncedResource,
};
use crate::state::{StateBackend, StateData};
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// State Backend
// ============================================================================

#[derive(Debug, Default)]
struct BackendState {
    data: StateData,
    locked: bool,
    saves: usize,
    fail_next_load: bool,
}

/// State backend keeping the mapping in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn new(data: StateData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BackendState {
                data,
                ..BackendState::default()
            })),
        }
    }

    /// Last saved mapping
    pub fn snapshot(&self) -> StateData {
        guard(&self.inner).data.clone()
    }

    pub fn is_locked(&self) -> bool {
        guard(&self.inner).locked
    }

    /// Number of completed saves
    pub fn saves(&self) -> usize {
        guard(&self.inner).saves
    }

    /// Make the next `load` fail
    pub fn fail_next_load(&self) {
        guard(&self.inner).fail_next_load = true;
    }

    /// Take the lock as if another run held it
    pub fn hold_lock(&self) {
        guard(&self.inner).locked = true;
    }
}

impl StateBackend for MemoryBackend {
    fn lock(&mut self) -> Result<()> {
        let mut inner = guard(&self.inner);
        if inner.locked {
            return Err(Error::StateLocked {
                path: "memory".into(),
            }
            .into());
        }
        inner.locked = true;
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        guard(&self.inner).locked = false;
        Ok(())
    }

    fn load(&mut self) -> Result<StateData> {
        let mut inner = guard(&self.inner);
        if inner.fail_next_load {
            inner.fail_next_load = false;
            bail!("simulated load failure");
        }
        Ok(inner.data.clone())
    }

    fn save(&mut self, data: &StateData) -> Result<()> {
        let mut inner = guard(&self.inner);
        inner.data = data.clone();
        inner.saves += 1;
        Ok(())
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Calls observed by a `MemoryProvider`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub syncs: usize,
    pub applies: usize,
    pub created: Vec<LocalId>,
    pub updated: Vec<LocalId>,
    pub deleted: Vec<LocalId>,
    pub disposed: usize,
}

#[derive(Debug)]
struct Remote<O> {
    objects: BTreeMap<RemoteId, O>,
    calls: CallLog,
    fail_sync: bool,
    /// Remaining mutations before `apply_actions` fails
    fail_after: Option<usize>,
    /// Answer nothing for mapped resources
    drop_sync_results: bool,
}

/// Shared view into a `MemoryProvider`'s backend
#[derive(Debug)]
pub struct MemoryHandle<O> {
    inner: Arc<Mutex<Remote<O>>>,
}

impl<O> Clone for MemoryHandle<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: Clone> MemoryHandle<O> {
    /// Every remote object, keyed by remote id
    pub fn objects(&self) -> BTreeMap<RemoteId, O> {
        guard(&self.inner).objects.clone()
    }

    pub fn calls(&self) -> CallLog {
        guard(&self.inner).calls.clone()
    }

    /// Make every `sync_resources` call fail
    pub fn fail_sync(&self) {
        guard(&self.inner).fail_sync = true;
    }

    /// Make `apply_actions` fail after `mutations` successful mutations
    pub fn fail_after(&self, mutations: usize) {
        guard(&self.inner).fail_after = Some(mutations);
    }

    /// Undo `fail_sync` and `fail_after`
    pub fn clear_failures(&self) {
        let mut remote = guard(&self.inner);
        remote.fail_sync = false;
        remote.fail_after = None;
    }

    /// Make `sync_resources` return no results at all
    pub fn drop_sync_results(&self) {
        guard(&self.inner).drop_sync_results = true;
    }

    /// Put an object on the backend behind the engine's back
    pub fn insert(&self, remote_id: impl Into<RemoteId>, object: O) {
        guard(&self.inner).objects.insert(remote_id.into(), object);
    }

    /// Remove an object behind the engine's back
    pub fn remove(&self, remote_id: &str) -> Option<O> {
        guard(&self.inner).objects.remove(remote_id)
    }
}

/// Provider storing objects in a map keyed by remote id
///
/// Remote ids are derived from stable identifiers: `"remote_<local id>"`.
/// Mutations follow the declared type order, deletions run in reverse.
pub struct MemoryProvider<O> {
    name: String,
    types: Vec<String>,
    exclusions: Exclusions,
    handle: MemoryHandle<O>,
}

impl<O: MonitoringObject> MemoryProvider<O> {
    pub fn new<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            types: types.into_iter().map(Into::into).collect(),
            exclusions: Exclusions::none(),
            handle: MemoryHandle {
                inner: Arc::new(Mutex::new(Remote {
                    objects: BTreeMap::new(),
                    calls: CallLog::default(),
                    fail_sync: false,
                    fail_after: None,
                    drop_sync_results: false,
                })),
            },
        }
    }

    /// Seed the backend with objects stored under their derived remote ids
    pub fn with_objects(self, objects: impl IntoIterator<Item = O>) -> crate::Result<Self> {
        {
            let mut inner = guard(&self.handle.inner);
            for object in objects {
                let remote_id = Self::remote_id_for(&object.local_id()?);
                inner.objects.insert(remote_id, object);
            }
        }
        Ok(self)
    }

    /// Exclusions applied to every diff
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn remote_id_for(local_id: &LocalId) -> RemoteId {
        format!("remote_{local_id}")
    }

    pub fn handle(&self) -> MemoryHandle<O> {
        self.handle.clone()
    }
}

fn count_mutation<O>(remote: &mut Remote<O>) -> Result<()> {
    match remote.fail_after {
        Some(0) => bail!("simulated backend failure"),
        Some(n) => {
            remote.fail_after = Some(n - 1);
            Ok(())
        }
        None => Ok(()),
    }
}

impl<O: MonitoringObject> Provider<O> for MemoryProvider<O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn operating_types(&self) -> Vec<String> {
        self.types.clone()
    }

    fn exclusions(&self, _object: &O) -> Exclusions {
        self.exclusions.clone()
    }

    fn sync_resources(&mut self, mapped: Vec<MappedResource<O>>) -> Result<Vec<SyncResult<O>>> {
        let mut remote = guard(&self.handle.inner);
        remote.calls.syncs += 1;

        if remote.fail_sync {
            bail!("simulated sync failure");
        }
        if remote.drop_sync_results {
            return Ok(Vec::new());
        }

        Ok(mapped
            .into_iter()
            .map(|resource| match remote.objects.get(resource.remote_id()) {
                Some(object) => {
                    let object = object.clone();
                    SyncResult::Synced(resource.into_synced(object))
                }
                None => SyncResult::Obsolete(resource.into_obsolete()),
            })
            .collect())
    }

    fn apply_actions(
        &mut self,
        to_create: Vec<LocalResource<O>>,
        to_update: Vec<SyncedResource<O>>,
        to_remove: Vec<ObsoleteResource>,
    ) -> Result<Vec<SyncedResource<O>>> {
        let order: Vec<&str> = self.types.iter().map(String::as_str).collect();
        let create_groups = group_by_type(to_create, &order)?;
        let update_groups = group_by_type(to_update, &order)?;
        let remove_groups = group_by_type(to_remove, &order)?;

        let mut remote = guard(&self.handle.inner);
        remote.calls.applies += 1;
        let mut synced = Vec::new();

        for (creates, updates) in create_groups.into_iter().zip(update_groups) {
            for resource in creates {
                count_mutation(&mut remote)?;
                let object = resource.object().clone();
                let remote_id = Self::remote_id_for(resource.local_id());
                remote.objects.insert(remote_id.clone(), object.clone());
                remote.calls.created.push(resource.local_id().clone());
                synced.push(resource.into_synced(remote_id, object));
            }

            for resource in updates {
                count_mutation(&mut remote)?;
                let object = resource.object().clone();
                let remote_id = resource.remote_id().to_string();
                remote.objects.insert(remote_id.clone(), object.clone());
                remote.calls.updated.push(resource.local_id().clone());
                synced.push(resource.into_applied(remote_id, object));
            }
        }

        for removes in remove_groups.into_iter().rev() {
            for resource in removes {
                count_mutation(&mut remote)?;
                remote.objects.remove(resource.remote_id());
                remote.calls.deleted.push(resource.local_id().clone());
            }
        }

        Ok(synced)
    }

    fn dispose(&mut self) {
        guard(&self.handle.inner).calls.disposed += 1;
    }
}
