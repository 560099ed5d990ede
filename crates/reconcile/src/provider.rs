//! Provider contract and handler-based providers
//!
//! A provider adapts one backend: it declares which object types it owns,
//! reads their remote values and applies batches of changes. Providers that
//! manage several object types can be assembled from one `ResourceHandler`
//! per type with `HandlerProvider`.

use crate::diff::{self, Exclusions};
use crate::error::Error;
use crate::object::MonitoringObject;
use crate::resource::{
    Identified, LocalResource, MappedResource, ObsoleteResource, SyncResult, SyncedResource,
};
use anyhow::Result;

/// Per-backend adapter
///
/// Calls into one provider are never issued concurrently, but different
/// providers may be synced from different threads.
pub trait Provider<O: MonitoringObject>: Send {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Object types this provider owns, in registration order
    ///
    /// The order is the provider's dependency convention: containers first.
    fn operating_types(&self) -> Vec<String>;

    /// Field paths that never count as a difference for `object`
    fn exclusions(&self, _object: &O) -> Exclusions {
        Exclusions::none()
    }

    /// Fetch the remote value of every mapped resource
    ///
    /// Found objects come back as `Synced`, missing ones as `Obsolete`. Must
    /// not mutate the backend.
    fn sync_resources(&mut self, mapped: Vec<MappedResource<O>>) -> Result<Vec<SyncResult<O>>>;

    /// Diff between the remote and the desired value
    ///
    /// An empty list means the resource is up to date.
    fn diff(&self, synced: &SyncedResource<O>) -> Result<Vec<String>> {
        let exclusions = self.exclusions(synced.object());
        Ok(diff::diff(
            Some(synced.remote()),
            Some(synced.object()),
            &exclusions,
        )?)
    }

    /// Create, update and delete on the backend
    ///
    /// Returns the post-mutation view of every created and updated resource.
    fn apply_actions(
        &mut self,
        to_create: Vec<LocalResource<O>>,
        to_update: Vec<SyncedResource<O>>,
        to_remove: Vec<ObsoleteResource>,
    ) -> Result<Vec<SyncedResource<O>>>;

    /// Release connections or other handles; called once per run that used
    /// the provider
    fn dispose(&mut self) {}
}

/// A boxed provider for type-erased storage
pub type BoxedProvider<O> = Box<dyn Provider<O>>;

/// CRUD operations for a single object type
pub trait ResourceHandler<O: MonitoringObject>: Send {
    /// Read the remote value; `Obsolete` when the backend does not have it
    fn read(&mut self, resource: MappedResource<O>) -> Result<SyncResult<O>>;

    fn create(&mut self, resource: LocalResource<O>) -> Result<SyncedResource<O>>;

    fn update(&mut self, resource: SyncedResource<O>) -> Result<SyncedResource<O>>;

    /// Delete the remote object; deleting a missing object is not an error
    fn delete(&mut self, resource: ObsoleteResource) -> Result<()>;

    /// Backend-assigned fields to leave out of diffs
    fn exclusions(&self) -> Exclusions {
        Exclusions::none()
    }

    fn dispose(&mut self) {}
}

/// A provider that dispatches to one handler per object type
///
/// Handlers are kept in registration order. Creations and updates run in
/// that order, deletions in reverse, so containers registered first exist
/// before their contents and outlive them.
pub struct HandlerProvider<O: MonitoringObject> {
    name: String,
    handlers: Vec<(String, Box<dyn ResourceHandler<O>>)>,
}

impl<O: MonitoringObject> HandlerProvider<O> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// Register the handler for `type_name`
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        handler: Box<dyn ResourceHandler<O>>,
    ) -> crate::Result<()> {
        let type_name = type_name.into();
        if self.handlers.iter().any(|(t, _)| *t == type_name) {
            return Err(Error::DuplicatedHandler {
                provider: self.name.clone(),
                type_name,
            });
        }
        self.handlers.push((type_name, handler));
        Ok(())
    }

    /// Builder-style `register`
    pub fn with_handler(
        mut self,
        type_name: impl Into<String>,
        handler: Box<dyn ResourceHandler<O>>,
    ) -> crate::Result<Self> {
        self.register(type_name, handler)?;
        Ok(self)
    }

    fn type_order(&self) -> Vec<&str> {
        self.handlers.iter().map(|(t, _)| t.as_str()).collect()
    }

    fn handler_mut(&mut self, type_name: &str) -> Option<&mut Box<dyn ResourceHandler<O>>> {
        self.handlers
            .iter_mut()
            .find(|(t, _)| t == type_name)
            .map(|(_, h)| h)
    }
}

impl<O: MonitoringObject> Provider<O> for HandlerProvider<O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn operating_types(&self) -> Vec<String> {
        self.handlers.iter().map(|(t, _)| t.clone()).collect()
    }

    fn exclusions(&self, object: &O) -> Exclusions {
        self.handlers
            .iter()
            .find(|(t, _)| t == object.type_name())
            .map(|(_, h)| h.exclusions())
            .unwrap_or_default()
    }

    fn sync_resources(&mut self, mapped: Vec<MappedResource<O>>) -> Result<Vec<SyncResult<O>>> {
        let mut synced = Vec::with_capacity(mapped.len());
        for resource in mapped {
            let handler = match self.handler_mut(resource.type_name()) {
                Some(h) => h,
                None => {
                    return Err(Error::UnknownHandler {
                        resources: vec![resource.local_id().clone()],
                    }
                    .into());
                }
            };
            synced.push(handler.read(resource)?);
        }
        Ok(synced)
    }

    fn apply_actions(
        &mut self,
        to_create: Vec<LocalResource<O>>,
        to_update: Vec<SyncedResource<O>>,
        to_remove: Vec<ObsoleteResource>,
    ) -> Result<Vec<SyncedResource<O>>> {
        let order = self.type_order();
        let create_groups = group_by_type(to_create, &order)?;
        let update_groups = group_by_type(to_update, &order)?;
        let remove_groups = group_by_type(to_remove, &order)?;

        let mut applied = Vec::new();

        for ((entry, creates), updates) in self
            .handlers
            .iter_mut()
            .zip(create_groups)
            .zip(update_groups)
        {
            let (type_name, handler) = entry;
            if !creates.is_empty() || !updates.is_empty() {
                log::debug!(
                    "{}: creating {} and updating {} {}",
                    self.name,
                    creates.len(),
                    updates.len(),
                    type_name
                );
            }
            for resource in creates {
                applied.push(handler.create(resource)?);
            }
            for resource in updates {
                applied.push(handler.update(resource)?);
            }
        }

        for (entry, removes) in self.handlers.iter_mut().zip(remove_groups).rev() {
            let (type_name, handler) = entry;
            if !removes.is_empty() {
                log::debug!("{}: deleting {} {}", self.name, removes.len(), type_name);
            }
            for resource in removes {
                handler.delete(resource)?;
            }
        }

        Ok(applied)
    }

    fn dispose(&mut self) {
        for (_, handler) in &mut self.handlers {
            handler.dispose();
        }
    }
}

/// Bucket resources by type, one bucket per entry of `order`
///
/// Fails with `UnknownHandler` naming every resource whose type is not in
/// `order`.
pub fn group_by_type<R: Identified>(resources: Vec<R>, order: &[&str]) -> crate::Result<Vec<Vec<R>>> {
    let mut groups: Vec<Vec<R>> = order.iter().map(|_| Vec::new()).collect();
    let mut unhandled = Vec::new();

    for resource in resources {
        match order.iter().position(|t| *t == resource.type_name()) {
            Some(index) => groups[index].push(resource),
            None => unhandled.push(resource.local_id().clone()),
        }
    }

    if !unhandled.is_empty() {
        return Err(Error::UnknownHandler {
            resources: unhandled,
        });
    }

    Ok(groups)
}
