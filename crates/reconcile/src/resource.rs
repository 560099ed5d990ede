//! Resource records for a single reconciliation run
//!
//! A resource pairs a desired object with whatever the run has learned about
//! its remote counterpart. It moves through the variants in one direction
//! only: Local → Mapped → Synced, or Mapped → Obsolete. Every transition
//! consumes the old record and returns a new one.

use crate::error::Result;
use crate::object::{LocalId, MonitoringObject};

/// Backend-assigned identifier, opaque to the engine
pub type RemoteId = String;

/// Anything that carries a stable identifier
pub trait Identified {
    /// Stable identifier of the underlying object
    fn local_id(&self) -> &LocalId;

    /// Type name encoded in the identifier
    fn type_name(&self) -> &str {
        self.local_id().type_name()
    }
}

/// A desired object whose remote identity is unknown
#[derive(Debug, Clone, PartialEq)]
pub struct LocalResource<O> {
    local_id: LocalId,
    object: O,
}

impl<O: MonitoringObject> LocalResource<O> {
    /// Wrap a desired object, validating its identifier
    pub fn new(object: O) -> Result<Self> {
        let local_id = object.local_id()?;
        Ok(Self { local_id, object })
    }
}

impl<O> LocalResource<O> {
    /// The desired object
    pub fn object(&self) -> &O {
        &self.object
    }

    /// Attach the remote id recovered from the state store
    pub fn into_mapped(self, remote_id: impl Into<RemoteId>) -> MappedResource<O> {
        MappedResource {
            local_id: self.local_id,
            object: self.object,
            remote_id: remote_id.into(),
        }
    }

    /// Record the outcome of creating this object on the backend
    pub fn into_synced(self, remote_id: impl Into<RemoteId>, remote: O) -> SyncedResource<O> {
        SyncedResource {
            local_id: self.local_id,
            object: self.object,
            remote_id: remote_id.into(),
            remote,
        }
    }
}

/// A desired object with a known remote id, not yet confirmed by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct MappedResource<O> {
    local_id: LocalId,
    object: O,
    remote_id: RemoteId,
}

impl<O> MappedResource<O> {
    /// The desired object
    pub fn object(&self) -> &O {
        &self.object
    }

    /// Remote id recorded in the state store
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// The backend still has the object; `remote` is its current value
    pub fn into_synced(self, remote: O) -> SyncedResource<O> {
        SyncedResource {
            local_id: self.local_id,
            object: self.object,
            remote_id: self.remote_id,
            remote,
        }
    }

    /// The backend no longer has the object
    pub fn into_obsolete(self) -> ObsoleteResource {
        ObsoleteResource {
            local_id: self.local_id,
            remote_id: self.remote_id,
        }
    }
}

/// A desired object together with its current remote value
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedResource<O> {
    local_id: LocalId,
    object: O,
    remote_id: RemoteId,
    remote: O,
}

impl<O> SyncedResource<O> {
    /// The desired object
    pub fn object(&self) -> &O {
        &self.object
    }

    /// Backend-assigned id
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Current value on the backend
    pub fn remote(&self) -> &O {
        &self.remote
    }

    /// Record the outcome of an update
    ///
    /// Backends may hand out a new id when an object is rewritten, so both the
    /// id and the value are replaced.
    pub fn into_applied(self, remote_id: impl Into<RemoteId>, remote: O) -> Self {
        Self {
            local_id: self.local_id,
            object: self.object,
            remote_id: remote_id.into(),
            remote,
        }
    }
}

/// A tracked remote object that no desired object claims anymore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteResource {
    local_id: LocalId,
    remote_id: RemoteId,
}

impl ObsoleteResource {
    pub fn new(local_id: LocalId, remote_id: impl Into<RemoteId>) -> Self {
        Self {
            local_id,
            remote_id: remote_id.into(),
        }
    }

    /// Remote id recorded in the state store
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }
}

/// Outcome of syncing a mapped resource against the backend
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult<O> {
    /// Remote object found
    Synced(SyncedResource<O>),
    /// Remote object missing
    Obsolete(ObsoleteResource),
}

/// A resource in any stage of the run
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<O> {
    Local(LocalResource<O>),
    Mapped(MappedResource<O>),
    Synced(SyncedResource<O>),
    Obsolete(ObsoleteResource),
}

impl<O> Resource<O> {
    /// Remote id, if the stage knows one
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Mapped(r) => Some(r.remote_id()),
            Self::Synced(r) => Some(r.remote_id()),
            Self::Obsolete(r) => Some(r.remote_id()),
        }
    }

    /// Short name of the current stage, for logs
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Mapped(_) => "mapped",
            Self::Synced(_) => "synced",
            Self::Obsolete(_) => "obsolete",
        }
    }
}

impl<O> From<SyncResult<O>> for Resource<O> {
    fn from(result: SyncResult<O>) -> Self {
        match result {
            SyncResult::Synced(r) => Self::Synced(r),
            SyncResult::Obsolete(r) => Self::Obsolete(r),
        }
    }
}

impl<O> Identified for LocalResource<O> {
    fn local_id(&self) -> &LocalId {
        &self.local_id
    }
}

impl<O> Identified for MappedResource<O> {
    fn local_id(&self) -> &LocalId {
        &self.local_id
    }
}

impl<O> Identified for SyncedResource<O> {
    fn local_id(&self) -> &LocalId {
        &self.local_id
    }
}

impl Identified for ObsoleteResource {
    fn local_id(&self) -> &LocalId {
        &self.local_id
    }
}

impl<O> Identified for SyncResult<O> {
    fn local_id(&self) -> &LocalId {
        match self {
            Self::Synced(r) => r.local_id(),
            Self::Obsolete(r) => r.local_id(),
        }
    }
}

impl<O> Identified for Resource<O> {
    fn local_id(&self) -> &LocalId {
        match self {
            Self::Local(r) => r.local_id(),
            Self::Mapped(r) => r.local_id(),
            Self::Synced(r) => r.local_id(),
            Self::Obsolete(r) => r.local_id(),
        }
    }
}
