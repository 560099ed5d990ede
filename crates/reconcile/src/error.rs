//! Error types for reconciliation runs.
//!
//! Configuration and classification errors are raised before any backend
//! mutation happens. Provider and state failures carry the underlying
//! `anyhow` error as their source.

use crate::object::LocalId;
use thiserror::Error;

/// Errors that can occur while building a monitor or running a reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// A type name or key cannot form a stable identifier
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// The offending value
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The desired set contains the same stable identifier more than once
    #[error("duplicated identifiers in desired objects: {}", join_ids(.resources))]
    DuplicatedIdentifier {
        /// Every identifier that appeared more than once
        resources: Vec<LocalId>,
    },

    /// Two providers declared the same object type
    #[error("object type {type_name} is handled by both {first} and {second}")]
    DuplicatedProvider {
        /// The contested type name
        type_name: String,
        /// Provider registered first
        first: String,
        /// Provider that tried to register the type again
        second: String,
    },

    /// A handler-based provider got two handlers for one type
    #[error("provider {provider} already has a handler for {type_name}")]
    DuplicatedHandler {
        /// Provider name
        provider: String,
        /// The contested type name
        type_name: String,
    },

    /// No provider (or handler) is registered for the resources' types
    #[error("no provider is registered for: {}", join_ids(.resources))]
    UnknownHandler {
        /// Every resource that could not be routed
        resources: Vec<LocalId>,
    },

    /// Resources reached classification with neither a confirmed remote object
    /// nor a missing marker
    #[error("resources ended up in an unexpected state: {}", join_ids(.resources))]
    UnexpectedState {
        /// Every resource left unresolved
        resources: Vec<LocalId>,
    },

    /// The state store is held by another run
    #[error("state is locked by another run: {path}")]
    StateLocked {
        /// Location of the lock
        path: String,
    },

    /// A state backend operation failed
    #[error("state {operation} failed")]
    State {
        /// lock, load, save or unlock
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A provider operation failed
    #[error("provider {provider} failed to {operation}")]
    Provider {
        /// Provider name
        provider: String,
        /// sync, diff or apply
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The confirmation callback failed
    #[error("confirmation failed")]
    Confirm(#[source] anyhow::Error),

    /// An object could not be turned into its canonical form
    #[error("failed to canonicalize object: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

impl Error {
    /// Resources named by the error, if any
    pub fn resources(&self) -> &[LocalId] {
        match self {
            Self::DuplicatedIdentifier { resources }
            | Self::UnknownHandler { resources }
            | Self::UnexpectedState { resources } => resources,
            _ => &[],
        }
    }

    /// Whether the run was aborted before any backend mutation could happen.
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Provider {
                operation: "apply",
                ..
            } | Self::State {
                operation: "save" | "unlock",
                ..
            }
        )
    }
}

fn join_ids(ids: &[LocalId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_handler_names_every_resource() {
        let err = Error::UnknownHandler {
            resources: vec![
                LocalId::new("Folder", "ops").unwrap(),
                LocalId::new("Alert", "cpu").unwrap(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "no provider is registered for: Folder.ops, Alert.cpu"
        );
        assert_eq!(err.resources().len(), 2);
    }

    #[test]
    fn test_pre_mutation() {
        let apply = Error::Provider {
            provider: "grafana".into(),
            operation: "apply",
            source: anyhow::anyhow!("boom"),
        };
        assert!(!apply.is_pre_mutation());

        let sync = Error::Provider {
            provider: "grafana".into(),
            operation: "sync",
            source: anyhow::anyhow!("boom"),
        };
        assert!(sync.is_pre_mutation());
        assert!(Error::UnexpectedState { resources: vec![] }.is_pre_mutation());
    }
}
