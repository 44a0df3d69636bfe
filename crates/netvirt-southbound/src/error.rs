//! Error types for the southbound reconciliation engine.
//!
//! Three families of failure exist:
//!
//! - [`CollaboratorError`]: an external accessor (topology store, tenant
//!   manager, provider backend) failed
//! - [`NotationError`]: a raw OVSDB row could not be decoded
//! - [`SouthboundError`]: the outcome of handling one event
//!
//! None of them ever escapes [`crate::SouthboundHandler::process_event`]; a
//! failing event is logged and the queue moves on.

use std::path::PathBuf;
use thiserror::Error;

use crate::event::EventKind;
use netvirt_orch_common::Action;

/// Result type alias for collaborator calls.
pub type LookupResult<T> = std::result::Result<T, CollaboratorError>;

/// Result type alias for event handling.
pub type Result<T> = std::result::Result<T, SouthboundError>;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or is not ready.
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    /// A required entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// A lookup by a non-unique key matched more than one entity.
    #[error("{entity} '{key}' is ambiguous: {count} matches")]
    Ambiguous {
        entity: String,
        key: String,
        count: usize,
    },

    /// The collaborator rejected or failed the operation.
    #[error("{service} failed: {message}")]
    Backend { service: String, message: String },
}

impl CollaboratorError {
    /// Creates an unavailable error.
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates an ambiguous lookup error.
    pub fn ambiguous(entity: impl Into<String>, key: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            entity: entity.into(),
            key: key.into(),
            count,
        }
    }

    /// Creates a backend error.
    pub fn backend(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Failure decoding an OVSDB JSON value or row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotationError {
    /// Tagged array with an unknown tag.
    #[error("unknown OVSDB notation tag '{0}'")]
    UnknownTag(String),

    /// JSON shape that is not a valid OVSDB value.
    #[error("malformed OVSDB value: {0}")]
    Malformed(String),

    /// Required column absent from the row.
    #[error("row has no '{0}' column")]
    MissingColumn(String),

    /// Column present but of the wrong type.
    #[error("column '{column}' is not a {expected}")]
    WrongType { column: String, expected: String },
}

/// Failure handling one southbound event.
#[derive(Debug, Error)]
pub enum SouthboundError {
    /// A node needs a tunnel endpoint for a non-VLAN network and has none.
    #[error("tunnel end-point configuration missing on node {node}")]
    ConfigurationMissing { node: String },

    /// An external lookup or action failed.
    #[error(transparent)]
    Lookup(#[from] CollaboratorError),

    /// A raw row could not be decoded.
    #[error("row decode failed: {0}")]
    Notation(#[from] NotationError),

    /// No handler exists for this kind/action combination.
    #[error("unable to process {kind:?} event with action {action}")]
    UnrecognizedEvent { kind: EventKind, action: Action },

    /// The event lacks a field its kind requires.
    #[error("{kind:?} event is missing required field '{field}'")]
    MissingEventField { kind: EventKind, field: &'static str },

    /// The dispatcher channel is closed.
    #[error("event queue closed")]
    QueueClosed,
}

impl SouthboundError {
    /// Returns true if the event was dropped because of its shape rather
    /// than because processing failed.
    pub fn is_unrecognized(&self) -> bool {
        matches!(
            self,
            SouthboundError::UnrecognizedEvent { .. } | SouthboundError::MissingEventField { .. }
        )
    }
}

/// Failure loading the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    /// Creates an invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
