//! # Framework Errors
//!
//! This module defines the common error types used throughout the framework.
//! By centralizing error definitions, the hosted services, the chain builder and
//! the reconciler all report failures in the same vocabulary.
//!
//! The layers map onto the disposition table of the reconciler:
//!
//! | Error | Raised by | Disposition |
//! |-------|-----------|-------------|
//! | [`ChainError`] | [`ChainBuilder::build`](crate::chain::ChainBuilder::build) | fatal, before any external call |
//! | [`ServiceError::AlreadyExists`] | hosted service create | adopted when the token matches |
//! | [`ServiceError::NotFound`] | hosted service delete | success during deletion |
//! | [`ReconcileError`] | [`Reconciler`](crate::reconciler::Reconciler) | aborts the pass, carries applied state |

use crate::chain::LogicalId;
use crate::reconciler::Operation;
use crate::state::PhysicalState;

/// Errors reported by a hosted platform service or the channel in front of it.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service closed")]
    ServiceClosed,
    #[error("Service dropped response channel")]
    ServiceDropped,
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// The name is taken. `client_token` is the token the existing resource was created with.
    #[error("Resource already exists: {name} (client token {client_token})")]
    AlreadyExists { name: String, client_token: String },
    #[error("Request rejected: {0}")]
    Rejected(Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

/// Errors raised while validating a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Cycle detected in dependency graph: {path}")]
    Cycle { path: String },

    #[error("Dependency '{dependency}' of '{node}' is not declared")]
    MissingDependency { node: LogicalId, dependency: LogicalId },

    #[error("Duplicate logical id: {0}")]
    DuplicateNode(LogicalId),

    #[error("Logical id '{node}' contains reserved word '{word}'")]
    ReservedLogicalId { node: LogicalId, word: String },

    #[error("Logical id must not be empty")]
    EmptyLogicalId,
}

/// A node tried to read an output it is not entitled to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("'{0}' is not a declared predecessor")]
    UndeclaredReference(LogicalId),

    #[error("Predecessor '{0}' has no output yet")]
    MissingOutput(LogicalId),

    #[error("Output of '{node}' has no attribute '{attribute}'")]
    MissingAttribute { node: LogicalId, attribute: String },

    #[error("Attribute '{attribute}' of '{node}' is malformed: {value}")]
    MalformedAttribute {
        node: LogicalId,
        attribute: String,
        value: String,
    },
}

/// Errors that abort a reconciliation pass.
///
/// Every variant raised mid-pass carries the state as applied up to the failure.
/// Persisting that state and calling `reconcile` again resumes from the first
/// unapplied node.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Failed to resolve inputs for '{node}': {source}")]
    Resolve {
        node: LogicalId,
        source: ResolveError,
        applied: Box<PhysicalState>,
    },

    #[error("Name '{name}' requested by '{node}' belongs to another resource (client token {owner})")]
    NameCollision {
        node: LogicalId,
        name: String,
        owner: String,
        applied: Box<PhysicalState>,
    },

    #[error("{operation} of '{node}' failed: {source} (payload: {payload})")]
    ExternalCall {
        node: LogicalId,
        operation: Operation,
        payload: String,
        source: ServiceError,
        applied: Box<PhysicalState>,
    },

    #[error("Physical id of '{node}' changed from {before} to {after}")]
    PhysicalIdChanged {
        node: LogicalId,
        before: String,
        after: String,
        applied: Box<PhysicalState>,
    },
}

impl ReconcileError {
    /// The node the pass stopped at, if the failure is tied to one.
    pub fn node(&self) -> Option<&LogicalId> {
        match self {
            ReconcileError::Chain(_) => None,
            ReconcileError::Resolve { node, .. }
            | ReconcileError::NameCollision { node, .. }
            | ReconcileError::ExternalCall { node, .. }
            | ReconcileError::PhysicalIdChanged { node, .. } => Some(node),
        }
    }

    /// State as applied before the failure. `None` for errors raised before any call.
    pub fn applied(&self) -> Option<&PhysicalState> {
        match self {
            ReconcileError::Chain(_) => None,
            ReconcileError::Resolve { applied, .. }
            | ReconcileError::NameCollision { applied, .. }
            | ReconcileError::ExternalCall { applied, .. }
            | ReconcileError::PhysicalIdChanged { applied, .. } => Some(applied),
        }
    }

    /// Whether retrying the same pass can succeed without changing the declaration.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::ExternalCall {
                source: ServiceError::ServiceClosed
                    | ServiceError::ServiceDropped
                    | ServiceError::Rejected(_),
                ..
            }
        )
    }
}

/// Errors while persisting or loading physical state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
