//! Crate-wide error taxonomy.
//!
//! Every fallible public entry point returns [`Result`]. Errors are never
//! swallowed: backend-internal failures are logged via `tracing::error!`
//! before being surfaced to the caller (see [`log_internal`]).

use thiserror::Error;
use tracing::error;

use crate::model::Id;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds the core can surface, per the component's failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested entity does not exist.
    #[error("entity not found: {0}")]
    NotFound(Id),

    /// Insert of an existing id with `ConflictPolicy::Error`.
    #[error("id already exists: {0}")]
    Conflict(Id),

    /// An edge insert was attempted without both endpoints present.
    #[error("edge insert missing source or target")]
    MissingSourceOrTarget,

    /// An edge references a node that does not, and will not, exist at commit.
    #[error("dangling reference: edge {edge} references missing node {node}")]
    DanglingReference {
        /// The edge that references a missing endpoint.
        edge: Id,
        /// The missing node id.
        node: Id,
    },

    /// A transaction operation's action/kind combination is not supported.
    #[error("invalid operation: {action} on {kind}")]
    InvalidOperation {
        /// The requested action (e.g. "create").
        action: String,
        /// The entity kind the action targeted.
        kind: String,
    },

    /// A wire-level transaction message did not match the supported tuple shapes.
    #[error("invalid operation message")]
    InvalidOperationMessage,

    /// A weight was negative, or non-numeric where a number was required.
    #[error("invalid weight")]
    InvalidWeight,

    /// A permission grant referenced an operation kind outside `{read, write, execute, admin}`.
    #[error("invalid operations in permission grant: {0:?}")]
    InvalidOperations(Vec<String>),

    /// The access-control policy denied an operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An access context was supplied without both an actor and a graph id.
    #[error("access context missing actor or graph")]
    MissingActorOrGraph,

    /// The caller's cancellation token was triggered before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed before completion.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// No path exists between the requested source and target.
    #[error("no path between nodes")]
    NoPath,

    /// The schema attached to an entity rejected its data.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// An internal backend invariant was violated.
    #[error("backend internal error: {cause}")]
    BackendInternal {
        /// Human-readable cause, for diagnostics.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::BackendInternal`], logging the cause at `error` level.
    ///
    /// Mirrors the teacher's `acquire_lock` helper, which logs before
    /// converting a poisoned-lock condition into a typed error.
    pub fn backend_internal(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        error!(%cause, "backend internal error");
        Error::BackendInternal { cause }
    }
}
