//! Error kinds shared across the fact store, RBAC engine and group service.

use std::fmt;

/// Result type used throughout `affinity-core`.
pub type Result<T> = std::result::Result<T, AffinityError>;

/// The error kinds named by the RBAC evaluation engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AffinityError {
    /// A required fact was absent where the caller asked for strict semantics.
    #[error("not found: {0}")]
    NotFound(String),

    /// A `grant` would be redundant with an existing direct or inherited grant.
    #[error("{principal} already effectively granted {role} on {resource}")]
    AlreadyGranted {
        /// The principal the grant was attempted for.
        principal: String,
        /// The role that was already in effect.
        role: String,
        /// The resource the grant targeted.
        resource: String,
    },

    /// An RBAC gate refused an operation.
    #[error("{principal} has no permission to {permission} on {resource}")]
    PermissionDenied {
        /// The principal that was denied.
        principal: String,
        /// The permission that was required.
        permission: String,
        /// The resource the permission was required on.
        resource: String,
    },

    /// A request lacked valid authentication.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A principal string or authorization header was malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The backing fact store failed with an opaque I/O-level cause.
    #[error("backend error: {0}")]
    BackendError(Box<dyn std::error::Error + Send + Sync>),
}

impl AffinityError {
    /// Wrap an opaque backend failure, preserving the original cause for logging.
    pub fn backend<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendError(Box::new(cause))
    }

    /// Wrap a backend failure from a plain message, for stores with no typed error.
    pub fn backend_msg(msg: impl fmt::Display) -> Self {
        Self::BackendError(msg.to_string().into())
    }
}
