//! Error taxonomy of the domain engine.
//!
//! Use cases surface [`CoreError`]; transports map its variants onto wire
//! statuses. Store collaborators raise the backend-neutral [`StoreError`],
//! which converts into the matching [`CoreError`] kind.

use core::fmt::Display;

/// Errors surfaced by every use case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The resource does not exist or is not visible to the current tenant.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind ("location", "story").
        resource: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A uniqueness rule was violated.
    #[error("{resource} with {field} {value:?} already exists")]
    AlreadyExists {
        /// Resource kind.
        resource: &'static str,
        /// Field carrying the unique value.
        field: &'static str,
        /// The conflicting value.
        value: String,
    },

    /// Input shape or invariant violation.
    #[error("{field}: {message}")]
    Validation {
        /// Offending field.
        field: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// The request carries no tenant context.
    #[error("tenant context is required")]
    Unauthorized,

    /// The caller may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A retryable store conflict (serialization failure, deadlock).
    #[error("transient store conflict: {0}")]
    Transient(String),

    /// Anything unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`CoreError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for [`CoreError::AlreadyExists`].
    pub fn already_exists(
        resource: &'static str,
        field: &'static str,
        value: impl Display,
    ) -> Self {
        Self::AlreadyExists {
            resource,
            field,
            value: value.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Transient(_) => "transient",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller should retry the request with backoff.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Failures raised by store collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure or deadlock; the transaction may be retried.
    #[error("serialization conflict: {0}")]
    Conflict(String),

    /// A unique index rejected the write.
    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    /// The backend could not be reached (pool timeout, connection reset).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row body failed to encode or decode.
    #[error("row codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg)
            | StoreError::Duplicate(msg)
            | StoreError::Unavailable(msg) => Self::Transient(msg),
            StoreError::Codec(e) => Self::Internal(format!("row codec: {e}")),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_are_transient() {
        let err: CoreError = StoreError::Conflict("40001".into()).into();
        assert!(err.is_transient());
        assert_eq!(err.kind(), "transient");

        let err: CoreError = StoreError::Backend("boom".into()).into();
        assert_eq!(err.kind(), "internal_error");
    }

    #[test]
    fn display_is_human_readable() {
        let err = CoreError::not_found("location", "abc");
        assert_eq!(err.to_string(), "location not found: abc");

        let err = CoreError::validation("parent_id", "cannot move location to its own descendant");
        assert_eq!(
            err.to_string(),
            "parent_id: cannot move location to its own descendant"
        );
    }
}
