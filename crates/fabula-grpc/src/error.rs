//! Mapping of the core error taxonomy onto gRPC status codes.

use fabula_core::CoreError;
use tonic::Status;
use tracing::{error, warn};

/// Convert a use-case failure into the status returned to the caller.
///
/// Internal errors are logged and replaced by an opaque message; transient
/// ones are logged at warn level so retries stay visible.
#[allow(clippy::needless_pass_by_value)]
pub fn status(err: CoreError) -> Status {
    match &err {
        CoreError::NotFound { .. } => Status::not_found(err.to_string()),
        CoreError::AlreadyExists { .. } => Status::already_exists(err.to_string()),
        CoreError::Validation { .. } => Status::invalid_argument(err.to_string()),
        CoreError::Unauthorized => Status::unauthenticated(err.to_string()),
        CoreError::Forbidden(_) => Status::permission_denied(err.to_string()),
        CoreError::Transient(detail) => {
            warn!(error = %detail, "transient failure");
            Status::unavailable(err.to_string())
        }
        CoreError::Internal(detail) => {
            error!(error = %detail, "internal error");
            Status::internal("internal server error")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tonic::Code;

    use super::*;

    #[test]
    fn codes_follow_the_taxonomy() {
        let cases = [
            (CoreError::not_found("world", "w1"), Code::NotFound),
            (
                CoreError::already_exists("tenant", "name", "Acme"),
                Code::AlreadyExists,
            ),
            (CoreError::validation("name", "is required"), Code::InvalidArgument),
            (CoreError::Unauthorized, Code::Unauthenticated),
            (
                CoreError::Forbidden("built-in system".into()),
                Code::PermissionDenied,
            ),
            (CoreError::Transient("serialization failure".into()), Code::Unavailable),
            (CoreError::Internal("boom".into()), Code::Internal),
        ];
        for (err, code) in cases {
            assert_eq!(status(err).code(), code);
        }
    }

    #[test]
    fn internal_detail_is_hidden() {
        let status = status(CoreError::Internal("connection string leaked".into()));
        assert_eq!(status.message(), "internal server error");
    }

    #[test]
    fn validation_message_names_the_field() {
        let status = status(CoreError::validation("relation_type", "must not be empty"));
        assert!(status.message().contains("relation_type"));
    }
}
