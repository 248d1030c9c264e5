//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies engine failures and request rejections into a
//! single enum that converts into a JSON error response:
//!
//! ```json
//! {"error": "validation_error", "message": "...", "code": 400, "details": {"field": "name"}}
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fabula_core::CoreError;

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A use case failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body was not valid JSON for the endpoint.
    #[error("invalid body: {0}")]
    Body(String),

    /// A path segment could not be parsed.
    #[error("invalid path: {0}")]
    Path(String),

    /// A query parameter could not be parsed.
    #[error("invalid query: {0}")]
    Query(String),
}

impl ApiError {
    /// HTTP status of the error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => match err {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
                CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Body(_) | Self::Path(_) | Self::Query(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Core(err) => err.kind(),
            Self::Body(_) | Self::Path(_) | Self::Query(_) => "validation_error",
        }
    }

    fn details(&self) -> serde_json::Value {
        match self {
            Self::Core(
                CoreError::Validation { field, .. } | CoreError::AlreadyExists { field, .. },
            ) => serde_json::json!({ "field": field }),
            _ => serde_json::json!({}),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Path(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Query(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Core(CoreError::Internal(detail)) => {
                tracing::error!(error = %detail, "Request failed");
                String::from("internal server error")
            }
            Self::Core(err @ CoreError::Transient(_)) => {
                tracing::warn!(error = %err, "Transient store conflict");
                err.to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": self.kind(),
            "message": message,
            "code": status.as_u16(),
            "details": self.details(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (CoreError::not_found("world", "x"), StatusCode::NOT_FOUND),
            (
                CoreError::already_exists("tenant", "name", "acme"),
                StatusCode::CONFLICT,
            ),
            (CoreError::validation("name", "empty"), StatusCode::BAD_REQUEST),
            (CoreError::Unauthorized, StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("builtin".into()), StatusCode::FORBIDDEN),
            (
                CoreError::Transient("40001".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoreError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn validation_details_name_the_field() {
        let err = ApiError::from(CoreError::validation("title", "title is required"));
        assert_eq!(err.details(), serde_json::json!({ "field": "title" }));
        assert_eq!(err.kind(), "validation_error");
    }
}
