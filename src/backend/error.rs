/**
 * API Error Types
 *
 * The error taxonomy for the mutation API. Every handler returns
 * `Result<_, ApiError>`; the `IntoResponse` impl maps each variant to
 * an HTTP status and a JSON `{"message": ...}` body. Storage and
 * internal failures are logged in full server-side and surfaced to
 * clients as a generic message.
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backend::store::StoreError;

/// Errors returned by mutation-API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or invalid credential
    #[error("unauthorized")]
    Unauthorized,

    /// Resource absent, or present but not visible to the caller
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// Join attempted by an existing member
    #[error("already a member of this list")]
    AlreadyMember,

    /// Bad request payload
    #[error("{message}")]
    Validation { message: String },

    /// Document store failure
    #[error("storage error")]
    Storage(#[source] StoreError),

    /// Anything else that should never reach the client in detail
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::AlreadyMember => StatusCode::CONFLICT,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("list"),
            StoreError::AlreadyMember => ApiError::AlreadyMember,
            StoreError::EmailTaken => {
                ApiError::validation("a user with this email already exists")
            }
            other => ApiError::Storage(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side detail stays in the log, never in the body.
        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
            "server error".to_string()
        } else {
            tracing::warn!(error = %self, "request rejected");
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::not_found("collab list").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::AlreadyMember.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from(StoreError::AlreadyMember),
            ApiError::AlreadyMember
        ));
        assert!(matches!(
            ApiError::from(StoreError::EmailTaken),
            ApiError::Validation { .. }
        ));
    }
}
