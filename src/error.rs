//! Error types for membership and access-control operations.
//!
//! Every failure surfaced by the services falls into one of a fixed set of
//! categories. The request layer maps those categories to status codes; with
//! the `http` feature enabled [`AccessError`] converts into an axum response
//! directly.

use crate::roles::ParseRoleError;
use std::fmt;

/// The main error type for membership, access-list and broadcast operations.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Malformed input from the caller (empty names, oversized messages...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced organization, project, chatroom or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The actor lacks standing for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Persisted data violates an invariant the schema guarantees.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by the request layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected input, never retried.
    Validation,
    /// Missing entity, never retried.
    NotFound,
    /// Missing standing, never retried.
    Authorization,
    /// Corrupt data, fatal.
    Integrity,
    /// Store failure, fatal for this request.
    Storage,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Integrity => "integrity",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl AccessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// The category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Forbidden(_) => ErrorCategory::Authorization,
            Self::Integrity(_) => ErrorCategory::Integrity,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Whether the error indicates a server-side fault rather than a caller mistake.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Integrity | ErrorCategory::Storage
        )
    }

    /// A message that is safe to show to clients.
    ///
    /// Client errors carry their detail. Fatal errors are reduced to a generic
    /// message; the detail belongs in server logs only.
    #[must_use]
    pub fn safe_message(&self) -> String {
        if self.is_fatal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<ParseRoleError> for AccessError {
    fn from(err: ParseRoleError) -> Self {
        Self::Integrity(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AccessError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(feature = "http")]
mod response {
    use super::{AccessError, ErrorCategory};
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde::Serialize;

    #[derive(Serialize)]
    struct ErrorResponse {
        error: String,
        category: String,
        error_id: String,
    }

    impl AccessError {
        /// HTTP status code for this error.
        #[must_use]
        pub fn status_code(&self) -> StatusCode {
            match self.category() {
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Authorization => StatusCode::FORBIDDEN,
                ErrorCategory::Integrity | ErrorCategory::Storage => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl IntoResponse for AccessError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let error_id = uuid::Uuid::new_v4().to_string();

            if self.is_fatal() {
                tracing::error!(
                    status = status.as_u16(),
                    error_id = %error_id,
                    error = %self,
                    "Request failed"
                );
            } else {
                tracing::debug!(
                    status = status.as_u16(),
                    error_id = %error_id,
                    error = %self,
                    "Request rejected"
                );
            }

            let body = ErrorResponse {
                error: self.safe_message(),
                category: self.category().to_string(),
                error_id,
            };

            (status, Json(body)).into_response()
        }
    }
}

/// Result type alias for access-control operations.
pub type Result<T> = std::result::Result<T, AccessError>;
