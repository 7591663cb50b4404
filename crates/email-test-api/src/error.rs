//! Error types for the email test service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Dispatch error types.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// A request parameter broke `rule`.
    #[error("{message}")]
    Validation {
        field: &'static str,
        rule: &'static str,
        message: String,
    },

    #[error("Unknown email type: {0}")]
    UnknownEmailType(String),

    #[error("Method not allowed. Use POST.")]
    MethodNotAllowed,

    #[error("Email type catalogue error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub(crate) fn validation(field: &'static str, rule: &'static str, message: impl Into<String>) -> Self {
        DispatchError::Validation {
            field,
            rule,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidJson(_)
            | DispatchError::Validation { .. }
            | DispatchError::UnknownEmailType(_) => StatusCode::BAD_REQUEST,
            DispatchError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Catalog(_) | DispatchError::Database(_) | DispatchError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (field, rule) = match &self {
            DispatchError::Validation { field, rule, .. } => (Some(*field), Some(*rule)),
            DispatchError::UnknownEmailType(_) => (Some("email_type"), Some("known")),
            _ => (None, None),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            field,
            rule,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::InvalidJson(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DispatchError::validation("quantity", "range", "out of range").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DispatchError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            DispatchError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_method_not_allowed_message() {
        assert_eq!(
            DispatchError::MethodNotAllowed.to_string(),
            "Method not allowed. Use POST."
        );
    }
}
