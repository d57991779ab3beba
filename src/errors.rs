use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP clients. Bodies stay generic; detail goes to the log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },
    #[error("not found: {resource}")]
    NotFound { resource: String },
    #[error("unsupported method: {method}")]
    UnsupportedMethod { method: String },
    #[error("internal error")]
    Internal { message: String },
}

/// Errors raised by the file store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("file {0:?} not found")]
    NotFound(String),
    #[error("failed to write {name:?}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {name:?}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub message: String,
}

impl StatusBody {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

impl AppError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MalformedRequest { reason } => {
                tracing::warn!(reason = %reason, "rejecting malformed request");
                (StatusCode::BAD_REQUEST, "Invalid request")
            }
            Self::NotFound { resource } => {
                tracing::debug!(resource = %resource, "resource not found");
                (StatusCode::NOT_FOUND, "File not found")
            }
            Self::UnsupportedMethod { method } => {
                tracing::debug!(method = %method, "unsupported method");
                (StatusCode::NOT_IMPLEMENTED, "Unsupported method")
            }
            Self::Internal { message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(StatusBody::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_maps_to_bad_request() {
        let response = AppError::malformed("missing fileData").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_error_messages_name_the_file() {
        let error = StoreError::InvalidName("../etc/passwd".to_string());
        assert!(error.to_string().contains("../etc/passwd"));
    }
}
