//! Error handling for the bookstore HTTP layer

use axum::{
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation { message: String, code: String },

    #[error("not found: {message}")]
    NotFound {
        message: String,
        code: String,
        detail: Option<String>,
    },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: "validation_error".to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
            detail: None,
        }
    }

    /// Create the error returned for requests no route or static file claims
    pub fn route_not_found(method: &Method, uri: &Uri, detail: impl Into<String>) -> Self {
        Self::NotFound {
            message: format!("route {} {} does not exist", method, uri),
            code: "route_not_found".to_string(),
            detail: Some(detail.into()),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Replace the machine-readable code of a client error
    pub fn with_code(mut self, new_code: impl Into<String>) -> Self {
        match &mut self {
            AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::BadRequest { code, .. } => *code = new_code.into(),
            AppError::Internal(_) => {}
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();

        let body = match self {
            AppError::Validation { message, code } | AppError::BadRequest { message, code } => {
                tracing::warn!(
                    error_id = %error_id,
                    error_code = %code,
                    status_code = %status.as_u16(),
                    reason = %message,
                    "request rejected"
                );
                ErrorBody {
                    success: false,
                    message,
                    code,
                    detail: None,
                }
            }
            AppError::NotFound {
                message,
                code,
                detail,
            } => {
                tracing::warn!(
                    error_id = %error_id,
                    error_code = %code,
                    status_code = %status.as_u16(),
                    reason = %message,
                    "request rejected"
                );
                ErrorBody {
                    success: false,
                    message,
                    code,
                    detail,
                }
            }
            AppError::Internal(e) => {
                // The cause stays in the logs; clients only get the error id.
                tracing::error!(
                    error_id = %error_id,
                    error_code = "internal_error",
                    status_code = %status.as_u16(),
                    error = %format!("{:#}", e),
                    "request failed"
                );
                ErrorBody {
                    success: false,
                    message: format!("{} (error id {})", INTERNAL_ERROR_MESSAGE, error_id),
                    code: "internal_error".to_string(),
                    detail: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
