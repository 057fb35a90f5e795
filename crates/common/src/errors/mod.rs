//! Error types for Commentarium services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    PayloadTooLarge,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidApiKey,

    // Resource errors (4xxx)
    NotFound,
    PostNotFound,
    DocumentNotFound,

    // Conflict errors (5xxx)
    DuplicateSlug,
    DuplicateSubscription,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingError,
    GenerationError,
    CompletionParseError,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidApiKey => 2002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::PostNotFound => 4002,
            ErrorCode::DocumentNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::DuplicateSlug => 5002,
            ErrorCode::DuplicateSubscription => 5003,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::GenerationError => 8003,
            ErrorCode::CompletionParseError => 8004,

            // Internal (9xxx)
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Post not found: {slug}")]
    PostNotFound { slug: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // Conflict errors
    #[error("Slug already in use: {slug}")]
    DuplicateSlug { slug: String },

    #[error("Email already subscribed: {email}")]
    DuplicateSubscription { email: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database query error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Generation service error: {message}")]
    GenerationError { message: String },

    #[error("Completion is missing required fields: {missing}")]
    CompletionParse { missing: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidApiKey => ErrorCode::InvalidApiKey,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PostNotFound { .. } => ErrorCode::PostNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::DuplicateSlug { .. } => ErrorCode::DuplicateSlug,
            AppError::DuplicateSubscription { .. } => ErrorCode::DuplicateSubscription,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) | AppError::Sqlx(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::GenerationError { .. } => ErrorCode::GenerationError,
            AppError::CompletionParse { .. } => ErrorCode::CompletionParseError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingField { .. } |
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } |
            AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::PostNotFound { .. } |
            AppError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::DuplicateSlug { .. } |
            AppError::DuplicateSubscription { .. } => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error, upstream failures included
            AppError::Database(_) |
            AppError::Sqlx(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Upstream { .. } |
            AppError::EmbeddingError { .. } |
            AppError::GenerationError { .. } |
            AppError::CompletionParse { .. } |
            AppError::HttpClient(_) |
            AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Build a response body from a bare code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                message: message.into(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge {
                message: rejection.body_text(),
            };
        }
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::PostNotFound { slug: "hello".into() };
        assert_eq!(err.code(), ErrorCode::PostNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Invalid email".into(),
            field: Some("email".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_duplicate_subscription_is_conflict() {
        let err = AppError::DuplicateSubscription { email: "a@b.it".into() };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code().as_code(), 5003);
    }

    #[test]
    fn test_upstream_failures_are_internal_errors() {
        let errors = [
            AppError::EmbeddingError { message: "boom".into() },
            AppError::GenerationError { message: "boom".into() },
            AppError::CompletionParse { missing: "title".into() },
            AppError::Upstream { message: "boom".into() },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(err.is_server_error());
        }
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let body = ErrorResponse::new(ErrorCode::DuplicateSubscription, "dup");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "DUPLICATE_SUBSCRIPTION");
        assert!(json["error"].get("details").is_none());
    }
}
