/// Unified error types for the wallet name service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the name service
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Validation errors (bad addresses, bad config values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport errors from the REST backend or RPC node
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON-RPC level errors (reverts, node errors)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// ABI encoding/decoding errors
    #[error("ABI error: {0}")]
    Abi(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ResolverError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ResolverError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ResolverError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            ResolverError::Http(_) | ResolverError::Rpc(_) | ResolverError::Abi(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamError",
                "Upstream resolver unavailable".to_string(),
            ),
            ResolverError::Config(_) | ResolverError::Internal(_) | ResolverError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for name service operations
pub type ResolverResult<T> = Result<T, ResolverError>;
