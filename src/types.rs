//! Shared error type for Lantern

use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Object store error: {0}")]
    Object(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiteError {
    /// HTTP status for this error when it reaches a route handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiteError::NotFound(_) => StatusCode::NOT_FOUND,
            SiteError::InvalidInput(_) | SiteError::Json(_) => StatusCode::BAD_REQUEST,
            SiteError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SiteError::Forbidden(_) => StatusCode::FORBIDDEN,
            SiteError::Store(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code included in JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            SiteError::NotFound(_) => "NOT_FOUND",
            SiteError::InvalidInput(_) => "INVALID_INPUT",
            SiteError::Unauthorized(_) => "UNAUTHORIZED",
            SiteError::Forbidden(_) => "FORBIDDEN",
            SiteError::Store(_) => "STORE_ERROR",
            SiteError::Object(_) => "OBJECT_ERROR",
            SiteError::Io(_) => "IO_ERROR",
            SiteError::Json(_) => "INVALID_JSON",
            SiteError::Config(_) => "CONFIG_ERROR",
            SiteError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
