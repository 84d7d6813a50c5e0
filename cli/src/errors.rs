//! Error types for the AppSync client

use std::error::Error as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hint prepended when the server cannot be reached at all
pub const OFFLINE_HINT: &str =
    "Unable to connect to the AppSync server. Are you offline, or behind a firewall or proxy?";

/// Error returned by every management API operation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    /// Used when no response was received (network failure)
    pub const GATEWAY_TIMEOUT: u16 = 504;
    pub const INTERNAL_SERVER: u16 = 500;
    pub const NOT_FOUND: u16 = 404;
    /// Used when the resource already exists
    pub const CONFLICT: u16 = 409;
    pub const UNAUTHORIZED: u16 = 401;

    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    /// A 2xx response whose body could not be decoded
    pub fn unparseable(body: &str) -> Self {
        Self::new(
            format!("Could not parse response: {}", body),
            Self::INTERNAL_SERVER,
        )
    }

    /// Map a failure that produced no usable response
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let status_code = err
            .status()
            .map(|s| s.as_u16())
            .unwrap_or(Self::GATEWAY_TIMEOUT);

        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message = format!("{}: {}", message, cause);
            source = cause.source();
        }

        if is_name_resolution_failure(err, &message) {
            message = format!("{}\n({})", OFFLINE_HINT, message);
        }

        Self::new(message, status_code)
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code == Self::CONFLICT
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code == Self::UNAUTHORIZED
    }
}

fn is_name_resolution_failure(err: &reqwest::Error, chain: &str) -> bool {
    if !err.is_connect() {
        return false;
    }
    let chain = chain.to_lowercase();
    chain.contains("dns error")
        || chain.contains("failed to lookup address")
        || chain.contains("name or service not known")
        || chain.contains("no such host")
}

/// Coarse classes consumed by the command layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad local input, never retried
    Validation,
    /// Enumerating, archiving, hashing or signing failed
    Packaging,
    /// Network failure or non-2xx server response
    Transport,
    Internal,
}

/// Main error type for the AppSync client
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("Token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    PackagingError(String),

    #[error("Could not sign package: {0}")]
    SigningError(String),

    #[error("{0}")]
    ApiError(#[from] ApiError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify the error for the command layer
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::ValidationError(_) | AppError::ConfigError(_) => ErrorClass::Validation,
            AppError::IoError(_)
            | AppError::ArchiveError(_)
            | AppError::TokenError(_)
            | AppError::PackagingError(_)
            | AppError::SigningError(_) => ErrorClass::Packaging,
            AppError::ApiError(_) | AppError::HttpError(_) => ErrorClass::Transport,
            AppError::JsonError(_) | AppError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Server status code, if the error came from the management API
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::ApiError(e) => Some(e.status_code),
            _ => None,
        }
    }

    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            AppError::ApiError(e) => Some(e),
            _ => None,
        }
    }
}
