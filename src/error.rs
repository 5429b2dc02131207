//! Error types for Rainmaker operations.

use std::path::{Path, PathBuf};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, info};

/// Primary error type for Rainmaker operations.
#[derive(Error, Debug)]
pub enum RainError {
    // Lookup errors
    #[error("MAC address not found: {mac:?}")]
    MacNotFound { mac: String },

    #[error("Manifold not found: {id}")]
    ManifoldNotFound { id: String },

    #[error("Firmware file not found: {filename}")]
    FirmwareNotFound { filename: String },

    // Client payload errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Persisted document errors
    #[error("Failed to {operation} {}: {source}", .path.display())]
    StoreUnavailable {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt document {}: {reason}", .path.display())]
    CorruptData { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // Web server errors
    #[error("Server failed to start on {addr}: {reason}")]
    ServerFailed { addr: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`RainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown device, manifold or firmware file.
    NotFound,
    /// Malformed client payload.
    InvalidInput,
    /// A persisted document could not be read or written.
    StoreUnavailable,
    /// A persisted document does not match its schema.
    CorruptData,
    /// Bad configuration file or settings.
    Config,
    /// Anything else.
    Internal,
}

impl RainError {
    /// Build a `StoreUnavailable` error for an I/O failure on `path`.
    pub fn store(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::StoreUnavailable {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Build a `CorruptData` error for a document that failed to parse.
    pub fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::CorruptData {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MacNotFound { .. }
            | Self::ManifoldNotFound { .. }
            | Self::FirmwareNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::CorruptData { .. } => ErrorKind::CorruptData,
            Self::ConfigNotFound { .. } | Self::ConfigParse(_) => ErrorKind::Config,
            Self::ServerFailed { .. } | Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the error was caused by the client rather than the server.
    pub const fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput)
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::Config
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::StoreUnavailable { .. } => Some("Check --data-dir and the [documents] paths"),
            Self::CorruptData { .. } => Some("Run: rainmaker check"),
            Self::ConfigNotFound { .. } => Some("Pass an existing file with --config"),
            Self::ServerFailed { .. } => Some("Is another process already bound to this port?"),
            _ => None,
        }
    }

    /// HTTP status used when this error terminates a request.
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to HTTP clients. Server faults stay opaque.
    pub fn public_message(&self) -> String {
        match self {
            Self::MacNotFound { .. } => "MAC address not found".to_string(),
            Self::ManifoldNotFound { .. } => "Manifold not found".to_string(),
            Self::FirmwareNotFound { .. } => "File not found".to_string(),
            Self::InvalidInput(reason) => reason.clone(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for RainError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            info!(error = %self, "Request rejected");
        } else {
            error!(error = %self, kind = ?self.kind(), "Request failed");
        }
        let body = serde_json::json!({ "error": self.public_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Convenience type alias for Results using RainError.
pub type Result<T> = std::result::Result<T, RainError>;
