//! Error types for the filtering server.
//!
//! [`StorageError`] covers the rectangle log, [`ServerError`] covers a whole
//! request or the server lifecycle and knows how to render itself as an HTTP
//! response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;
use tracing::{error, warn};

/// Rectangle log errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open file {0}: {1}")]
    FileOpen(PathBuf, IoError),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to flush file {0}: {1}")]
    FileFlush(PathBuf, IoError),

    #[error("Malformed record at {path}:{line}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Timestamp {0:?} contains a delimiter or line break")]
    InvalidTimestamp(String),
}

/// Errors surfaced by the server, either per request or at startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The submitted payload did not have the expected shape
    #[error("Unaccepted request body format: {0}")]
    Decode(#[from] serde_json::Error),

    /// The rectangle log could not be written or read
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Binding or serving the listener failed
    #[error("Network error: {0}")]
    Network(String),
}

impl ServerError {
    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Decode(_) => StatusCode::BAD_REQUEST,
            ServerError::Storage(_) | ServerError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
