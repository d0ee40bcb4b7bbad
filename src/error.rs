//! Error types for the Replit DB client

use std::io;
use thiserror::Error;

/// Errors that can occur when talking to a Replit DB endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Argument rejected before any request was sent (empty key, empty prefix)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The database answered with a non-success status
    #[error("Database returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
