//! Error types for the profile wizard

use thiserror::Error;

/// Result type alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;

#[derive(Error, Debug)]
pub enum WizardError {

    // =============================
    // Wizard Errors
    // =============================

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Backend returned {status} for {path}: {body}")]
    Backend {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Malformed backend response from {0}")]
    MalformedResponse(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        field: String,
        value: String,
    },

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
