//! Error types for the cbti_core library.

use crate::validation::ValidationReport;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cbti_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A wall-clock value that is not "HH:MM"
    #[error("Invalid time '{0}': expected HH:MM")]
    TimeFormat(String),

    /// A required diary answer is absent while its governing condition holds
    #[error("Missing answer: {0}")]
    MissingAnswer(String),

    /// The entry validator rejected a diary submission
    #[error("Diary entry rejected: {0}")]
    Rejected(ValidationReport),

    /// Prescription lookup or versioning error
    #[error("Prescription error: {0}")]
    Prescription(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
