//! Error Handling Module
//!
//! Defines the error type for the bee subspecies library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for dataset, model and training operations
#[derive(Error, Debug)]
pub enum BeeError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with the dataset table or its contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// A label string that the encoder was never fitted on
    #[error("Unknown label '{0}': not present when the encoder was fitted")]
    UnknownLabel(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error with model construction or persistence
    #[error("Model error: {0}")]
    Model(String),

    /// Error raised by the training or evaluation loops
    #[error("Training error: {0}")]
    Training(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BeeError {
    fn from(err: serde_json::Error) -> Self {
        BeeError::Serialization(err.to_string())
    }
}

/// Convenience Result type for library operations
pub type Result<T> = std::result::Result<T, BeeError>;
