//! Error types for pipediff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipediffError>;

#[derive(Error, Debug)]
pub enum PipediffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Key '{key}' already exists")]
    DuplicateKey { key: String },

    #[error("Snapshot key must be a non-empty string")]
    InvalidKey,

    #[error("Snapshot not found: {key}")]
    KeyNotFound { key: String },

    #[error("Position {position} is out of range for {len} snapshots")]
    PositionOutOfRange { position: isize, len: usize },

    #[error("The {position} of '{function}' should be a Frame. Got {observed} instead.")]
    TypeMismatch {
        function: String,
        position: String,
        observed: String,
    },

    #[error("Unknown capture option: {option}")]
    UnknownOption { option: String },

    #[error("At least two snapshots are needed for a comparison, found {found}")]
    InsufficientEntries { found: usize },

    #[error("Invalid aggregation: {message}")]
    InvalidAggregation { message: String },

    #[error("Aggregation '{function}' failed: {message}")]
    Aggregation { function: String, message: String },

    #[error("Frame error: {message}")]
    Frame { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl PipediffError {
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn type_mismatch(
        function: impl Into<String>,
        position: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            function: function.into(),
            position: position.into(),
            observed: observed.into(),
        }
    }

    pub fn unknown_option(option: impl Into<String>) -> Self {
        Self::UnknownOption {
            option: option.into(),
        }
    }

    pub fn invalid_aggregation(msg: impl Into<String>) -> Self {
        Self::InvalidAggregation {
            message: msg.into(),
        }
    }

    pub fn aggregation(function: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Aggregation {
            function: function.into(),
            message: msg.into(),
        }
    }

    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
