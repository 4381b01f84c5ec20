//! Error types for the shared-asv library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SharedAsvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample not found in feature table: '{0}'")]
    SampleNotFound(String),

    #[error("Duplicate sample id '{0}'")]
    DuplicateSample(String),

    #[error("Duplicate feature id '{0}'")]
    DuplicateFeature(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SharedAsvError>;
