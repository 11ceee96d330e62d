//! Error types for sapflow-ratio
//!
//! The heat-ratio core itself never fails; these errors come from ingestion,
//! configuration and output encoding.

use thiserror::Error;

/// Errors that can occur at the edges of the pipeline
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Row {row}: field '{field}' is not numeric ({value})")]
    NonNumericField {
        row: usize,
        field: String,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
