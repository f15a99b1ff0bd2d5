//! Error types for the Tripstar transformation pipeline.
//!
//! - [`CsvError`] - CSV reading and decoding errors
//! - [`TransformError`] - Dimensional transformation errors
//! - [`ValidationError`] - Output checks run after a transformation
//! - [`RegistryError`] - Block registry errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversions go through `From`, so `?` works across layers.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the raw bytes.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// A record could not be read.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised while building the star schema.
///
/// Any of these aborts the whole transformation; no partial tables are
/// returned.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required input column is absent.
    #[error("Missing source column: {0}")]
    MissingColumn(String),

    /// A timestamp cell could not be converted to a date-time.
    #[error("Invalid timestamp in column '{column}' at row {row}: '{value}'")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    /// A column does not have one value per row.
    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A dimension row does not match exactly one fact row.
    #[error("Join integrity violated for '{dimension}' on key {key}: {message}")]
    JoinIntegrity {
        dimension: String,
        key: String,
        message: String,
    },

    /// A code lookup table was built from conflicting entries.
    #[error("Invalid lookup '{name}': {message}")]
    InvalidLookup { name: String, message: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors reported by output checks.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The block produced nothing.
    #[error("The output is undefined")]
    Undefined,

    /// Schema validation failed.
    #[error("Validation failed: {errors:?}")]
    SchemaError { errors: Vec<String> },

    /// Tables disagree on row count or surrogate ids.
    #[error("Integrity check failed for '{table}': {message}")]
    Integrity { table: String, message: String },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the block registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Block not found.
    #[error("Block not found: {0}")]
    NotFound(String),

    /// A block with that name is already registered.
    #[error("Block already registered: {0}")]
    Duplicate(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error returned by [`crate::transform::pipeline::transform_csv`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for output checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // TransformError -> PipelineError
        let transform_err = TransformError::MissingColumn("passenger_count".into());
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().contains("passenger_count"));
    }

    #[test]
    fn test_timestamp_error_format() {
        let err = TransformError::InvalidTimestamp {
            column: "tpep_pickup_datetime".into(),
            row: 3,
            value: "yesterday".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tpep_pickup_datetime"));
        assert!(msg.contains("row 3"));
        assert!(msg.contains("'yesterday'"));
    }

    #[test]
    fn test_undefined_output_message() {
        let err: PipelineError = ValidationError::Undefined.into();
        assert!(err.to_string().contains("The output is undefined"));
    }
}
