//! # Tripstar - taxi trip star schema transformer
//!
//! Tripstar reshapes a flat table of taxi trips into a star schema: one fact
//! table plus seven dimension tables (datetime, passenger count, trip
//! distance, rate code, pickup location, drop-off location, payment type).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Trip CSV   │────▶│   Parser    │────▶│  Transformer │────▶│  8 tables    │
//! │  (any enc.) │     │  (auto-enc) │     │  (dims+fact) │     │  (col-major) │
//! └─────────────┘     └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tripstar::{transform_csv, TransformOptions};
//! use std::path::Path;
//!
//! let result = transform_csv(Path::new("trips.csv"), TransformOptions::default()).unwrap();
//! println!("{}", result.schema.to_json().unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Ordered tables and the star schema result
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Lookups, dimensions, fact join, pipeline
//! - [`registry`] - Explicit block and output test registration
//! - [`validation`] - Output checks and JSON Schema validation
//! - [`api`] - HTTP API server and log broadcasting

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Block registration
pub mod registry;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, PipelineError, RegistryError, ServerError, TransformError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{columns, Column, StarSchema, Table};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, infer_cell, parse_bytes,
    parse_bytes_auto, parse_csv_file, parse_csv_file_auto, ParseResult,
};

// =============================================================================
// Re-exports - Transformer
// =============================================================================

pub use transform::{
    prepare_trips, transform_trips, CodeLookup, PAYMENT_TYPE_LABELS, RATE_CODE_LABELS,
};

// =============================================================================
// Re-exports - Registry
// =============================================================================

pub use registry::{Block, BlockRegistry, OutputTestFn, TransformerFn, TRIP_STAR_SCHEMA};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    check_integrity, is_valid_star_schema_json, test_output, validate_star_schema_json,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    transform_bytes, transform_csv, transform_table, CsvInfo, PipelineOutput, TransformOptions,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
