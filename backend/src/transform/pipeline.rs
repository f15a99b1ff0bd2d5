//! High-level pipeline API: CSV in, star schema out.
//!
//! Combines parsing, the dimensional transformation and the output tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use tripstar::transform::pipeline::{transform_csv, TransformOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = transform_csv(Path::new("yellow_tripdata.csv"), TransformOptions::default())?;
//!     println!("{} trips", result.schema.trip_count());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::PipelineResult;
use crate::models::{StarSchema, Table};
use crate::parser::{parse_bytes, parse_csv_file, ParseResult};
use crate::registry::{BlockRegistry, TRIP_STAR_SCHEMA};

/// Options for the transformation pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Force the CSV delimiter instead of detecting it
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Skip the output tests
    #[serde(default)]
    pub skip_validation: bool,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.records.len(),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The eight output tables
    pub schema: StarSchema,

    /// CSV parsing metadata
    pub csv_info: CsvInfo,

    /// Rows dropped as exact duplicates
    pub duplicates_removed: usize,
}

/// Transform a trip CSV file into a star schema.
///
/// 1. Parses the CSV with auto-detection
/// 2. Runs the trip star schema block
/// 3. Runs the block's output tests (unless skipped)
pub fn transform_csv(path: &Path, options: TransformOptions) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {}", path.display()));
    let parsed = parse_csv_file(path, options.delimiter)?;
    transform_parsed(&parsed, &options)
}

/// Same as [`transform_csv`] for raw bytes.
pub fn transform_bytes(bytes: &[u8], options: TransformOptions) -> PipelineResult<PipelineOutput> {
    let parsed = parse_bytes(bytes, options.delimiter)?;
    transform_parsed(&parsed, &options)
}

/// Transform an already-built table.
pub fn transform_table(input: &Table, options: &TransformOptions) -> PipelineResult<StarSchema> {
    let registry = BlockRegistry::with_defaults();

    if options.skip_validation {
        log_info("(output tests skipped)");
        registry.run_transformer(TRIP_STAR_SCHEMA, input, &[])
    } else {
        registry.run(TRIP_STAR_SCHEMA, input, &[])
    }
}

fn transform_parsed(parsed: &ParseResult, options: &TransformOptions) -> PipelineResult<PipelineOutput> {
    let csv_info = CsvInfo::from(parsed);
    log_success(format!("Detected encoding: {}", csv_info.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(csv_info.delimiter)));
    log_success(format!("Read {} rows", csv_info.row_count));

    if parsed.records.is_empty() {
        log_warning("CSV has no data rows, output tables will be empty");
    }

    log_info(format!("📋 CSV has {} columns:", csv_info.headers.len()));
    for (i, col) in csv_info.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    let input = parsed.to_table();
    log_info("⚙️  Building star schema...");
    let schema = transform_table(&input, options)?;

    Ok(PipelineOutput {
        duplicates_removed: input.len() - schema.trip_count(),
        schema,
        csv_info,
    })
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
