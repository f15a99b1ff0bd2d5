//! REST API types.
//!
//! The `tables` field carries the star schema exactly as the library
//! serializes it: `{table: {column: {row position: value}}}`.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::StarSchema;
use crate::transform::pipeline::{format_delimiter, PipelineOutput};

/// Response sent after a CSV upload has been transformed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Always "ready"; failures are reported through [`error_response`]
    pub status: String,

    /// The eight output tables
    pub tables: StarSchema,

    pub metadata: ResponseMetadata,
}

/// Metadata about the transformation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Rows in the fact table
    pub trip_count: usize,

    /// Input rows dropped as exact duplicates
    pub duplicates_removed: usize,

    pub csv_info: CsvMetadata,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<PipelineOutput> for TransformResponse {
    fn from(output: PipelineOutput) -> Self {
        TransformResponse {
            job_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            metadata: ResponseMetadata {
                trip_count: output.schema.trip_count(),
                duplicates_removed: output.duplicates_removed,
                csv_info: CsvMetadata {
                    encoding: output.csv_info.encoding,
                    delimiter: format_delimiter(output.csv_info.delimiter),
                    row_count: output.csv_info.row_count,
                    columns: output.csv_info.headers,
                },
            },
            tables: output.schema,
        }
    }
}

/// Error body for failed requests.
pub fn error_response(message: &str) -> Value {
    json!({
        "status": "error",
        "error": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::{CsvInfo, PipelineOutput};
    use crate::transform::star::tests::{trip, trip_table};
    use crate::transform::star::transform_trips;

    #[test]
    fn test_response_from_output() {
        let schema = transform_trips(&trip_table(&[trip("2023-01-01 08:15:00", 1, 1, 0)]), &[]).unwrap();
        let output = PipelineOutput {
            schema,
            csv_info: CsvInfo {
                encoding: "utf-8".into(),
                delimiter: '\t',
                headers: vec!["VendorID".into()],
                row_count: 2,
            },
            duplicates_removed: 1,
        };

        let response = TransformResponse::from(output);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["metadata"]["tripCount"], 1);
        assert_eq!(json["metadata"]["duplicatesRemoved"], 1);
        assert_eq!(json["metadata"]["csvInfo"]["delimiter"], "TAB");
        assert_eq!(json["tables"]["fact_table"]["trip_id"]["0"], 0);
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_error_response() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
    }
}
