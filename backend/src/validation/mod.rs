//! Output checks for the star schema.
//!
//! Two layers:
//!
//! - **Hooks** run by the block registry after each transformation:
//!   [`test_output`] (the result exists), [`test_integrity`] (row counts and
//!   surrogate ids line up) and [`test_schema_shape`] (the serialized result
//!   matches the embedded JSON Schema).
//! - **JSON Schema** helpers working on already-serialized output, used by
//!   the `validate` CLI command on files written earlier.
//!
//! The schema is embedded at compile time from
//! `schemas/star-schema.json` (draft 7).

use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{columns, StarSchema};

const STAR_SCHEMA: &str = include_str!("../../schemas/star-schema.json");

/// Validate a JSON value against a JSON Schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use tripstar::validation::validate;
///
/// let schema = json!({ "type": "object", "required": ["fact_table"] });
/// assert!(validate(&schema, &json!({ "fact_table": {} })).is_ok());
/// assert!(validate(&schema, &json!({})).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    validate(schema, data).is_ok()
}

/// Validate serialized output against the embedded star schema definition.
pub fn validate_star_schema_json(data: &Value) -> Result<(), Vec<String>> {
    let schema: Value = serde_json::from_str(STAR_SCHEMA)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])?;
    validate(&schema, data)
}

pub fn is_valid_star_schema_json(data: &Value) -> bool {
    validate_star_schema_json(data).is_ok()
}

/// Fail when the block produced no output.
pub fn test_output(output: Option<&StarSchema>) -> ValidationResult<()> {
    output.map(|_| ()).ok_or(ValidationError::Undefined)
}

/// Check that every table has the fact table's row count, that surrogate ids
/// run `0..N` in order, and that each fact row points at the dimension rows
/// with its own position.
pub fn check_integrity(schema: &StarSchema) -> ValidationResult<()> {
    let n = schema.trip_count();

    for (name, table) in schema.tables() {
        if table.len() != n {
            return Err(ValidationError::Integrity {
                table: name.to_string(),
                message: format!("{} rows, expected {}", table.len(), n),
            });
        }
    }

    let id_columns = StarSchema::DIMENSION_KEYS
        .iter()
        .copied()
        .chain(std::iter::once(("fact_table", columns::TRIP_ID)));

    for (name, id_column) in id_columns {
        let table = schema.get(name).ok_or_else(|| ValidationError::Integrity {
            table: name.to_string(),
            message: "table missing".to_string(),
        })?;
        let ids = table.values(id_column).map_err(|e| ValidationError::Integrity {
            table: name.to_string(),
            message: e.to_string(),
        })?;

        if let Some(row) = ids.iter().enumerate().position(|(i, v)| v.as_u64() != Some(i as u64)) {
            return Err(ValidationError::Integrity {
                table: name.to_string(),
                message: format!("{} at row {} is {}, expected {}", id_column, row, ids[row], row),
            });
        }
    }

    for (_, key) in StarSchema::DIMENSION_KEYS {
        let keys = schema.fact_table.values(key).map_err(|e| ValidationError::Integrity {
            table: "fact_table".to_string(),
            message: e.to_string(),
        })?;

        if let Some(row) = keys.iter().enumerate().position(|(i, v)| v.as_u64() != Some(i as u64)) {
            return Err(ValidationError::Integrity {
                table: "fact_table".to_string(),
                message: format!("{} at row {} is {}, expected trip_id {}", key, row, keys[row], row),
            });
        }
    }

    Ok(())
}

/// [`check_integrity`] as a registry hook.
pub fn test_integrity(output: Option<&StarSchema>) -> ValidationResult<()> {
    test_output(output).and_then(|_| output.map_or(Ok(()), check_integrity))
}

/// Serialized output must match the embedded JSON Schema.
pub fn test_schema_shape(output: Option<&StarSchema>) -> ValidationResult<()> {
    let schema = output.ok_or(ValidationError::Undefined)?;
    let value = serde_json::to_value(schema).map_err(|e| ValidationError::SchemaError {
        errors: vec![e.to_string()],
    })?;

    validate_star_schema_json(&value).map_err(|errors| ValidationError::SchemaError { errors })
}
