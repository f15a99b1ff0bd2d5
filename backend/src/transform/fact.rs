//! Fact table reconstruction.
//!
//! Trips are joined to each dimension on `trip_id == <dimension>_id`. Both
//! sides are positional, so every trip must match exactly one dimension row
//! and every dimension row exactly one trip. Anything else is reported as a
//! join-integrity error rather than silently dropped or fanned out.

use serde_json::Value;
use std::collections::HashMap;

use crate::error::{TransformError, TransformResult};
use crate::models::{columns, StarSchema, Table};

fn key_of(cell: &Value) -> Option<u64> {
    cell.as_u64()
}

fn integrity(dimension: &str, key: impl ToString, message: impl Into<String>) -> TransformError {
    TransformError::JoinIntegrity {
        dimension: dimension.to_string(),
        key: key.to_string(),
        message: message.into(),
    }
}

/// One-to-one inner join of `left` and `right` on `left_key == right_key`.
///
/// Output keeps `left`'s row order and columns, followed by the columns of
/// `right` whose names `left` does not already have. `right_key` always
/// comes from `right`, replacing a same-named column of `left` in place.
pub fn join_one_to_one(
    left: &Table,
    left_key: &str,
    right: &Table,
    right_key: &str,
    dimension: &str,
) -> TransformResult<Table> {
    let mut index: HashMap<u64, usize> = HashMap::with_capacity(right.len());
    for (row, cell) in right.values(right_key)?.iter().enumerate() {
        let key = key_of(cell).ok_or_else(|| integrity(dimension, cell, "surrogate id is not a row position"))?;
        if index.insert(key, row).is_some() {
            return Err(integrity(dimension, key, "surrogate id appears more than once"));
        }
    }

    let mut order = Vec::with_capacity(left.len());
    let mut matched = vec![false; right.len()];
    for cell in left.values(left_key)? {
        let key = key_of(cell).ok_or_else(|| integrity(dimension, cell, "trip id is not a row position"))?;
        let row = *index
            .get(&key)
            .ok_or_else(|| integrity(dimension, key, "no dimension row for trip"))?;
        if matched[row] {
            return Err(integrity(dimension, key, "dimension row matched more than one trip"));
        }
        matched[row] = true;
        order.push(row);
    }

    if let Some(row) = matched.iter().position(|m| !m) {
        let key = &right.values(right_key)?[row];
        return Err(integrity(dimension, key, "dimension row has no matching trip"));
    }

    let aligned = right.take_rows(&order);
    let mut joined = left.clone();
    for name in aligned.column_names() {
        if name == right_key {
            let position = joined
                .column_names()
                .iter()
                .position(|c| *c == name)
                .unwrap_or_else(|| joined.column_names().len());
            joined.insert_column(position, name, aligned.values(name)?.to_vec())?;
        } else if !joined.has_column(name) {
            joined.push_column(name, aligned.values(name)?.to_vec())?;
        }
    }

    Ok(joined)
}

/// Join `trips` (carrying `trip_id`) to every dimension and keep the fact
/// columns.
pub fn fact_table(trips: &Table, dimensions: &[(&str, &str, &Table)]) -> TransformResult<Table> {
    let mut joined = trips.clone();
    for (name, id_column, dim) in dimensions {
        joined = join_one_to_one(&joined, columns::TRIP_ID, dim, id_column, name)?;
    }

    joined.project(&columns::FACT_TABLE)
}

/// Dimension tables of `schema` with their id columns, for [`fact_table`].
pub fn dimension_refs(schema: &StarSchema) -> Vec<(&'static str, &'static str, &Table)> {
    StarSchema::DIMENSION_KEYS
        .iter()
        .filter_map(|(name, id)| schema.get(name).map(|t| (*name, *id, t)))
        .collect()
}
