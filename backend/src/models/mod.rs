//! Domain models for the Tripstar transformation pipeline.
//!
//! - [`Table`] - Ordered, column-major table with positional row identity
//! - [`Column`] - A named column of cell values
//! - [`StarSchema`] - The eight tables produced by one transformation
//! - [`columns`] - Column names of the trip input and of every output table

use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{TransformError, TransformResult};

// =============================================================================
// Column names
// =============================================================================

/// Column names used by the trip input and the star schema tables.
pub mod columns {
    pub const VENDOR_ID: &str = "VendorID";
    pub const PICKUP_DATETIME: &str = "tpep_pickup_datetime";
    pub const DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
    pub const PASSENGER_COUNT: &str = "passenger_count";
    pub const TRIP_DISTANCE: &str = "trip_distance";
    pub const RATECODE: &str = "RatecodeID";
    pub const STORE_AND_FWD_FLAG: &str = "store_and_fwd_flag";
    pub const PICKUP_LONGITUDE: &str = "pickup_longitude";
    pub const PICKUP_LATITUDE: &str = "pickup_latitude";
    pub const DROPOFF_LONGITUDE: &str = "dropoff_longitude";
    pub const DROPOFF_LATITUDE: &str = "dropoff_latitude";
    pub const PAYMENT_TYPE: &str = "payment_type";
    pub const FARE_AMOUNT: &str = "fare_amount";
    pub const EXTRA: &str = "extra";
    pub const MTA_TAX: &str = "mta_tax";
    pub const TIP_AMOUNT: &str = "tip_amount";
    pub const TOLLS_AMOUNT: &str = "tolls_amount";
    pub const IMPROVEMENT_SURCHARGE: &str = "improvement_surcharge";
    pub const TOTAL_AMOUNT: &str = "total_amount";

    pub const TRIP_ID: &str = "trip_id";
    pub const DATETIME_ID: &str = "datetime_id";
    pub const PASSENGER_COUNT_ID: &str = "passenger_count_id";
    pub const TRIP_DISTANCE_ID: &str = "trip_distance_id";
    pub const RATE_CODE_ID: &str = "rate_code_id";
    pub const PICKUP_LOCATION_ID: &str = "pickup_location_id";
    pub const DROPOFF_LOCATION_ID: &str = "dropoff_location_id";
    pub const PAYMENT_TYPE_ID: &str = "payment_type_id";

    pub const RATECODE_NAME: &str = "ratecode_name";
    pub const PAYMENT_TYPE_NAME: &str = "payment_type_name";

    /// Columns every trip table must carry.
    pub const REQUIRED_INPUT: [&str; 19] = [
        VENDOR_ID,
        PICKUP_DATETIME,
        DROPOFF_DATETIME,
        PASSENGER_COUNT,
        TRIP_DISTANCE,
        RATECODE,
        STORE_AND_FWD_FLAG,
        PICKUP_LONGITUDE,
        PICKUP_LATITUDE,
        DROPOFF_LONGITUDE,
        DROPOFF_LATITUDE,
        PAYMENT_TYPE,
        FARE_AMOUNT,
        EXTRA,
        MTA_TAX,
        TIP_AMOUNT,
        TOLLS_AMOUNT,
        IMPROVEMENT_SURCHARGE,
        TOTAL_AMOUNT,
    ];

    /// Fact table layout, in output order.
    pub const FACT_TABLE: [&str; 17] = [
        TRIP_ID,
        VENDOR_ID,
        DATETIME_ID,
        PASSENGER_COUNT_ID,
        TRIP_DISTANCE_ID,
        RATE_CODE_ID,
        STORE_AND_FWD_FLAG,
        PICKUP_LOCATION_ID,
        DROPOFF_LOCATION_ID,
        PAYMENT_TYPE_ID,
        FARE_AMOUNT,
        EXTRA,
        MTA_TAX,
        TIP_AMOUNT,
        TOLLS_AMOUNT,
        IMPROVEMENT_SURCHARGE,
        TOTAL_AMOUNT,
    ];
}

// =============================================================================
// Table
// =============================================================================

/// A named column of cell values, one per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// An ordered table stored column by column.
///
/// Row identity is the row's position. Every column holds exactly `len()`
/// values, and no operation reorders rows unless it says so.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    len: usize,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from JSON object records, keeping `headers` order.
    ///
    /// Keys missing from a record become `null` cells.
    pub fn from_records(headers: &[String], records: &[Value]) -> Self {
        let columns = headers
            .iter()
            .map(|header| Column {
                name: header.clone(),
                values: records
                    .iter()
                    .map(|r| r.get(header).cloned().unwrap_or(Value::Null))
                    .collect(),
            })
            .collect();

        Self {
            columns,
            len: records.len(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> TransformResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))
    }

    /// Values of a column by name.
    pub fn values(&self, name: &str) -> TransformResult<&[Value]> {
        self.column(name).map(|c| c.values.as_slice())
    }

    /// Cell at (`column`, `row`).
    pub fn cell(&self, column: &str, row: usize) -> Option<&Value> {
        self.column(column).ok().and_then(|c| c.values.get(row))
    }

    /// Append a column at the end.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> TransformResult<()> {
        let position = self.columns.len();
        self.insert_column(position, name, values)
    }

    /// Insert a column at `position`, shifting later columns right.
    ///
    /// The first column added to a column-less table fixes the row count.
    pub fn insert_column(
        &mut self,
        position: usize,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> TransformResult<()> {
        let name = name.into();
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(TransformError::LengthMismatch {
                column: name,
                expected: self.len,
                found: values.len(),
            });
        }

        let position = position.min(self.columns.len());
        self.columns.retain(|c| c.name != name);
        self.columns.insert(position.min(self.columns.len()), Column { name, values });
        Ok(())
    }

    /// Keep only `names`, in that order.
    pub fn project(&self, names: &[&str]) -> TransformResult<Table> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Table {
            columns,
            len: self.len,
        })
    }

    /// Cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index))
            .collect()
    }

    /// A new table holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices
                    .iter()
                    .map(|&i| c.values.get(i).cloned().unwrap_or(Value::Null))
                    .collect(),
            })
            .collect();

        Table {
            columns,
            len: indices.len(),
        }
    }

    /// Drop rows equal to an earlier row, keeping first occurrences.
    ///
    /// The result is re-indexed from zero.
    pub fn deduplicate(&self) -> Table {
        let mut seen = HashSet::with_capacity(self.len);
        let keep: Vec<usize> = (0..self.len)
            .filter(|&i| {
                let key = Value::Array(self.row(i).into_iter().cloned().collect()).to_string();
                seen.insert(key)
            })
            .collect();

        self.take_rows(&keep)
    }

    /// Row positions `0..len` as cell values.
    pub fn positions(&self) -> Vec<Value> {
        (0..self.len).map(Value::from).collect()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        (0..self.len)
            .map(|i| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[i].clone()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Serialized as `{column: {row position: value}}`.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.name, &PositionMap(&column.values))?;
        }
        map.end()
    }
}

struct PositionMap<'a>(&'a [Value]);

impl Serialize for PositionMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (position, value) in self.0.iter().enumerate() {
            map.serialize_entry(&position, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Star Schema
// =============================================================================

/// The eight tables produced by one transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct StarSchema {
    pub datetime_dim: Table,
    pub passenger_count_dim: Table,
    pub trip_distance_dim: Table,
    pub ratecode_dim: Table,
    pub pickup_location_dim: Table,
    pub drop_location_dim: Table,
    pub payment_type_dim: Table,
    pub fact_table: Table,
}

impl StarSchema {
    /// Output table names, in emission order.
    pub const TABLE_NAMES: [&'static str; 8] = [
        "datetime_dim",
        "passenger_count_dim",
        "trip_distance_dim",
        "ratecode_dim",
        "pickup_location_dim",
        "drop_location_dim",
        "payment_type_dim",
        "fact_table",
    ];

    /// Each dimension table name with its surrogate id column.
    pub const DIMENSION_KEYS: [(&'static str, &'static str); 7] = [
        ("datetime_dim", columns::DATETIME_ID),
        ("passenger_count_dim", columns::PASSENGER_COUNT_ID),
        ("trip_distance_dim", columns::TRIP_DISTANCE_ID),
        ("ratecode_dim", columns::RATE_CODE_ID),
        ("pickup_location_dim", columns::PICKUP_LOCATION_ID),
        ("drop_location_dim", columns::DROPOFF_LOCATION_ID),
        ("payment_type_dim", columns::PAYMENT_TYPE_ID),
    ];

    /// All tables paired with their names.
    pub fn tables(&self) -> [(&'static str, &Table); 8] {
        [
            ("datetime_dim", &self.datetime_dim),
            ("passenger_count_dim", &self.passenger_count_dim),
            ("trip_distance_dim", &self.trip_distance_dim),
            ("ratecode_dim", &self.ratecode_dim),
            ("pickup_location_dim", &self.pickup_location_dim),
            ("drop_location_dim", &self.drop_location_dim),
            ("payment_type_dim", &self.payment_type_dim),
            ("fact_table", &self.fact_table),
        ]
    }

    /// Table by output name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| t)
    }

    /// Number of trips in the fact table.
    pub fn trip_count(&self) -> usize {
        self.fact_table.len()
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for StarSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StarSchema", 8)?;
        for (name, table) in self.tables() {
            state.serialize_field(name, table)?;
        }
        state.end()
    }
}
