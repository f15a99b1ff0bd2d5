//! Dimension table builders.
//!
//! Each builder projects its source columns from the deduplicated trip table,
//! derives descriptive columns, and puts a surrogate id equal to the row
//! position in front. Row order is never changed.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;

use super::lookup::CodeLookup;
use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Table};

/// Timestamp layouts accepted besides RFC 3339.
const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Layout used when timestamps are written back out.
pub const OUTPUT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp string.
///
/// Offsets are dropped after parsing, keeping the wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a whole timestamp column. `null` cells stay absent; anything else
/// that fails to parse aborts.
pub fn parse_timestamp_column(table: &Table, column: &str) -> TransformResult<Vec<Option<NaiveDateTime>>> {
    table
        .values(column)?
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Value::Null => Ok(None),
            Value::String(s) => parse_timestamp(s).map(Some).ok_or_else(|| {
                TransformError::InvalidTimestamp {
                    column: column.to_string(),
                    row,
                    value: s.clone(),
                }
            }),
            other => Err(TransformError::InvalidTimestamp {
                column: column.to_string(),
                row,
                value: other.to_string(),
            }),
        })
        .collect()
}

/// Put the row-position surrogate id in front of `table`.
fn with_surrogate_id(mut table: Table, id_column: &str) -> TransformResult<Table> {
    let ids = table.positions();
    table.insert_column(0, id_column, ids)?;
    Ok(table)
}

fn calendar_field(stamps: &[Option<NaiveDateTime>], field: impl Fn(&NaiveDateTime) -> i64) -> Vec<Value> {
    stamps
        .iter()
        .map(|s| s.as_ref().map(|dt| Value::from(field(dt))).unwrap_or(Value::Null))
        .collect()
}

/// Hour, day, month, year and weekday (Monday = 0) columns for `prefix`.
fn push_calendar_columns(
    table: &mut Table,
    prefix: &str,
    stamps: &[Option<NaiveDateTime>],
) -> TransformResult<()> {
    table.push_column(format!("{}_hour", prefix), calendar_field(stamps, |dt| dt.hour() as i64))?;
    table.push_column(format!("{}_day", prefix), calendar_field(stamps, |dt| dt.day() as i64))?;
    table.push_column(format!("{}_month", prefix), calendar_field(stamps, |dt| dt.month() as i64))?;
    table.push_column(format!("{}_year", prefix), calendar_field(stamps, |dt| dt.year() as i64))?;
    table.push_column(
        format!("{}_weekday", prefix),
        calendar_field(stamps, |dt| dt.weekday().num_days_from_monday() as i64),
    )?;
    Ok(())
}

fn format_stamps(stamps: &[Option<NaiveDateTime>]) -> Vec<Value> {
    stamps
        .iter()
        .map(|s| {
            s.map(|dt| Value::String(dt.format(OUTPUT_DATETIME_FORMAT).to_string()))
                .unwrap_or(Value::Null)
        })
        .collect()
}

/// `datetime_dim`: both timestamps plus their calendar breakdown.
pub fn datetime_dim(trips: &Table) -> TransformResult<Table> {
    let pickups = parse_timestamp_column(trips, columns::PICKUP_DATETIME)?;
    let dropoffs = parse_timestamp_column(trips, columns::DROPOFF_DATETIME)?;

    let mut dim = Table::new();
    dim.push_column(columns::PICKUP_DATETIME, format_stamps(&pickups))?;
    dim.push_column(columns::DROPOFF_DATETIME, format_stamps(&dropoffs))?;
    push_calendar_columns(&mut dim, "pick", &pickups)?;
    push_calendar_columns(&mut dim, "drop", &dropoffs)?;

    with_surrogate_id(dim, columns::DATETIME_ID)
}

/// `passenger_count_dim`
pub fn passenger_count_dim(trips: &Table) -> TransformResult<Table> {
    with_surrogate_id(trips.project(&[columns::PASSENGER_COUNT])?, columns::PASSENGER_COUNT_ID)
}

/// `trip_distance_dim`
pub fn trip_distance_dim(trips: &Table) -> TransformResult<Table> {
    with_surrogate_id(trips.project(&[columns::TRIP_DISTANCE])?, columns::TRIP_DISTANCE_ID)
}

/// `ratecode_dim`: raw rate code and its label.
pub fn ratecode_dim(trips: &Table, lookup: &CodeLookup) -> TransformResult<Table> {
    let mut dim = trips.project(&[columns::RATECODE])?;
    let names = lookup.label_column(dim.values(columns::RATECODE)?);
    dim.push_column(columns::RATECODE_NAME, names)?;
    with_surrogate_id(dim, columns::RATE_CODE_ID)
}

/// `pickup_location_dim`
pub fn pickup_location_dim(trips: &Table) -> TransformResult<Table> {
    with_surrogate_id(
        trips.project(&[columns::PICKUP_LONGITUDE, columns::PICKUP_LATITUDE])?,
        columns::PICKUP_LOCATION_ID,
    )
}

/// `drop_location_dim`
pub fn drop_location_dim(trips: &Table) -> TransformResult<Table> {
    with_surrogate_id(
        trips.project(&[columns::DROPOFF_LONGITUDE, columns::DROPOFF_LATITUDE])?,
        columns::DROPOFF_LOCATION_ID,
    )
}

/// `payment_type_dim`: raw payment code and its label.
pub fn payment_type_dim(trips: &Table, lookup: &CodeLookup) -> TransformResult<Table> {
    let mut dim = trips.project(&[columns::PAYMENT_TYPE])?;
    let names = lookup.label_column(dim.values(columns::PAYMENT_TYPE)?);
    dim.push_column(columns::PAYMENT_TYPE_NAME, names)?;
    with_surrogate_id(dim, columns::PAYMENT_TYPE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trips(records: Vec<Value>) -> Table {
        let headers: Vec<String> = records[0]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        Table::from_records(&headers, &records)
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2023-01-01 08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01T08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01 08:15"), Some(expected));
        assert_eq!(parse_timestamp("01/01/2023 08:15:00 AM"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01T08:15:00+05:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01 08:15:00.250").map(|d| d.second()), Some(0));
        assert!(parse_timestamp("2023-01-01").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_datetime_dim_calendar_fields() {
        let table = trips(vec![json!({
            "tpep_pickup_datetime": "2023-01-01 08:15:00",
            "tpep_dropoff_datetime": "2023-01-02 23:59:59"
        })]);

        let dim = datetime_dim(&table).unwrap();
        assert_eq!(dim.column_names()[0], "datetime_id");
        assert_eq!(dim.cell("datetime_id", 0), Some(&json!(0)));
        assert_eq!(dim.cell("pick_hour", 0), Some(&json!(8)));
        assert_eq!(dim.cell("pick_day", 0), Some(&json!(1)));
        assert_eq!(dim.cell("pick_month", 0), Some(&json!(1)));
        assert_eq!(dim.cell("pick_year", 0), Some(&json!(2023)));
        assert_eq!(dim.cell("pick_weekday", 0), Some(&json!(6)));
        assert_eq!(dim.cell("drop_hour", 0), Some(&json!(23)));
        assert_eq!(dim.cell("drop_weekday", 0), Some(&json!(0)));
        assert_eq!(dim.cell("tpep_pickup_datetime", 0), Some(&json!("2023-01-01 08:15:00")));
    }

    #[test]
    fn test_datetime_dim_column_order() {
        let table = trips(vec![json!({
            "tpep_pickup_datetime": "2023-01-01 08:15:00",
            "tpep_dropoff_datetime": "2023-01-01 08:30:00"
        })]);

        let dim = datetime_dim(&table).unwrap();
        assert_eq!(
            dim.column_names(),
            vec![
                "datetime_id",
                "tpep_pickup_datetime",
                "tpep_dropoff_datetime",
                "pick_hour",
                "pick_day",
                "pick_month",
                "pick_year",
                "pick_weekday",
                "drop_hour",
                "drop_day",
                "drop_month",
                "drop_year",
                "drop_weekday",
            ]
        );
    }

    #[test]
    fn test_unparseable_timestamp_fails() {
        let table = trips(vec![
            json!({"tpep_pickup_datetime": "2023-01-01 08:15:00", "tpep_dropoff_datetime": "2023-01-01 08:30:00"}),
            json!({"tpep_pickup_datetime": "garbage", "tpep_dropoff_datetime": "2023-01-01 08:30:00"}),
        ]);

        let err = datetime_dim(&table).unwrap_err();
        assert!(matches!(err, TransformError::InvalidTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_null_timestamp_gives_null_fields() {
        let table = trips(vec![json!({
            "tpep_pickup_datetime": null,
            "tpep_dropoff_datetime": "2023-01-01 08:30:00"
        })]);

        let dim = datetime_dim(&table).unwrap();
        assert_eq!(dim.cell("pick_hour", 0), Some(&Value::Null));
        assert_eq!(dim.cell("drop_hour", 0), Some(&json!(8)));
    }

    #[test]
    fn test_ratecode_dim_labels() {
        let table = trips(vec![
            json!({"RatecodeID": 1}),
            json!({"RatecodeID": 6}),
            json!({"RatecodeID": 7}),
        ]);

        let dim = ratecode_dim(&table, &CodeLookup::rate_codes().unwrap()).unwrap();
        assert_eq!(dim.column_names(), vec!["rate_code_id", "RatecodeID", "ratecode_name"]);
        assert_eq!(
            dim.values("ratecode_name").unwrap(),
            &[json!("Standard rate"), json!("Group ride"), Value::Null]
        );
        assert_eq!(dim.values("rate_code_id").unwrap(), &[json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_payment_type_dim_labels() {
        let table = trips(vec![
            json!({"payment_type": 0}),
            json!({"payment_type": 5}),
            json!({"payment_type": 6}),
        ]);

        let dim = payment_type_dim(&table, &CodeLookup::payment_types().unwrap()).unwrap();
        assert_eq!(dim.column_names(), vec!["payment_type_id", "payment_type", "payment_type_name"]);
        assert_eq!(
            dim.values("payment_type_name").unwrap(),
            &[json!("Credit card"), json!("Voided trip"), Value::Null]
        );
    }

    #[test]
    fn test_location_dims() {
        let table = trips(vec![json!({
            "pickup_longitude": -73.99,
            "pickup_latitude": 40.75,
            "dropoff_longitude": -73.95,
            "dropoff_latitude": 40.78
        })]);

        let pickup = pickup_location_dim(&table).unwrap();
        assert_eq!(pickup.column_names(), vec!["pickup_location_id", "pickup_longitude", "pickup_latitude"]);
        let drop = drop_location_dim(&table).unwrap();
        assert_eq!(drop.column_names(), vec!["dropoff_location_id", "dropoff_longitude", "dropoff_latitude"]);
        assert_eq!(drop.cell("dropoff_latitude", 0), Some(&json!(40.78)));
    }

    #[test]
    fn test_missing_column() {
        let table = trips(vec![json!({"trip_distance": 1.2})]);
        let err = passenger_count_dim(&table).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(ref c) if c == "passenger_count"));
    }
}
