//! The dimensional transformer: one trip table in, eight star schema tables
//! out.
//!
//! ```text
//! trips ─▶ deduplicate ─▶ trip_id ─▶ 7 dimensions ─▶ join on position ─▶ fact_table
//! ```
//!
//! The transformation is pure and all-or-nothing: the first error aborts it
//! and nothing is returned.

use super::dimensions::{
    datetime_dim, drop_location_dim, passenger_count_dim, payment_type_dim, pickup_location_dim,
    ratecode_dim, trip_distance_dim,
};
use super::fact::{dimension_refs, fact_table};
use super::lookup::CodeLookup;
use crate::api::logs::{log_info, log_step, log_success};
use crate::error::TransformResult;
use crate::models::{columns, StarSchema, Table};

/// Deduplicate `input` and number the remaining rows as `trip_id`.
pub fn prepare_trips(input: &Table) -> TransformResult<Table> {
    let mut trips = input.deduplicate();
    let ids = trips.positions();
    trips.push_column(columns::TRIP_ID, ids)?;
    Ok(trips)
}

/// Build the star schema from a trip table.
///
/// `upstream` holds outputs of any other parent blocks; they do not
/// contribute to this transformation.
pub fn transform_trips(input: &Table, upstream: &[Table]) -> TransformResult<StarSchema> {
    if !upstream.is_empty() {
        log_info(format!("Ignoring {} additional upstream table(s)", upstream.len()));
    }

    let trips = prepare_trips(input)?;
    if trips.len() < input.len() {
        log_info(format!("Removed {} duplicate trip(s)", input.len() - trips.len()));
    }

    log_step(1, "Datetime dimension");
    let datetime_dim = datetime_dim(&trips)?;

    log_step(2, "passenger_count_dim");
    let passenger_count_dim = passenger_count_dim(&trips)?;

    log_step(3, "trip_distance_dim");
    let trip_distance_dim = trip_distance_dim(&trips)?;

    log_step(4, "ratecode_dim");
    let ratecode_dim = ratecode_dim(&trips, &CodeLookup::rate_codes()?)?;

    log_step(5, "pickup_location_dim");
    let pickup_location_dim = pickup_location_dim(&trips)?;

    log_step(6, "drop_location_dim");
    let drop_location_dim = drop_location_dim(&trips)?;

    log_step(7, "payment_type_dim");
    let payment_type_dim = payment_type_dim(&trips, &CodeLookup::payment_types()?)?;

    let mut schema = StarSchema {
        datetime_dim,
        passenger_count_dim,
        trip_distance_dim,
        ratecode_dim,
        pickup_location_dim,
        drop_location_dim,
        payment_type_dim,
        fact_table: Table::new(),
    };

    log_step(8, "fact_table");
    let fact = fact_table(&trips, &dimension_refs(&schema))?;
    schema.fact_table = fact;

    log_success(format!("Built star schema for {} trips", schema.trip_count()));
    Ok(schema)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TransformError;
    use serde_json::{json, Value};

    pub(crate) fn trip(pickup: &str, passengers: i64, ratecode: i64, payment: i64) -> Value {
        json!({
            "VendorID": 1,
            "tpep_pickup_datetime": pickup,
            "tpep_dropoff_datetime": "2023-01-01 08:40:00",
            "passenger_count": passengers,
            "trip_distance": 2.5,
            "RatecodeID": ratecode,
            "store_and_fwd_flag": "N",
            "pickup_longitude": -73.99,
            "pickup_latitude": 40.75,
            "dropoff_longitude": -73.95,
            "dropoff_latitude": 40.78,
            "payment_type": payment,
            "fare_amount": 12.5,
            "extra": 0.5,
            "mta_tax": 0.5,
            "tip_amount": 2.0,
            "tolls_amount": 0.0,
            "improvement_surcharge": 0.3,
            "total_amount": 15.8
        })
    }

    pub(crate) fn trip_table(records: &[Value]) -> Table {
        let headers: Vec<String> = columns::REQUIRED_INPUT.iter().map(|c| c.to_string()).collect();
        Table::from_records(&headers, records)
    }

    fn sample() -> Table {
        trip_table(&[
            trip("2023-01-01 08:15:00", 1, 1, 0),
            trip("2023-01-03 12:00:00", 2, 6, 5),
            trip("2023-01-04 18:30:00", 3, 7, 6),
        ])
    }

    #[test]
    fn test_every_table_has_n_rows() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        for (name, table) in schema.tables() {
            assert_eq!(table.len(), 3, "{} row count", name);
        }
    }

    #[test]
    fn test_surrogate_ids_are_positions() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        for (name, id) in StarSchema::DIMENSION_KEYS {
            let table = schema.get(name).unwrap();
            assert_eq!(table.column_names()[0], id);
            assert_eq!(table.values(id).unwrap(), &[json!(0), json!(1), json!(2)]);
        }
        assert_eq!(schema.fact_table.values("trip_id").unwrap(), &[json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_fact_table_layout() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        assert_eq!(schema.fact_table.column_names(), columns::FACT_TABLE.to_vec());
        assert_eq!(schema.fact_table.cell("VendorID", 1), Some(&json!(1)));
        assert_eq!(schema.fact_table.cell("total_amount", 2), Some(&json!(15.8)));
        assert_eq!(schema.fact_table.cell("store_and_fwd_flag", 0), Some(&json!("N")));
    }

    #[test]
    fn test_labels() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        assert_eq!(
            schema.ratecode_dim.values("ratecode_name").unwrap(),
            &[json!("Standard rate"), json!("Group ride"), Value::Null]
        );
        assert_eq!(
            schema.payment_type_dim.values("payment_type_name").unwrap(),
            &[json!("Credit card"), json!("Voided trip"), Value::Null]
        );
    }

    #[test]
    fn test_fact_row_links_to_datetime_row() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        let datetime_id = schema.fact_table.cell("datetime_id", 0).unwrap().as_u64().unwrap() as usize;
        let dim = &schema.datetime_dim;
        assert_eq!(dim.cell("datetime_id", datetime_id), Some(&json!(0)));
        assert_eq!(dim.cell("pick_hour", datetime_id), Some(&json!(8)));
        assert_eq!(dim.cell("pick_day", datetime_id), Some(&json!(1)));
        assert_eq!(dim.cell("pick_month", datetime_id), Some(&json!(1)));
        assert_eq!(dim.cell("pick_year", datetime_id), Some(&json!(2023)));
        assert_eq!(dim.cell("pick_weekday", datetime_id), Some(&json!(6)));
    }

    #[test]
    fn test_input_id_columns_do_not_leak_into_fact() {
        let mut input = trip_table(&[trip("2023-01-01 08:15:00", 1, 1, 1), trip("2023-01-02 09:00:00", 4, 2, 2)]);
        input.push_column("datetime_id", vec![json!(99), json!(42)]).unwrap();
        input.push_column("payment_type_id", vec![json!(7), json!(7)]).unwrap();

        let schema = transform_trips(&input, &[]).unwrap();
        assert_eq!(schema.fact_table.values("datetime_id").unwrap(), &[json!(0), json!(1)]);
        assert_eq!(schema.fact_table.values("payment_type_id").unwrap(), &[json!(0), json!(1)]);
        assert_eq!(schema.datetime_dim.values("datetime_id").unwrap(), &[json!(0), json!(1)]);
        assert!(crate::validation::check_integrity(&schema).is_ok());
    }

    #[test]
    fn test_duplicates_removed() {
        let input = trip_table(&[
            trip("2023-01-01 08:15:00", 1, 1, 1),
            trip("2023-01-01 08:15:00", 1, 1, 1),
            trip("2023-01-02 09:00:00", 4, 2, 2),
        ]);

        let schema = transform_trips(&input, &[]).unwrap();
        assert_eq!(schema.trip_count(), 2);
        assert_eq!(schema.passenger_count_dim.values("passenger_count").unwrap(), &[json!(1), json!(4)]);
    }

    #[test]
    fn test_idempotent() {
        let input = sample();
        let first = transform_trips(&input, &[]).unwrap();
        let second = transform_trips(&input, &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_upstream_tables_ignored() {
        let extra = trip_table(&[trip("2024-06-01 00:00:00", 9, 9, 9)]);
        let with = transform_trips(&sample(), &[extra]).unwrap();
        let without = transform_trips(&sample(), &[]).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_missing_passenger_count_fails() {
        let headers: Vec<String> = columns::REQUIRED_INPUT
            .iter()
            .filter(|c| **c != columns::PASSENGER_COUNT)
            .map(|c| c.to_string())
            .collect();
        let input = Table::from_records(&headers, &[trip("2023-01-01 08:15:00", 1, 1, 1)]);

        let err = transform_trips(&input, &[]).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(ref c) if c == "passenger_count"));
    }

    #[test]
    fn test_bad_timestamp_fails() {
        let input = trip_table(&[trip("31/31/2023", 1, 1, 1)]);
        let err = transform_trips(&input, &[]).unwrap_err();
        assert!(matches!(err, TransformError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_empty_input() {
        let schema = transform_trips(&trip_table(&[]), &[]).unwrap();
        assert_eq!(schema.trip_count(), 0);
        assert!(schema.ratecode_dim.has_column("ratecode_name"));
    }

    #[test]
    fn test_serialized_shape() {
        let schema = transform_trips(&sample(), &[]).unwrap();
        let value = serde_json::to_value(&schema).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 8);
        assert_eq!(value["ratecode_dim"]["ratecode_name"]["1"], "Group ride");
        assert_eq!(value["fact_table"]["trip_id"]["2"], 2);
    }
}
