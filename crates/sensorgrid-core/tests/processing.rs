use std::collections::HashMap;

use polars::prelude::*;
use sensorgrid_core::mapping::ColumnMapping;
use sensorgrid_core::processing::process_vertical;

fn mapping_from(entries: &[(&str, &[(&str, &str)])]) -> ColumnMapping {
    let slots = entries
        .iter()
        .map(|(slot, pairs)| {
            let lookup: HashMap<String, String> = pairs
                .iter()
                .map(|(vertical, sensor)| (vertical.to_string(), sensor.to_string()))
                .collect();
            (slot.to_string(), lookup)
        })
        .collect();
    ColumnMapping::from_slots(slots)
}

fn sample_dataset() -> DataFrame {
    df![
        "node_id" => &[7i64, 8, 9],
        "created_at" => &["2024-01-01T00:00:00", "2024-01-01T00:05:00", "not-a-timestamp"],
        "type" => &["AQ", "WF", "AQ"],
        "value 1" => &[Some(12.5f64), Some(3.1), None],
        "value 2" => &[None::<f64>, Some(2.0), Some(44.0)],
    ]
    .expect("failed to build sample dataset")
}

fn column_names(df: &DataFrame) -> Vec<&str> {
    df.get_column_names().iter().map(|name| name.as_str()).collect()
}

#[test]
fn renames_slots_and_drops_unmapped_columns() {
    let mapping = mapping_from(&[("value 1", &[("AQ", "pm25")]), ("value 2", &[])]);

    let out = process_vertical(&sample_dataset(), "AQ", &mapping)
        .expect("transform failed")
        .expect("expected a record set for AQ");

    assert_eq!(column_names(&out), ["node_id", "created_at", "pm25"]);
    assert_eq!(out.height(), 2);

    let node_ids = out.column("node_id").unwrap().as_materialized_series().i64().unwrap();
    assert_eq!(node_ids.get(0), Some(7));

    let pm25 = out.column("pm25").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(pm25.get(0), Some(12.5));
    assert_eq!(pm25.get(1), None);
}

#[test]
fn vertical_without_sensor_semantics_is_absent() {
    let mapping = mapping_from(&[("value 1", &[("AQ", "pm25")])]);
    let out = process_vertical(&sample_dataset(), "SL", &mapping).expect("transform failed");
    assert!(out.is_none());
}

#[test]
fn empty_sensor_name_does_not_qualify() {
    let mapping = mapping_from(&[("value 1", &[("AQ", "")])]);
    let out = process_vertical(&sample_dataset(), "AQ", &mapping).expect("transform failed");
    assert!(out.is_none());
}

#[test]
fn filters_rows_to_the_requested_vertical() {
    let mapping = mapping_from(&[
        ("value 1", &[("WF", "flow_rate")]),
        ("value 2", &[("WF", "pressure_kpa")]),
    ]);

    let out = process_vertical(&sample_dataset(), "WF", &mapping)
        .expect("transform failed")
        .expect("expected a record set for WF");

    assert_eq!(out.height(), 1);
    let flow = out.column("flow_rate").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(flow.get(0), Some(3.1));
}

#[test]
fn sensor_columns_follow_slot_index_order() {
    // Lookup insertion order must not leak into the output schema.
    let mapping = mapping_from(&[
        ("value 2", &[("AQ", "pm10")]),
        ("value 1", &[("AQ", "pm25")]),
    ]);

    let out = process_vertical(&sample_dataset(), "AQ", &mapping)
        .expect("transform failed")
        .expect("expected a record set for AQ");

    assert_eq!(column_names(&out), ["node_id", "created_at", "pm25", "pm10"]);
}

#[test]
fn no_generic_slot_names_survive() {
    let mapping = mapping_from(&[
        ("value 1", &[("AQ", "pm25")]),
        ("value 2", &[("AQ", "pm10")]),
    ]);

    let out = process_vertical(&sample_dataset(), "AQ", &mapping)
        .expect("transform failed")
        .expect("expected a record set for AQ");

    for name in column_names(&out) {
        assert!(!name.starts_with("value "), "generic column '{name}' leaked");
    }
}

#[test]
fn unparseable_timestamp_becomes_null() {
    let mapping = mapping_from(&[("value 2", &[("AQ", "pm10")])]);

    let out = process_vertical(&sample_dataset(), "AQ", &mapping)
        .expect("transform failed")
        .expect("expected a record set for AQ");

    let created_at = out.column("created_at").unwrap();
    assert!(matches!(created_at.dtype(), DataType::Datetime(_, _)));
    // Row for node 9 carries "not-a-timestamp"; only that row degrades.
    assert_eq!(created_at.null_count(), 1);

    let pm10 = out.column("pm10").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(pm10.get(1), Some(44.0));
}

#[test]
fn mapped_slot_missing_from_dataset_is_dropped() {
    let mapping = mapping_from(&[
        ("value 1", &[("AQ", "pm25")]),
        ("value 5", &[("AQ", "humidity")]),
    ]);

    let out = process_vertical(&sample_dataset(), "AQ", &mapping)
        .expect("transform failed")
        .expect("expected a record set for AQ");

    assert_eq!(column_names(&out), ["node_id", "created_at", "pm25"]);
}

#[test]
fn all_mapped_slots_missing_is_absent() {
    let mapping = mapping_from(&[("value 5", &[("AQ", "humidity")])]);
    let out = process_vertical(&sample_dataset(), "AQ", &mapping).expect("transform failed");
    assert!(out.is_none());
}
