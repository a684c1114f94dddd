// crates/sensorgrid-core/src/schema.rs

//! Column names shared by the flat sensor export and the load pipeline.

pub const NODE_ID_COLUMN: &str = "node_id";
pub const TIMESTAMP_COLUMN: &str = "created_at";
pub const VERTICAL_COLUMN: &str = "type";

/// Number of generic value slots the export carries per row.
pub const VALUE_SLOT_COUNT: usize = 12;

/// Vertical tags loaded when the caller does not narrow the set.
pub const DEFAULT_VERTICALS: &[&str] = &["AQ", "WF", "SL"];

/// Generic value-slot column names in slot-index order (`value 1` .. `value 12`).
pub fn value_slots() -> impl Iterator<Item = String> {
    (1..=VALUE_SLOT_COUNT).map(|index| format!("value {index}"))
}
