// crates/sensorgrid-core/src/mapping.rs

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{PipelineError, Result};

pub const SLOT_COLUMN: &str = "value_col";
pub const LOOKUP_COLUMN: &str = "original_column";

/// Generic value-slot name -> (vertical tag -> sensor name), built once per
/// load run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    slots: HashMap<String, HashMap<String, String>>,
}

impl ColumnMapping {
    pub fn from_slots(slots: HashMap<String, HashMap<String, String>>) -> Self {
        Self { slots }
    }

    /// Resolved sensor name for a generic slot within one vertical. An empty
    /// name counts as unmapped, never as a column named "".
    pub fn sensor_name(&self, slot: &str, vertical: &str) -> Option<&str> {
        self.slots
            .get(slot)?
            .get(vertical)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Reads the mapping table. The file must carry the `value_col` and
/// `original_column` columns; anything else is a format error. A row whose
/// serialized lookup cannot be parsed degrades to an empty lookup for that
/// slot instead of failing the load.
pub fn load_mapping(path: &Path) -> Result<ColumnMapping> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let slot_index = position_of(&headers, SLOT_COLUMN)?;
    let lookup_index = position_of(&headers, LOOKUP_COLUMN)?;

    let mut slots = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|err| PipelineError::MappingFormat(err.to_string()))?;
        let slot = match record.get(slot_index).map(str::trim) {
            Some(slot) if !slot.is_empty() => slot.to_string(),
            _ => {
                return Err(PipelineError::MappingFormat(format!(
                    "a row is missing its '{SLOT_COLUMN}' value"
                )))
            }
        };
        let raw_lookup = record.get(lookup_index).unwrap_or("");
        slots.insert(slot.clone(), parse_lookup(&slot, raw_lookup));
    }

    Ok(ColumnMapping { slots })
}

fn position_of(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or_else(|| {
            PipelineError::MappingFormat(format!(
                "expected a '{name}' column, found headers {:?}",
                headers.iter().collect::<Vec<_>>()
            ))
        })
}

/// The export writes lookups as Python-style dict literals. Try the cell as
/// JSON first, then again with single quotes normalized; a cell that still
/// fails becomes an empty lookup ("this slot is unused everywhere").
fn parse_lookup(slot: &str, raw: &str) -> HashMap<String, String> {
    let normalized = raw.replace('\'', "\"");
    for candidate in [raw, normalized.as_str()] {
        if let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(candidate) {
            return entries
                .into_iter()
                .filter_map(|(vertical, name)| match name {
                    Value::String(name) => Some((vertical, name)),
                    _ => None,
                })
                .collect();
        }
    }

    warn!("slot '{slot}': unparseable vertical lookup, treating slot as unused");
    HashMap::new()
}
