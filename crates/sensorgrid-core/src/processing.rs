// crates/sensorgrid-core/src/processing.rs

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::mapping::ColumnMapping;
use crate::schema::{value_slots, NODE_ID_COLUMN, TIMESTAMP_COLUMN, VERTICAL_COLUMN};

/// Reshapes the flat export into the record set for a single vertical:
/// filters to the vertical's rows, keeps only the generic slots that resolve
/// to a sensor name, renames them, and normalizes null/timestamp handling.
///
/// Returns `Ok(None)` when the vertical has no usable sensor semantics, so
/// the caller can record a skipped vertical rather than an error.
///
/// Output column order is deterministic: `node_id`, `created_at`, then sensor
/// columns in slot-index order. Reruns on identical inputs therefore produce
/// identical table schemas.
pub fn process_vertical(
    data: &DataFrame,
    vertical: &str,
    mapping: &ColumnMapping,
) -> Result<Option<DataFrame>> {
    let mut sensor_exprs: Vec<Expr> = Vec::new();
    for slot in value_slots() {
        let Some(sensor) = mapping.sensor_name(&slot, vertical) else {
            continue;
        };
        // The export does not always carry every slot column; a mapped slot
        // missing from the dataset is dropped rather than erroring.
        let Ok(column) = data.column(&slot) else {
            continue;
        };
        let mut expr = col(slot.as_str());
        if matches!(column.dtype(), DataType::Float32 | DataType::Float64) {
            expr = expr.fill_nan(lit(NULL));
        }
        sensor_exprs.push(expr.alias(sensor));
    }

    if sensor_exprs.is_empty() {
        return Ok(None);
    }

    for required in [NODE_ID_COLUMN, TIMESTAMP_COLUMN, VERTICAL_COLUMN] {
        if data.column(required).is_err() {
            return Err(PipelineError::Processing(format!(
                "dataset is missing required column '{required}'"
            )));
        }
    }

    let mut selected = Vec::with_capacity(sensor_exprs.len() + 2);
    selected.push(col(NODE_ID_COLUMN));
    selected.push(timestamp_expr(data.column(TIMESTAMP_COLUMN)?.dtype()));
    selected.extend(sensor_exprs);

    let records = data
        .clone()
        .lazy()
        .filter(col(VERTICAL_COLUMN).eq(lit(vertical)))
        .select(selected)
        .collect()?;

    Ok(Some(records))
}

/// Canonical timestamp column. String timestamps are parsed non-strictly so a
/// row with an unparseable value ends up with a null timestamp instead of
/// failing the whole transform.
fn timestamp_expr(dtype: &DataType) -> Expr {
    match dtype {
        DataType::String => col(TIMESTAMP_COLUMN).str().strptime(
            DataType::Datetime(TimeUnit::Microseconds, None),
            StrptimeOptions {
                format: None,
                strict: false,
                exact: true,
                cache: true,
            },
            lit("raise"),
        ),
        DataType::Datetime(_, _) => col(TIMESTAMP_COLUMN),
        _ => col(TIMESTAMP_COLUMN).cast(DataType::Datetime(TimeUnit::Microseconds, None)),
    }
}
