// crates/sensorgrid-core/src/pipeline.rs

use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::db::{self, DbPool};
use crate::error::{PipelineError, Result};
use crate::mapping::load_mapping;
use crate::processing::process_vertical;
use crate::schema::VERTICAL_COLUMN;
use crate::tables;

#[derive(Debug, Clone, Serialize)]
pub struct TableLoad {
    pub vertical: String,
    pub table: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub vertical: String,
    pub table: String,
    pub error: String,
}

/// Outcome of one load run: which tables were replaced, which verticals were
/// skipped (no mapping or no rows), and which tables failed to load.
#[derive(Debug, Default, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<TableLoad>,
    pub skipped: Vec<String>,
    pub failed: Vec<TableFailure>,
}

/// Batch load: reads the flat export and the mapping table, then replaces one
/// destination table per allowed vertical. Fatal errors (missing sources,
/// unreachable backend) abort before any table is touched; a single table's
/// insert failure is reported and the remaining verticals still run.
pub async fn run(
    pool: &DbPool,
    dataset_path: &Path,
    mapping_path: &Path,
    allowed: &[String],
) -> Result<LoadSummary> {
    for path in [dataset_path, mapping_path] {
        if !path.exists() {
            return Err(PipelineError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
    }
    db::ping(pool).await?;

    let mapping = load_mapping(mapping_path)?;
    info!("loaded mapping for {} generic slots", mapping.len());

    let dataset = read_dataset(dataset_path)?;
    info!("loaded dataset with {} rows", dataset.height());

    let mut summary = LoadSummary::default();
    for vertical in distinct_verticals(&dataset)? {
        if !allowed.iter().any(|tag| tag == &vertical) {
            // Unknown vertical tags are dropped without comment; the allowed
            // set is the whitelist, not the dataset.
            continue;
        }

        let table = tables::table_name(&vertical);
        let records = match process_vertical(&dataset, &vertical, &mapping) {
            Ok(None) => {
                warn!("no sensor mappings for vertical {vertical}, skipping");
                summary.skipped.push(vertical);
                continue;
            }
            Ok(Some(records)) if records.height() == 0 => {
                info!("no rows for vertical {vertical}, skipping");
                summary.skipped.push(vertical);
                continue;
            }
            Ok(Some(records)) => records,
            Err(err) => {
                error!("vertical {vertical}: {err}");
                summary.failed.push(TableFailure {
                    vertical,
                    table,
                    error: err.to_string(),
                });
                continue;
            }
        };

        match tables::replace_table(pool, &table, &records).await {
            Ok(()) => {
                info!(
                    "replaced table {table} with {} rows for vertical {vertical}",
                    records.height()
                );
                summary.loaded.push(TableLoad {
                    vertical,
                    table,
                    rows: records.height(),
                });
            }
            Err(err) => {
                error!("vertical {vertical}: {err}");
                summary.failed.push(TableFailure {
                    vertical,
                    table,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// Reads the flat export eagerly. Schema inference scans the whole file so a
/// value slot that starts sparse still gets its real dtype.
pub fn read_dataset(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Distinct vertical tags in first-seen order.
pub fn distinct_verticals(dataset: &DataFrame) -> Result<Vec<String>> {
    let column = dataset.column(VERTICAL_COLUMN)?;
    let tags = column.as_materialized_series().str()?;

    let mut distinct: Vec<String> = Vec::new();
    for tag in tags.into_iter().flatten() {
        if !distinct.iter().any(|seen| seen == tag) {
            distinct.push(tag.to_string());
        }
    }
    Ok(distinct)
}
