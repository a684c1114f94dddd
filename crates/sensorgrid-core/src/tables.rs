// crates/sensorgrid-core/src/tables.rs

//! Destination-table management: naming, DDL generation, and the
//! drop-and-recreate bulk load. The naming convention here is the contract
//! between the batch loader and the query service.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::db::DbPool;
use crate::error::{PipelineError, Result};

pub const TABLE_SUFFIX: &str = "_data";

/// Rows bound per INSERT statement. Postgres caps bind parameters at 65535,
/// so 500 rows leaves ample headroom for a 14-column record set.
const INSERT_CHUNK_ROWS: usize = 500;

/// Destination table for a vertical tag, e.g. `AQ` -> `aq_data`.
pub fn table_name(vertical: &str) -> String {
    format!("{}{TABLE_SUFFIX}", vertical.to_lowercase())
}

/// Double-quote an SQL identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(table: &str, columns: &[(String, &'static str)]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, sql_type)| format!("{} {sql_type}", quote_ident(name)))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        definitions.join(", ")
    )
}

pub fn insert_sql(table: &str, columns: &[String], rows: usize) -> String {
    let width = columns.len();
    let tuples: Vec<String> = (0..rows)
        .map(|row| {
            let placeholders: Vec<String> =
                (1..=width).map(|i| format!("${}", row * width + i)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();
    let quoted: Vec<String> = columns.iter().map(|name| quote_ident(name)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        quoted.join(", "),
        tuples.join(", ")
    )
}

/// Column names with the SQL type each record-set column will be stored as.
pub fn sql_column_types(records: &DataFrame) -> Result<Vec<(String, &'static str)>> {
    records
        .get_columns()
        .iter()
        .map(|column| {
            let values = ColumnValues::from_column(column)?;
            Ok((column.name().to_string(), values.sql_type()))
        })
        .collect()
}

/// Atomically replaces one vertical's destination table with the record set:
/// DROP TABLE IF EXISTS, CREATE TABLE, chunked INSERTs, all inside a single
/// transaction. Failure leaves the prior table state intact.
pub async fn replace_table(pool: &DbPool, table: &str, records: &DataFrame) -> Result<()> {
    let names: Vec<String> = records
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns: Vec<ColumnValues> = records
        .get_columns()
        .iter()
        .map(ColumnValues::from_column)
        .collect::<Result<_>>()?;
    let typed: Vec<(String, &'static str)> = names
        .iter()
        .zip(&columns)
        .map(|(name, values)| (name.clone(), values.sql_type()))
        .collect();

    let mut tx = pool.begin().await.map_err(|err| insert_error(table, err))?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
        .execute(tx.as_mut())
        .await
        .map_err(|err| insert_error(table, err))?;

    sqlx::query(&create_table_sql(table, &typed))
        .execute(tx.as_mut())
        .await
        .map_err(|err| insert_error(table, err))?;

    let height = records.height();
    let mut start = 0;
    while start < height {
        let rows = INSERT_CHUNK_ROWS.min(height - start);
        let sql = insert_sql(table, &names, rows);
        let mut query = sqlx::query(&sql);
        for row in start..start + rows {
            for column in &columns {
                query = bind_value(query, column, row);
            }
        }
        query
            .execute(tx.as_mut())
            .await
            .map_err(|err| insert_error(table, err))?;
        start += rows;
    }

    tx.commit().await.map_err(|err| insert_error(table, err))?;
    Ok(())
}

fn insert_error(table: &str, source: sqlx::Error) -> PipelineError {
    PipelineError::Insert {
        table: table.to_string(),
        source,
    }
}

/// Record-set columns lowered to the handful of Postgres types the pipeline
/// emits. Extracted once per column so the insert loop binds by index.
enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl ColumnValues {
    fn from_column(column: &Column) -> Result<Self> {
        let series = column.as_materialized_series();
        let values = match series.dtype() {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Boolean => ColumnValues::Int(
                series
                    .cast(&DataType::Int64)?
                    .i64()?
                    .into_iter()
                    .collect(),
            ),
            DataType::Float32 | DataType::Float64 => ColumnValues::Float(
                series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|value| value.filter(|v| !v.is_nan()))
                    .collect(),
            ),
            DataType::Datetime(unit, _) => {
                let unit = *unit;
                ColumnValues::Timestamp(
                    series
                        .datetime()?
                        .into_iter()
                        .map(|value| value.and_then(|v| physical_to_naive(v, unit)))
                        .collect(),
                )
            }
            DataType::String => ColumnValues::Text(
                series
                    .str()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect(),
            ),
            _ => ColumnValues::Text(
                series
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect(),
            ),
        };
        Ok(values)
    }

    fn sql_type(&self) -> &'static str {
        match self {
            ColumnValues::Int(_) => "BIGINT",
            ColumnValues::Float(_) => "DOUBLE PRECISION",
            ColumnValues::Text(_) => "TEXT",
            ColumnValues::Timestamp(_) => "TIMESTAMP",
        }
    }
}

fn physical_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Nanoseconds => DateTime::from_timestamp_nanos(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value)?,
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value)?,
    };
    Some(utc.naive_utc())
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    column: &'q ColumnValues,
    row: usize,
) -> Query<'q, Postgres, PgArguments> {
    match column {
        ColumnValues::Int(values) => query.bind(values[row]),
        ColumnValues::Float(values) => query.bind(values[row]),
        ColumnValues::Text(values) => query.bind(values[row].as_deref()),
        ColumnValues::Timestamp(values) => query.bind(values[row]),
    }
}
