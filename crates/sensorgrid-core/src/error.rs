// crates/sensorgrid-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("mapping file is not a two-column table: {0}")]
    MappingFormat(String),

    #[error("storage backend unreachable: {0}")]
    BackendUnavailable(#[source] sqlx::Error),

    #[error("failed to replace table '{table}': {source}")]
    Insert {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
