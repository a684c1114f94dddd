// crates/sensorgrid-core/src/db.rs

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::{PipelineError, Result};

pub type DbPool = Pool<Postgres>;

/// Establish a Postgres connection pool with sensible defaults for both the
/// loader and the query service.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(PipelineError::BackendUnavailable)
}

/// Cheap readiness probe so a load run fails fast before touching any table.
pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(PipelineError::BackendUnavailable)?;
    Ok(())
}
