use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sensorgrid_core::{db, pipeline, schema};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sensorgrid vertical loader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split the flat sensor export into per-vertical tables
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Flat sensor-reading export
    #[arg(long, default_value = "iot_dataset.csv")]
    data: PathBuf,

    /// Slot-to-sensor-name mapping table
    #[arg(long, default_value = "iot_dataset_mapping.csv")]
    mapping: PathBuf,

    /// Vertical tags to load; any other tag in the export is ignored
    #[arg(long, value_delimiter = ',')]
    verticals: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Load(args) => {
            let pool = connect_pool().await?;
            let allowed: Vec<String> = args.verticals.unwrap_or_else(|| {
                schema::DEFAULT_VERTICALS
                    .iter()
                    .map(|tag| tag.to_string())
                    .collect()
            });

            let summary = pipeline::run(&pool, &args.data, &args.mapping, &allowed).await?;
            info!(
                "load finished: {} tables replaced, {} verticals skipped, {} failures",
                summary.loaded.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
            for failure in &summary.failed {
                warn!("table {} was not replaced: {}", failure.table, failure.error);
            }
            Ok(())
        }
    }
}

async fn connect_pool() -> Result<db::DbPool> {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    Ok(db::connect(&database_url).await?)
}
