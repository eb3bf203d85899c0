//! Loaders that read files or registered tables into a [`MemoryDataset`].
//!
//! Reading goes through DataFusion, so every format DataFusion reads is
//! available with its schema inference. The result is fully collected into
//! memory; use [`SqlDataset`](crate::dataset::SqlDataset) to profile a table
//! without materializing it.

use datafusion::dataframe::DataFrame;
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use tracing::{info, instrument};

use crate::dataset::MemoryDataset;
use crate::error::Result;

mod csv;

pub use csv::{load_csv, CsvOptions};

/// Reads a Parquet file into memory.
#[instrument]
pub async fn load_parquet(path: &str) -> Result<MemoryDataset> {
    ensure_exists(path).await?;
    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(path, ParquetReadOptions::default())
        .await?;
    collect(df, path).await
}

/// Reads a table registered with `ctx` into memory.
#[instrument(skip(ctx))]
pub async fn load_table(ctx: &SessionContext, table: &str) -> Result<MemoryDataset> {
    let df = ctx.table(table).await?;
    collect(df, table).await
}

/// Fails with an I/O error when `path` does not exist.
///
/// DataFusion treats a missing path as an empty listing and would otherwise
/// return an empty table.
pub(crate) async fn ensure_exists(path: &str) -> Result<()> {
    tokio::fs::metadata(path).await?;
    Ok(())
}

pub(crate) async fn collect(df: DataFrame, source: &str) -> Result<MemoryDataset> {
    let schema = df.schema().inner().clone();
    let batches = df.collect().await?;
    let dataset = MemoryDataset::try_new(schema, batches)?;

    info!(
        source = %source,
        rows = dataset.batch().num_rows(),
        columns = dataset.schema().fields().len(),
        "Loaded dataset"
    );
    Ok(dataset)
}
