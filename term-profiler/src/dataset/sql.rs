//! Dataset backed by a DataFusion table, with every statistic pushed down as
//! a SQL query.

use std::fmt;

use std::collections::{BTreeMap, BTreeSet};

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use datafusion::scalar::ScalarValue;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use super::{is_numeric_type, sort_scalars, Dataset, QuantilePosition};
use crate::error::{ProfilerError, Result};

/// Maximum accepted identifier length.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// A table registered with a DataFusion [`SessionContext`].
///
/// Each statistic is a blocking round trip: the dataset owns a current-thread
/// tokio runtime and blocks on it for every query. It must therefore not be
/// used from inside another tokio runtime.
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::*;
/// use term_profiler::dataset::{Dataset, SqlDataset};
///
/// # fn example() -> term_profiler::error::Result<()> {
/// let ctx = SessionContext::new();
/// // ... register a table named "passengers" ...
/// let dataset = SqlDataset::new(ctx, "passengers")?;
/// println!("{} rows", dataset.row_count()?);
/// # Ok(())
/// # }
/// ```
pub struct SqlDataset {
    ctx: SessionContext,
    table: String,
    schema: SchemaRef,
    runtime: Runtime,
}

impl SqlDataset {
    /// Wraps the table `table` of `ctx`, resolving its schema eagerly.
    pub fn new(ctx: SessionContext, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let schema = runtime.block_on(async {
            let df = ctx.table(table.as_str()).await?;
            Ok::<_, ProfilerError>(df.schema().inner().clone())
        })?;

        debug!(
            table = %table,
            columns = schema.fields().len(),
            "Resolved SQL dataset schema"
        );

        Ok(Self {
            ctx,
            table,
            schema,
            runtime,
        })
    }

    /// Name of the wrapped table.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> Result<String> {
        quote_identifier(&self.table)
    }

    /// Quotes a column after checking it exists.
    fn quoted_column(&self, column: &str) -> Result<String> {
        if self.schema.index_of(column).is_err() {
            return Err(ProfilerError::column_not_found(column));
        }
        quote_identifier(column)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    fn query(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        self.runtime.block_on(async {
            let df = self.ctx.sql(sql).await?;
            Ok::<_, ProfilerError>(df.collect().await?)
        })
    }

    /// Runs a query returning one row with one column.
    fn query_scalar(&self, sql: &str) -> Result<ScalarValue> {
        let batches = self.query(sql)?;
        let batch = batches
            .iter()
            .find(|batch| batch.num_rows() > 0)
            .ok_or_else(|| ProfilerError::backend(format!("Query returned no rows: {sql}")))?;
        Ok(ScalarValue::try_from_array(batch.column(0).as_ref(), 0)?)
    }

    fn query_count(&self, sql: &str) -> Result<u64> {
        match self.query_scalar(sql)? {
            ScalarValue::Int64(Some(count)) => Ok(count.max(0) as u64),
            ScalarValue::UInt64(Some(count)) => Ok(count),
            other => Err(ProfilerError::backend(format!(
                "Expected a count, found {other:?}"
            ))),
        }
    }

    /// Every scalar of the first column of the query result, nulls dropped.
    fn query_column(&self, sql: &str) -> Result<Vec<ScalarValue>> {
        let mut values = Vec::new();
        for batch in self.query(sql)? {
            let array = batch.column(0);
            for row in 0..array.len() {
                let value = ScalarValue::try_from_array(array.as_ref(), row)?;
                if !value.is_null() {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    fn extreme(&self, aggregate: &str, column: &str) -> Result<Option<ScalarValue>> {
        let quoted = self.quoted_column(column)?;
        let filter = if self.data_type(column)?.is_floating() {
            format!(" WHERE NOT isnan({quoted})")
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT {aggregate}({quoted}) FROM {}{filter}",
            self.quoted_table()?
        );
        let value = self.query_scalar(&sql)?;
        Ok((!value.is_null()).then_some(value))
    }

    /// The column cast to `DOUBLE` and a predicate keeping its non-null,
    /// non-NaN values, or `None` for non-numeric columns.
    fn numeric_operand(&self, column: &str) -> Result<Option<(String, String)>> {
        if !is_numeric_type(&self.data_type(column)?) {
            return Ok(None);
        }
        let value = format!("CAST({} AS DOUBLE)", self.quoted_column(column)?);
        let predicate = format!("{value} IS NOT NULL AND NOT isnan({value})");
        Ok(Some((value, predicate)))
    }

    /// Runs a single-aggregate query over the numeric values of a column.
    fn numeric_aggregate(&self, aggregate: &str, column: &str) -> Result<Option<f64>> {
        let Some((value, predicate)) = self.numeric_operand(column)? else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT CAST({aggregate}({value}) AS DOUBLE) FROM {} WHERE {predicate}",
            self.quoted_table()?
        );
        match self.query_scalar(&sql)? {
            ScalarValue::Float64(value) => Ok(value),
            other => Err(ProfilerError::backend(format!(
                "Expected a double, found {other:?}"
            ))),
        }
    }

    /// Values at the given zero-based ranks of the ascending numeric values
    /// of a column.
    ///
    /// Only the requested rows leave the query engine.
    fn values_at_ranks(
        &self,
        value: &str,
        predicate: &str,
        ranks: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, f64>> {
        // ROW_NUMBER is one-based
        let wanted = ranks
            .iter()
            .map(|rank| (rank + 1).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT CAST(row_rank AS BIGINT) AS row_rank, value FROM (\
             SELECT {value} AS value, ROW_NUMBER() OVER (ORDER BY {value}) AS row_rank \
             FROM {} WHERE {predicate}) AS ranked WHERE row_rank IN ({wanted})",
            self.quoted_table()?
        );

        let mut values = BTreeMap::new();
        for batch in self.query(&sql)? {
            let row_ranks = batch.column(0).as_primitive::<Int64Type>();
            let row_values = batch.column(1).as_primitive::<Float64Type>();
            for row in 0..batch.num_rows() {
                let rank = (row_ranks.value(row) - 1).max(0) as usize;
                values.insert(rank, row_values.value(row));
            }
        }
        Ok(values)
    }
}

impl fmt::Debug for SqlDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlDataset")
            .field("table", &self.table)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Dataset for SqlDataset {
    fn columns(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    fn row_count(&self) -> Result<u64> {
        self.query_count(&format!("SELECT COUNT(*) FROM {}", self.quoted_table()?))
    }

    fn data_type(&self, column: &str) -> Result<DataType> {
        self.schema
            .field_with_name(column)
            .map(|field| field.data_type().clone())
            .map_err(|_| ProfilerError::column_not_found(column))
    }

    fn null_count(&self, column: &str) -> Result<u64> {
        let quoted = self.quoted_column(column)?;
        self.query_count(&format!(
            "SELECT COUNT(*) - COUNT({quoted}) FROM {}",
            self.quoted_table()?
        ))
    }

    fn distinct_count(&self, column: &str) -> Result<u64> {
        let quoted = self.quoted_column(column)?;
        self.query_count(&format!(
            "SELECT COUNT(DISTINCT {quoted}) FROM {}",
            self.quoted_table()?
        ))
    }

    fn min(&self, column: &str) -> Result<Option<ScalarValue>> {
        self.extreme("MIN", column)
    }

    fn max(&self, column: &str) -> Result<Option<ScalarValue>> {
        self.extreme("MAX", column)
    }

    fn mean(&self, column: &str) -> Result<Option<f64>> {
        self.numeric_aggregate("AVG", column)
    }

    fn median(&self, column: &str) -> Result<Option<f64>> {
        self.numeric_aggregate("median", column)
    }

    /// Exact quantiles: the count and the ranks around each quantile are
    /// computed by the engine, and only those values are interpolated here.
    fn quantiles(&self, column: &str, quantiles: &[f64]) -> Result<Option<Vec<f64>>> {
        let Some((value, predicate)) = self.numeric_operand(column)? else {
            return Ok(None);
        };
        let count = self.query_count(&format!(
            "SELECT COUNT(*) FROM {} WHERE {predicate}",
            self.quoted_table()?
        ))? as usize;
        if count == 0 {
            return Ok(None);
        }

        let positions: Vec<QuantilePosition> = quantiles
            .iter()
            .map(|q| QuantilePosition::new(count, *q))
            .collect();
        let ranks: BTreeSet<usize> = positions
            .iter()
            .flat_map(|position| [position.lower, position.upper])
            .collect();
        let values = self.values_at_ranks(&value, &predicate, &ranks)?;

        positions
            .iter()
            .map(|position| match (values.get(&position.lower), values.get(&position.upper)) {
                (Some(lower), Some(upper)) => Ok(position.interpolate(*lower, *upper)),
                _ => Err(ProfilerError::backend(format!(
                    "Quantile ranks {}..={} missing from {column}",
                    position.lower, position.upper
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn distinct_values(&self, column: &str) -> Result<Vec<ScalarValue>> {
        let quoted = self.quoted_column(column)?;
        let mut values = self.query_column(&format!(
            "SELECT DISTINCT {quoted} FROM {} WHERE {quoted} IS NOT NULL",
            self.quoted_table()?
        ))?;
        sort_scalars(&mut values);
        Ok(values)
    }
}

/// Rejects identifiers that cannot be quoted safely.
fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(ProfilerError::backend(
            "SQL identifier cannot be empty or whitespace-only",
        ));
    }
    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ProfilerError::backend(format!(
            "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
        )));
    }
    if identifier.contains('\0') {
        return Err(ProfilerError::backend(
            "SQL identifier cannot contain null bytes",
        ));
    }
    Ok(())
}

/// Double-quotes an identifier, escaping embedded quotes.
///
/// Column names taken from CSV headers routinely contain spaces and
/// punctuation (`Unnamed: 0`), so only the structural checks of
/// [`validate_identifier`] are applied.
pub(crate) fn quote_identifier(identifier: &str) -> Result<String> {
    validate_identifier(identifier)?;
    let escaped = identifier.replace('"', "\"\"");
    Ok(format!("\"{escaped}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("age").unwrap(), "\"age\"");
        assert_eq!(quote_identifier("Unnamed: 0").unwrap(), "\"Unnamed: 0\"");
        assert_eq!(
            quote_identifier("say \"hi\"").unwrap(),
            "\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("   ").is_err());
        assert!(quote_identifier("bad\0name").is_err());
        assert!(quote_identifier(&"x".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }
}
