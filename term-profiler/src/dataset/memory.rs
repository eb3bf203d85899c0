//! In-memory dataset backed by Arrow record batches.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array};
use arrow::compute::{cast, concat_batches, filter, sort, sum};
use arrow::datatypes::{DataType, Float64Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::functions_aggregate::min_max::{MaxAccumulator, MinAccumulator};
use datafusion::logical_expr::Accumulator;
use datafusion::scalar::ScalarValue;

use super::{interpolate_quantiles, is_numeric_type, sort_scalars, Dataset};
use crate::error::{ProfilerError, Result};

/// A fully materialized table.
///
/// Batches are concatenated once at construction so that every statistic is a
/// single pass over one array per column.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use arrow::array::{ArrayRef, Int64Array, StringArray};
/// use term_profiler::dataset::{Dataset, MemoryDataset};
///
/// let dataset = MemoryDataset::from_columns(vec![
///     ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
///     ("status", Arc::new(StringArray::from(vec![Some("open"), None, Some("open")])) as ArrayRef),
/// ])
/// .unwrap();
///
/// assert_eq!(dataset.row_count().unwrap(), 3);
/// assert_eq!(dataset.null_count("status").unwrap(), 1);
/// assert_eq!(dataset.distinct_count("status").unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    schema: SchemaRef,
    batch: RecordBatch,
}

impl MemoryDataset {
    /// Creates a dataset from record batches sharing `schema`.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        let batch = concat_batches(&schema, &batches)?;
        Ok(Self { schema, batch })
    }

    /// Creates a dataset from a single record batch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batch,
        }
    }

    /// Creates a dataset from named columns of equal length.
    pub fn from_columns<S: AsRef<str>>(columns: Vec<(S, ArrayRef)>) -> Result<Self> {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self::from_batch(batch))
    }

    /// Schema of the underlying table.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// The concatenated record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| ProfilerError::column_not_found(name))
    }

    /// Non-null values of a column as scalars, in row order.
    fn scalars(&self, name: &str) -> Result<Vec<ScalarValue>> {
        let array = self.column(name)?;
        // `NullArray` has no null buffer, only logical nulls.
        let nulls = array.logical_nulls();
        let mut values = Vec::with_capacity(array.len());
        for row in 0..array.len() {
            if nulls.as_ref().is_some_and(|n| n.is_null(row)) {
                continue;
            }
            let value = ScalarValue::try_from_array(array.as_ref(), row)?;
            if !value.is_null() {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Non-null, non-NaN values of a numeric column as `Float64`, or `None`
    /// when no such value exists.
    fn numeric_values(&self, name: &str) -> Result<Option<Float64Array>> {
        let array = self.column(name)?;
        if !is_numeric_type(array.data_type()) {
            return Ok(None);
        }

        let floats = cast(array.as_ref(), &DataType::Float64)?;
        let floats = floats.as_primitive::<Float64Type>();
        let keep = BooleanArray::from_unary(floats, |v| !v.is_nan());
        let values = filter(floats, &keep)?.as_primitive::<Float64Type>().clone();

        Ok((!values.is_empty()).then_some(values))
    }

    /// Runs `accumulator` over a column; nulls and NaN never count.
    fn accumulate(
        &self,
        name: &str,
        mut accumulator: impl Accumulator,
    ) -> Result<Option<ScalarValue>> {
        let array = self.column(name)?;
        if array.logical_null_count() == array.len() {
            return Ok(None);
        }

        let values = if array.data_type().is_floating() {
            let floats = cast(array.as_ref(), &DataType::Float64)?;
            let keep = BooleanArray::from_unary(floats.as_primitive::<Float64Type>(), |v| {
                !v.is_nan()
            });
            filter(array.as_ref(), &keep)?
        } else {
            Arc::clone(array)
        };

        accumulator.update_batch(&[values])?;
        let value = accumulator.evaluate()?;
        Ok((!value.is_null()).then_some(value))
    }
}

impl Dataset for MemoryDataset {
    fn columns(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    fn row_count(&self) -> Result<u64> {
        Ok(self.batch.num_rows() as u64)
    }

    fn data_type(&self, column: &str) -> Result<DataType> {
        Ok(self.column(column)?.data_type().clone())
    }

    fn null_count(&self, column: &str) -> Result<u64> {
        Ok(self.column(column)?.logical_null_count() as u64)
    }

    fn distinct_count(&self, column: &str) -> Result<u64> {
        let distinct: HashSet<ScalarValue> = self.scalars(column)?.into_iter().collect();
        Ok(distinct.len() as u64)
    }

    fn min(&self, column: &str) -> Result<Option<ScalarValue>> {
        let data_type = self.data_type(column)?;
        self.accumulate(column, MinAccumulator::try_new(&data_type)?)
    }

    fn max(&self, column: &str) -> Result<Option<ScalarValue>> {
        let data_type = self.data_type(column)?;
        self.accumulate(column, MaxAccumulator::try_new(&data_type)?)
    }

    fn mean(&self, column: &str) -> Result<Option<f64>> {
        Ok(self
            .numeric_values(column)?
            .and_then(|values| sum(&values).map(|total| total / values.len() as f64)))
    }

    fn quantiles(&self, column: &str, quantiles: &[f64]) -> Result<Option<Vec<f64>>> {
        let Some(values) = self.numeric_values(column)? else {
            return Ok(None);
        };
        let sorted = sort(&values, None)?;
        Ok(interpolate_quantiles(
            sorted.as_primitive::<Float64Type>().values(),
            quantiles,
        ))
    }

    fn distinct_values(&self, column: &str) -> Result<Vec<ScalarValue>> {
        let distinct: HashSet<ScalarValue> = self.scalars(column)?.into_iter().collect();
        let mut values: Vec<ScalarValue> = distinct.into_iter().collect();
        sort_scalars(&mut values);
        Ok(values)
    }
}
