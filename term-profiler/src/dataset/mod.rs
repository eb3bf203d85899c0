//! The dataset capability the profiler is written against.
//!
//! The profiler never inspects a dataframe directly. Everything it needs is
//! expressed through the [`Dataset`] trait, which is implemented once per
//! backend:
//!
//! - [`MemoryDataset`]: Arrow record batches held in memory, statistics
//!   computed in-process
//! - [`SqlDataset`]: a table registered with a DataFusion `SessionContext`,
//!   every statistic pushed down as a SQL query
//!
//! All statistics ignore null values. Numeric statistics are only defined for
//! numeric storage types and return `None` otherwise, or when the column holds
//! no numeric values.

use std::cmp::Ordering;

use arrow::array::{AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date64Type};
use arrow::util::display::array_value_to_string;
use datafusion::scalar::ScalarValue;
use serde_json::Value;

use crate::error::Result;

mod memory;
mod sql;

pub use memory::MemoryDataset;
pub use sql::SqlDataset;

/// Read-only statistics over a materialized table.
pub trait Dataset {
    /// Column names in table order.
    fn columns(&self) -> Vec<String>;

    /// Total number of rows.
    fn row_count(&self) -> Result<u64>;

    /// Native storage type of a column.
    fn data_type(&self, column: &str) -> Result<DataType>;

    /// Number of null values in a column.
    fn null_count(&self, column: &str) -> Result<u64>;

    /// Number of distinct non-null values in a column.
    fn distinct_count(&self, column: &str) -> Result<u64>;

    /// Smallest non-null value.
    fn min(&self, column: &str) -> Result<Option<ScalarValue>>;

    /// Largest non-null value.
    fn max(&self, column: &str) -> Result<Option<ScalarValue>>;

    /// Arithmetic mean of a numeric column.
    fn mean(&self, column: &str) -> Result<Option<f64>>;

    /// Values at the requested quantiles (each in `[0, 1]`) of a numeric
    /// column, linearly interpolated between the closest ranks.
    fn quantiles(&self, column: &str, quantiles: &[f64]) -> Result<Option<Vec<f64>>>;

    /// Median of a numeric column, averaging the two middle values when the
    /// count is even.
    fn median(&self, column: &str) -> Result<Option<f64>> {
        Ok(self
            .quantiles(column, &[0.5])?
            .and_then(|values| values.first().copied()))
    }

    /// Distinct non-null values, sorted ascending.
    fn distinct_values(&self, column: &str) -> Result<Vec<ScalarValue>>;

    /// Returns `true` if the table has a column with this name.
    fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|c| c == column)
    }
}

/// Converts a scalar into the JSON value used in expectation arguments.
pub fn scalar_to_json(value: &ScalarValue) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    match value {
        ScalarValue::Boolean(Some(v)) => Value::Bool(*v),
        ScalarValue::Int8(Some(v)) => Value::from(*v),
        ScalarValue::Int16(Some(v)) => Value::from(*v),
        ScalarValue::Int32(Some(v)) => Value::from(*v),
        ScalarValue::Int64(Some(v)) => Value::from(*v),
        ScalarValue::UInt8(Some(v)) => Value::from(*v),
        ScalarValue::UInt16(Some(v)) => Value::from(*v),
        ScalarValue::UInt32(Some(v)) => Value::from(*v),
        ScalarValue::UInt64(Some(v)) => Value::from(*v),
        ScalarValue::Float32(Some(v)) => float_to_json(f64::from(*v)),
        ScalarValue::Float64(Some(v)) => float_to_json(*v),
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => Value::String(v.clone()),
        other if other.data_type().is_temporal() => other
            .to_array()
            .and_then(|array| Ok(array_value_to_string(&array, 0)?))
            .map(Value::String)
            .unwrap_or_else(|_| Value::String(other.to_string())),
        other => Value::String(other.to_string()),
    }
}

/// Converts a float into JSON; NaN and infinities become `null`.
pub fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Sorts scalars ascending; incomparable pairs keep their relative order.
pub(crate) fn sort_scalars(values: &mut [ScalarValue]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Where a quantile falls among `count` ascending values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct QuantilePosition {
    /// Zero-based rank at or below the quantile
    pub lower: usize,
    /// Zero-based rank at or above the quantile
    pub upper: usize,
    /// Distance from `lower` towards `upper`, in `[0, 1)`
    pub fraction: f64,
}

impl QuantilePosition {
    /// Position of `quantile` (clamped to `[0, 1]`) among `count > 0` values.
    pub(crate) fn new(count: usize, quantile: f64) -> Self {
        let position = quantile.clamp(0.0, 1.0) * count.saturating_sub(1) as f64;
        let lower = position.floor() as usize;
        Self {
            lower,
            upper: position.ceil() as usize,
            fraction: position - lower as f64,
        }
    }

    /// Linear interpolation between the values at the two ranks.
    pub(crate) fn interpolate(&self, lower: f64, upper: f64) -> f64 {
        lower + (upper - lower) * self.fraction
    }
}

/// Linear interpolation between closest ranks over ascending `sorted` values.
pub(crate) fn interpolate_quantiles(sorted: &[f64], quantiles: &[f64]) -> Option<Vec<f64>> {
    if sorted.is_empty() {
        return None;
    }

    let values = quantiles
        .iter()
        .map(|q| {
            let position = QuantilePosition::new(sorted.len(), *q);
            position.interpolate(sorted[position.lower], sorted[position.upper])
        })
        .collect();

    Some(values)
}

/// Parses strings as dates or timestamps, yielding milliseconds since the
/// epoch or `None` for values that do not parse.
///
/// Accepts ISO dates with or without zero padding (`2020-9-1`) and RFC 3339
/// style timestamps.
pub(crate) fn parse_datetime_strings(values: &[&str]) -> Result<Vec<Option<i64>>> {
    let strings = StringArray::from(values.to_vec());
    let parsed = cast(&strings, &DataType::Date64)?;
    Ok(parsed.as_primitive::<Date64Type>().iter().collect())
}

/// The string inside a string scalar.
pub(crate) fn scalar_str(value: &ScalarValue) -> Option<&str> {
    match value {
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => Some(v.as_str()),
        _ => None,
    }
}

/// Returns `true` for storage types numeric statistics are defined on.
pub(crate) fn is_numeric_type(data_type: &DataType) -> bool {
    data_type.is_numeric() || matches!(data_type, DataType::Null)
}
