//! Column classification types: cardinality buckets, inferred data types and
//! user-declared semantic types.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

/// Classification of a column by its distinct-value count.
///
/// Variants are declared in order of increasing distinctness, so the derived
/// `Ord` can be used directly to compare a column against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The column contains no non-null values
    None,
    /// Exactly one distinct value
    One,
    /// Exactly two distinct values
    Two,
    VeryFew,
    Few,
    Many,
    VeryMany,
    /// Every row holds a distinct, non-null value
    Unique,
}

impl Cardinality {
    /// All buckets in ascending order.
    pub const ALL: [Cardinality; 8] = [
        Cardinality::None,
        Cardinality::One,
        Cardinality::Two,
        Cardinality::VeryFew,
        Cardinality::Few,
        Cardinality::Many,
        Cardinality::VeryMany,
        Cardinality::Unique,
    ];

    /// Returns the configuration name of this bucket.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::One => "one",
            Self::Two => "two",
            Self::VeryFew => "very_few",
            Self::Few => "few",
            Self::Many => "many",
            Self::VeryMany => "very_many",
            Self::Unique => "unique",
        }
    }

    /// Comma separated list of every bucket name, for error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Cardinality::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Limits used to assign a [`Cardinality`] bucket.
///
/// The ordering of buckets and the `unique` condition are fixed; the limits
/// separating `very_few`, `few`, `many` and `very_many` are policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardinalityPolicy {
    /// Columns with fewer distinct values than this are `very_few`
    pub very_few_limit: u64,
    /// Columns with fewer distinct values than this are `few`
    pub few_limit: u64,
    /// Distinct/non-null ratio above which a column is `very_many`
    pub very_many_ratio: f64,
}

impl Default for CardinalityPolicy {
    fn default() -> Self {
        Self {
            very_few_limit: 20,
            few_limit: 60,
            very_many_ratio: 0.1,
        }
    }
}

impl CardinalityPolicy {
    /// Classifies a column from its row, null and distinct (non-null) counts.
    pub fn classify(&self, row_count: u64, null_count: u64, distinct_count: u64) -> Cardinality {
        let non_null = row_count.saturating_sub(null_count);
        if non_null == 0 || distinct_count == 0 {
            return Cardinality::None;
        }
        if null_count == 0 && distinct_count == row_count {
            return Cardinality::Unique;
        }

        match distinct_count {
            1 => Cardinality::One,
            2 => Cardinality::Two,
            n if n < self.very_few_limit => Cardinality::VeryFew,
            n if n < self.few_limit => Cardinality::Few,
            n if n as f64 / non_null as f64 > self.very_many_ratio => Cardinality::VeryMany,
            _ => Cardinality::Many,
        }
    }
}

/// Primitive type of a column, derived only from its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilerDataType {
    Int,
    Float,
    /// Numeric storage without a narrower type, e.g. a column with no values
    Numeric,
    String,
    Boolean,
    Datetime,
    Unknown,
}

impl ProfilerDataType {
    /// Maps an Arrow storage type onto a profiler type.
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Self::Int,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => Self::Float,
            // An all-null column without a declared type
            DataType::Null => Self::Numeric,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::String,
            DataType::Boolean => Self::Boolean,
            DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _)
            | DataType::Time32(_)
            | DataType::Time64(_) => Self::Datetime,
            DataType::Dictionary(_, value) => Self::from_arrow(value),
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for types that support numeric statistics.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Numeric)
    }

    /// Arrow type names accepted for values of this type.
    ///
    /// Used as the `type_list` argument of the type-list expectation.
    pub fn type_list(&self) -> Vec<&'static str> {
        const INT: [&str; 8] = [
            "Int8", "Int16", "Int32", "Int64", "UInt8", "UInt16", "UInt32", "UInt64",
        ];
        const FLOAT: [&str; 5] = ["Float16", "Float32", "Float64", "Decimal128", "Decimal256"];

        match self {
            Self::Int => INT.to_vec(),
            Self::Float => FLOAT.to_vec(),
            Self::Numeric => INT.iter().chain(FLOAT.iter()).copied().collect(),
            Self::String => vec!["Utf8", "LargeUtf8", "Utf8View"],
            Self::Boolean => vec!["Boolean"],
            Self::Datetime => vec!["Date32", "Date64", "Timestamp", "Time32", "Time64"],
            Self::Unknown => Vec::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProfilerDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-declared domain meaning of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    ValueSet,
    Datetime,
    String,
    Boolean,
    Other,
}

impl SemanticType {
    pub const ALL: [SemanticType; 6] = [
        SemanticType::Numeric,
        SemanticType::ValueSet,
        SemanticType::Datetime,
        SemanticType::String,
        SemanticType::Boolean,
        SemanticType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::ValueSet => "value_set",
            Self::Datetime => "datetime",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Other => "other",
        }
    }

    /// Comma separated list of every semantic type name, for error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(SemanticType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns `true` if a column of the given storage type may carry this tag.
    pub fn accepts(&self, data_type: ProfilerDataType) -> bool {
        match self {
            Self::Numeric => data_type.is_numeric(),
            Self::Datetime => matches!(
                data_type,
                ProfilerDataType::Datetime | ProfilerDataType::String
            ),
            Self::ValueSet | Self::String | Self::Boolean | Self::Other => true,
        }
    }

    /// Human-readable description of the storage types this tag accepts.
    pub(crate) fn expected_storage(&self) -> &'static str {
        match self {
            Self::Numeric => "an int or a float",
            Self::Datetime => "a datetime column or a string",
            _ => "any column",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}
