//! Expectations and the suite that collects them.
//!
//! An [`Expectation`] is a named assertion about a dataset plus its keyword
//! arguments. Its *domain* is the column (or column list) it is about, and a
//! suite holds at most one expectation per type and domain.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Every expectation the profiler can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationType {
    ExpectTableColumnsToMatchOrderedList,
    ExpectTableRowCountToBeBetween,
    ExpectColumnValuesToBeInTypeList,
    ExpectColumnValuesToNotBeNull,
    ExpectColumnValuesToBeNull,
    ExpectColumnProportionOfUniqueValuesToBeBetween,
    ExpectColumnMinToBeBetween,
    ExpectColumnMaxToBeBetween,
    ExpectColumnMeanToBeBetween,
    ExpectColumnMedianToBeBetween,
    ExpectColumnQuantileValuesToBeBetween,
    ExpectColumnValuesToBeInSet,
    ExpectColumnValuesToBeBetween,
    ExpectColumnValuesToBeUnique,
    ExpectCompoundColumnsToBeUnique,
}

impl ExpectationType {
    pub const ALL: [ExpectationType; 15] = [
        Self::ExpectTableColumnsToMatchOrderedList,
        Self::ExpectTableRowCountToBeBetween,
        Self::ExpectColumnValuesToBeInTypeList,
        Self::ExpectColumnValuesToNotBeNull,
        Self::ExpectColumnValuesToBeNull,
        Self::ExpectColumnProportionOfUniqueValuesToBeBetween,
        Self::ExpectColumnMinToBeBetween,
        Self::ExpectColumnMaxToBeBetween,
        Self::ExpectColumnMeanToBeBetween,
        Self::ExpectColumnMedianToBeBetween,
        Self::ExpectColumnQuantileValuesToBeBetween,
        Self::ExpectColumnValuesToBeInSet,
        Self::ExpectColumnValuesToBeBetween,
        Self::ExpectColumnValuesToBeUnique,
        Self::ExpectCompoundColumnsToBeUnique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpectTableColumnsToMatchOrderedList => {
                "expect_table_columns_to_match_ordered_list"
            }
            Self::ExpectTableRowCountToBeBetween => "expect_table_row_count_to_be_between",
            Self::ExpectColumnValuesToBeInTypeList => "expect_column_values_to_be_in_type_list",
            Self::ExpectColumnValuesToNotBeNull => "expect_column_values_to_not_be_null",
            Self::ExpectColumnValuesToBeNull => "expect_column_values_to_be_null",
            Self::ExpectColumnProportionOfUniqueValuesToBeBetween => {
                "expect_column_proportion_of_unique_values_to_be_between"
            }
            Self::ExpectColumnMinToBeBetween => "expect_column_min_to_be_between",
            Self::ExpectColumnMaxToBeBetween => "expect_column_max_to_be_between",
            Self::ExpectColumnMeanToBeBetween => "expect_column_mean_to_be_between",
            Self::ExpectColumnMedianToBeBetween => "expect_column_median_to_be_between",
            Self::ExpectColumnQuantileValuesToBeBetween => {
                "expect_column_quantile_values_to_be_between"
            }
            Self::ExpectColumnValuesToBeInSet => "expect_column_values_to_be_in_set",
            Self::ExpectColumnValuesToBeBetween => "expect_column_values_to_be_between",
            Self::ExpectColumnValuesToBeUnique => "expect_column_values_to_be_unique",
            Self::ExpectCompoundColumnsToBeUnique => "expect_compound_columns_to_be_unique",
        }
    }

    /// Returns `true` for expectations about the table as a whole.
    pub fn is_table_expectation(&self) -> bool {
        matches!(
            self,
            Self::ExpectTableColumnsToMatchOrderedList | Self::ExpectTableRowCountToBeBetween
        )
    }
}

impl fmt::Display for ExpectationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpectationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// One assertion about the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub expectation_type: ExpectationType,
    pub kwargs: Map<String, Value>,
}

impl Expectation {
    /// Creates an expectation with no arguments.
    pub fn new(expectation_type: ExpectationType) -> Self {
        Self {
            expectation_type,
            kwargs: Map::new(),
        }
    }

    /// Creates an expectation about a single column.
    pub fn for_column(expectation_type: ExpectationType, column: &str) -> Self {
        Self::new(expectation_type).with_kwarg("column", column)
    }

    /// Adds a keyword argument.
    pub fn with_kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    /// The column this expectation is about, if it is a column expectation.
    pub fn column(&self) -> Option<&str> {
        self.kwargs.get("column").and_then(Value::as_str)
    }

    /// Looks up a keyword argument.
    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Same expectation type over the same column or column list.
    fn same_domain(&self, other: &Expectation) -> bool {
        self.expectation_type == other.expectation_type
            && self.kwargs.get("column") == other.kwargs.get("column")
            && self.kwargs.get("column_list") == other.kwargs.get("column_list")
    }
}

/// Per-column suite metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub description: String,
}

/// Suite metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteMeta {
    /// Every profiled column, keyed by name
    pub columns: BTreeMap<String, ColumnMeta>,
}

/// An ordered collection of expectations.
///
/// # Examples
///
/// ```rust
/// use term_profiler::expectations::{Expectation, ExpectationSuite, ExpectationType};
///
/// let mut suite = ExpectationSuite::new("orders");
/// suite.add(Expectation::for_column(ExpectationType::ExpectColumnValuesToNotBeNull, "id"));
/// suite.add(
///     Expectation::for_column(ExpectationType::ExpectColumnValuesToNotBeNull, "id")
///         .with_kwarg("mostly", 0.9),
/// );
///
/// // the second expectation replaced the first
/// assert_eq!(suite.len(), 1);
/// assert_eq!(suite.expectations[0].kwarg("mostly").unwrap(), 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub name: String,
    pub expectations: Vec<Expectation>,
    pub meta: SuiteMeta,
}

impl Default for ExpectationSuite {
    fn default() -> Self {
        Self::new("default")
    }
}

impl ExpectationSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expectations: Vec::new(),
            meta: SuiteMeta::default(),
        }
    }

    /// Adds an expectation, replacing any earlier one with the same type and
    /// domain in place.
    pub fn add(&mut self, expectation: Expectation) {
        match self
            .expectations
            .iter_mut()
            .find(|existing| existing.same_domain(&expectation))
        {
            Some(existing) => *existing = expectation,
            None => self.expectations.push(expectation),
        }
    }

    /// Records a profiled column in the suite metadata.
    pub fn add_column_meta(&mut self, column: &str) {
        self.meta
            .columns
            .entry(column.to_string())
            .or_default();
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Expectations of the given type, in suite order.
    pub fn of_type(&self, expectation_type: ExpectationType) -> Vec<&Expectation> {
        self.expectations
            .iter()
            .filter(|e| e.expectation_type == expectation_type)
            .collect()
    }

    /// Expectations about the given column, in suite order.
    pub fn for_column(&self, column: &str) -> Vec<&Expectation> {
        self.expectations
            .iter()
            .filter(|e| e.column() == Some(column))
            .collect()
    }

    /// Distinct columns referenced by column expectations, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for column in self.expectations.iter().filter_map(Expectation::column) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Distinct expectation types, in first-seen order.
    pub fn expectation_types(&self) -> Vec<ExpectationType> {
        let mut types = Vec::new();
        for expectation in &self.expectations {
            if !types.contains(&expectation.expectation_type) {
                types.push(expectation.expectation_type);
            }
        }
        types
    }

    /// Serializes the suite to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the suite to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expectation_type_names() {
        for expectation_type in ExpectationType::ALL {
            assert_eq!(
                expectation_type.as_str().parse::<ExpectationType>(),
                Ok(expectation_type)
            );
            assert_eq!(
                serde_json::to_value(expectation_type).unwrap(),
                json!(expectation_type.as_str())
            );
        }
        assert!("expect_column_to_exist".parse::<ExpectationType>().is_err());
        assert!(ExpectationType::ExpectTableRowCountToBeBetween.is_table_expectation());
        assert!(!ExpectationType::ExpectColumnMinToBeBetween.is_table_expectation());
    }

    #[test]
    fn test_add_replaces_same_domain() {
        let mut suite = ExpectationSuite::default();
        suite.add(
            Expectation::for_column(ExpectationType::ExpectColumnMinToBeBetween, "a")
                .with_kwarg("min_value", 1),
        );
        suite.add(Expectation::for_column(
            ExpectationType::ExpectColumnMinToBeBetween,
            "b",
        ));
        suite.add(
            Expectation::for_column(ExpectationType::ExpectColumnMinToBeBetween, "a")
                .with_kwarg("min_value", 2),
        );

        assert_eq!(suite.len(), 2);
        assert_eq!(suite.expectations[0].column(), Some("a"));
        assert_eq!(suite.expectations[0].kwarg("min_value"), Some(&json!(2)));
    }

    #[test]
    fn test_compound_domains_are_distinct() {
        let mut suite = ExpectationSuite::default();
        suite.add(
            Expectation::new(ExpectationType::ExpectCompoundColumnsToBeUnique)
                .with_kwarg("column_list", json!(["a", "b"])),
        );
        suite.add(
            Expectation::new(ExpectationType::ExpectCompoundColumnsToBeUnique)
                .with_kwarg("column_list", json!(["a", "c"])),
        );
        assert_eq!(suite.len(), 2);
        assert!(suite.columns().is_empty());
    }

    #[test]
    fn test_suite_queries() {
        let mut suite = ExpectationSuite::new("people");
        suite.add(Expectation::for_column(
            ExpectationType::ExpectColumnValuesToNotBeNull,
            "name",
        ));
        suite.add(Expectation::for_column(
            ExpectationType::ExpectColumnValuesToNotBeNull,
            "age",
        ));
        suite.add(Expectation::for_column(
            ExpectationType::ExpectColumnMeanToBeBetween,
            "age",
        ));

        assert_eq!(suite.columns(), vec!["name", "age"]);
        assert_eq!(suite.for_column("age").len(), 2);
        assert_eq!(
            suite.of_type(ExpectationType::ExpectColumnValuesToNotBeNull).len(),
            2
        );
        assert_eq!(
            suite.expectation_types(),
            vec![
                ExpectationType::ExpectColumnValuesToNotBeNull,
                ExpectationType::ExpectColumnMeanToBeBetween
            ]
        );
    }

    #[test]
    fn test_json_shape() {
        let mut suite = ExpectationSuite::new("people");
        suite.add_column_meta("name");
        suite.add_column_meta("name");
        suite.add(
            Expectation::new(ExpectationType::ExpectTableRowCountToBeBetween)
                .with_kwarg("min_value", 3)
                .with_kwarg("max_value", 3),
        );

        let value: Value = serde_json::from_str(&suite.to_json().unwrap()).unwrap();
        assert_eq!(value["name"], json!("people"));
        assert_eq!(
            value["expectations"][0]["expectation_type"],
            json!("expect_table_row_count_to_be_between")
        );
        assert_eq!(value["expectations"][0]["kwargs"]["max_value"], json!(3));
        assert_eq!(value["meta"]["columns"], json!({"name": {"description": ""}}));

        let parsed: ExpectationSuite =
            serde_json::from_str(&suite.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, suite);
    }
}
