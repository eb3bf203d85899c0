//! Profiler configuration and its validation.
//!
//! A configuration arrives as a JSON-shaped mapping with a closed set of keys.
//! [`ProfilerConfig::from_value`] is the single decode step: it rejects unknown
//! keys and values of the wrong shape, and produces a typed [`ProfilerConfig`]
//! that the rest of the pipeline can trust.
//!
//! ```rust
//! use serde_json::json;
//! use term_profiler::config::ProfilerConfig;
//!
//! let config = ProfilerConfig::from_value(&json!({
//!     "ignored_columns": ["Survived"],
//!     "value_set_threshold": "very_few",
//! }))
//! .unwrap();
//! assert_eq!(config.ignored_columns, vec!["Survived".to_string()]);
//!
//! let err = ProfilerConfig::from_value(&json!({"bad_keyword": 100})).unwrap_err();
//! assert_eq!(err.to_string(), "Parameter bad_keyword from config is not recognized.");
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::profiler::types::{Cardinality, SemanticType};

const PRIMARY_OR_COMPOUND_KEY: &str = "primary_or_compound_key";
const IGNORED_COLUMNS: &str = "ignored_columns";
const VALUE_SET_THRESHOLD: &str = "value_set_threshold";
const TABLE_EXPECTATIONS_ONLY: &str = "table_expectations_only";
const EXCLUDED_EXPECTATIONS: &str = "excluded_expectations";
const SEMANTIC_TYPES: &str = "semantic_types";

/// Every key a profiler configuration may contain.
pub const RECOGNIZED_PARAMETERS: [&str; 6] = [
    PRIMARY_OR_COMPOUND_KEY,
    IGNORED_COLUMNS,
    VALUE_SET_THRESHOLD,
    TABLE_EXPECTATIONS_ONLY,
    EXCLUDED_EXPECTATIONS,
    SEMANTIC_TYPES,
];

/// Errors raised while validating a profiler configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Parameter {0} from config is not recognized.")]
    UnrecognizedParameter(String),

    #[error("Config parameter {parameter} must be formatted as {expected} rather than {found}.")]
    InvalidParameterType {
        parameter: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Config must be formatted as an object rather than {found}.")]
    NotAnObject { found: &'static str },

    #[error(
        "Config parameter {parameter} must only contain column or expectation names, \
         but entry {index} is {found}."
    )]
    InvalidListEntry {
        parameter: String,
        index: usize,
        found: &'static str,
    },

    #[error("Config parameter value_set_threshold must be one of {allowed}, but is '{found}'.")]
    UnknownCardinality { found: String, allowed: String },

    #[error(
        "Entries in semantic type dict must be lists of column names e.g. \
         {{\"semantic_types\": {{\"numeric\": [\"number_of_transactions\"]}}}}"
    )]
    MalformedSemanticTypes { semantic_type: String },

    #[error("{found} is not a recognized semantic type. Please only include one of {allowed}.")]
    UnknownSemanticType { found: String, allowed: String },

    #[error("Column {column} must be {expected} to be tagged {semantic_type}, but appears to be {found}.")]
    IncompatibleSemanticType {
        column: String,
        semantic_type: String,
        expected: &'static str,
        found: String,
    },

    #[error("Column {column} from primary_or_compound_key is not present in the dataset.")]
    UnknownKeyColumn { column: String },

    #[error("Column {column} is tagged datetime, but value '{value}' cannot be parsed as a date or timestamp.")]
    UnparsableDatetime { column: String, value: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Validated profiler configuration.
///
/// Every field has the default the profiler applies when the corresponding key
/// is absent from the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilerConfig {
    /// Columns forming a uniqueness key; always profiled
    pub primary_or_compound_key: Vec<String>,
    /// Columns excluded from all column-level profiling
    pub ignored_columns: Vec<String>,
    /// Highest cardinality that still receives a value-set expectation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set_threshold: Option<Cardinality>,
    /// Skip every column-level expectation
    pub table_expectations_only: bool,
    /// Expectation names dropped before emission
    pub excluded_expectations: Vec<String>,
    /// Semantic type tags by column
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub semantic_types: BTreeMap<SemanticType, Vec<String>>,
}

impl ProfilerConfig {
    /// Creates a builder for assembling a configuration in code.
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// Validates a raw configuration mapping and decodes it.
    ///
    /// `null` is accepted and yields the default configuration.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::NotAnObject {
                    found: json_shape(other),
                })
            }
        };

        // Unknown keys are reported before any shape problem
        if let Some(key) = map
            .keys()
            .find(|key| !RECOGNIZED_PARAMETERS.contains(&key.as_str()))
        {
            return Err(ConfigError::UnrecognizedParameter(key.clone()));
        }

        let mut config = Self::default();
        for (key, value) in map {
            match key.as_str() {
                PRIMARY_OR_COMPOUND_KEY => config.primary_or_compound_key = string_list(key, value)?,
                IGNORED_COLUMNS => config.ignored_columns = string_list(key, value)?,
                EXCLUDED_EXPECTATIONS => config.excluded_expectations = string_list(key, value)?,
                TABLE_EXPECTATIONS_ONLY => {
                    config.table_expectations_only = match value {
                        Value::Bool(flag) => *flag,
                        other => return Err(invalid_type(key, "a boolean", other)),
                    }
                }
                VALUE_SET_THRESHOLD => {
                    config.value_set_threshold = match value {
                        Value::Null => None,
                        Value::String(name) => Some(name.parse().map_err(|found| {
                            ConfigError::UnknownCardinality {
                                found,
                                allowed: Cardinality::names(),
                            }
                        })?),
                        other => return Err(invalid_type(key, "a string", other)),
                    }
                }
                SEMANTIC_TYPES => config.semantic_types = semantic_types(value)?,
                other => return Err(ConfigError::UnrecognizedParameter(other.to_string())),
            }
        }

        Ok(config)
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Returns `true` when at least one semantic type is declared.
    pub fn has_semantic_types(&self) -> bool {
        !self.semantic_types.is_empty()
    }

    /// Encodes this configuration back into its raw mapping form.
    pub fn to_value(&self) -> Value {
        // Plain data with string keys always serializes
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Validates a raw configuration mapping.
///
/// Equivalent to [`ProfilerConfig::from_value`].
pub fn validate_config(value: &Value) -> Result<ProfilerConfig, ConfigError> {
    ProfilerConfig::from_value(value)
}

/// Builder for [`ProfilerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProfilerConfigBuilder {
    config: ProfilerConfig,
}

impl ProfilerConfigBuilder {
    /// Sets the columns forming the primary or compound key.
    pub fn primary_or_compound_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.primary_or_compound_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the columns excluded from profiling.
    pub fn ignored_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the value-set cardinality threshold.
    pub fn value_set_threshold(mut self, threshold: Cardinality) -> Self {
        self.config.value_set_threshold = Some(threshold);
        self
    }

    /// Restricts the suite to table-level expectations.
    pub fn table_expectations_only(mut self, enabled: bool) -> Self {
        self.config.table_expectations_only = enabled;
        self
    }

    /// Sets the expectation names to drop.
    pub fn excluded_expectations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_expectations = names.into_iter().map(Into::into).collect();
        self
    }

    /// Tags columns with a semantic type. Repeated calls accumulate.
    pub fn semantic_type<I, S>(mut self, semantic_type: SemanticType, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .semantic_types
            .entry(semantic_type)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Finishes the builder.
    ///
    /// Values set through the builder are typed, so no validation is run.
    pub fn build(self) -> ProfilerConfig {
        self.config
    }
}

/// Describes the JSON shape of a value for error messages.
pub(crate) fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn invalid_type(parameter: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::InvalidParameterType {
        parameter: parameter.to_string(),
        expected,
        found: json_shape(found),
    }
}

fn string_list(parameter: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
    let Value::Array(items) = value else {
        return Err(invalid_type(parameter, "a list", value));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::InvalidListEntry {
                parameter: parameter.to_string(),
                index,
                found: json_shape(other),
            }),
        })
        .collect()
}

fn semantic_types(value: &Value) -> Result<BTreeMap<SemanticType, Vec<String>>, ConfigError> {
    let map: &Map<String, Value> = match value {
        Value::Object(map) => map,
        other => return Err(invalid_type(SEMANTIC_TYPES, "an object", other)),
    };

    let mut declared: BTreeMap<SemanticType, Vec<String>> = BTreeMap::new();
    for (name, columns) in map {
        let columns = match columns {
            Value::Array(items) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect::<Vec<_>>(),
            _ => {
                return Err(ConfigError::MalformedSemanticTypes {
                    semantic_type: name.clone(),
                })
            }
        };

        let semantic_type: SemanticType =
            name.parse().map_err(|found| ConfigError::UnknownSemanticType {
                found,
                allowed: SemanticType::names(),
            })?;
        declared.entry(semantic_type).or_default().extend(columns);
    }

    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_config_yields_defaults() {
        let config = ProfilerConfig::from_value(&Value::Null).unwrap();
        assert!(config.primary_or_compound_key.is_empty());
        assert!(config.ignored_columns.is_empty());
        assert!(config.value_set_threshold.is_none());
        assert!(!config.table_expectations_only);
        assert!(config.excluded_expectations.is_empty());
        assert!(!config.has_semantic_types());

        assert_eq!(ProfilerConfig::from_value(&json!({})).unwrap(), config);
    }

    #[test]
    fn test_full_config() {
        let config = ProfilerConfig::from_value(&json!({
            "primary_or_compound_key": ["col_unique"],
            "ignored_columns": ["col_one"],
            "value_set_threshold": "unique",
            "table_expectations_only": false,
            "excluded_expectations": ["expect_column_values_to_not_be_null"],
        }))
        .unwrap();

        assert_eq!(config.primary_or_compound_key, vec!["col_unique"]);
        assert_eq!(config.ignored_columns, vec!["col_one"]);
        assert_eq!(config.value_set_threshold, Some(Cardinality::Unique));
        assert!(!config.table_expectations_only);
        assert_eq!(
            config.excluded_expectations,
            vec!["expect_column_values_to_not_be_null"]
        );
    }

    #[test]
    fn test_unrecognized_parameter() {
        let err = ProfilerConfig::from_value(&json!({"bad_keyword": 100})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter bad_keyword from config is not recognized."
        );
    }

    #[test]
    fn test_wrong_shapes_name_expected_and_found() {
        let err = ProfilerConfig::from_value(&json!({"ignored_columns": "col_name"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config parameter ignored_columns must be formatted as a list rather than a string."
        );

        let err =
            ProfilerConfig::from_value(&json!({"table_expectations_only": "True"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config parameter table_expectations_only must be formatted as a boolean rather than a string."
        );

        let err = ProfilerConfig::from_value(&json!({"value_set_threshold": 3})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidParameterType {
                parameter: "value_set_threshold".to_string(),
                expected: "a string",
                found: "a number",
            }
        );

        let err = ProfilerConfig::from_value(&json!({"semantic_types": ["numeric"]})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config parameter semantic_types must be formatted as an object rather than a list."
        );
    }

    #[test]
    fn test_list_entries_must_be_strings() {
        let err =
            ProfilerConfig::from_value(&json!({"primary_or_compound_key": ["id", 7]})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidListEntry {
                parameter: "primary_or_compound_key".to_string(),
                index: 1,
                found: "a number",
            }
        );
    }

    #[test]
    fn test_unknown_cardinality_name() {
        let err = ProfilerConfig::from_value(&json!({"value_set_threshold": "lots"})).unwrap_err();
        assert!(err.to_string().contains("'lots'"));
        assert!(err.to_string().contains("very_few"));
    }

    #[test]
    fn test_config_must_be_an_object() {
        let err = ProfilerConfig::from_value(&json!(["ignored_columns"])).unwrap_err();
        assert_eq!(err, ConfigError::NotAnObject { found: "a list" });
    }

    #[test]
    fn test_malformed_semantic_types_entry() {
        let err = ProfilerConfig::from_value(&json!({"semantic_types": {"value_set": "few"}}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Entries in semantic type dict must be lists of column names e.g. \
             {\"semantic_types\": {\"numeric\": [\"number_of_transactions\"]}}"
        );

        let err = ProfilerConfig::from_value(&json!({"semantic_types": {"numeric": [1, 2]}}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSemanticTypes { .. }));
    }

    #[test]
    fn test_unknown_semantic_type() {
        let err = ProfilerConfig::from_value(&json!({"semantic_types": {"currency": ["amount"]}}))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownSemanticType {
                found: "currency".to_string(),
                allowed: SemanticType::names(),
            }
        );
    }

    #[test]
    fn test_semantic_types_decoded() {
        let config = ProfilerConfig::from_value(&json!({
            "semantic_types": {
                "numeric": ["col_few", "col_many"],
                "value_set": ["col_two"],
            }
        }))
        .unwrap();
        assert!(config.has_semantic_types());
        assert_eq!(
            config.semantic_types.get(&SemanticType::Numeric),
            Some(&vec!["col_few".to_string(), "col_many".to_string()])
        );
        assert_eq!(
            config.semantic_types.get(&SemanticType::ValueSet),
            Some(&vec!["col_two".to_string()])
        );
    }

    #[test]
    fn test_from_json_str() {
        let config = ProfilerConfig::from_json_str(r#"{"table_expectations_only": true}"#).unwrap();
        assert!(config.table_expectations_only);

        let err = ProfilerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builder_matches_decoded_config() {
        let built = ProfilerConfig::builder()
            .primary_or_compound_key(["Name"])
            .ignored_columns(["Survived", "Unnamed: 0"])
            .value_set_threshold(Cardinality::VeryFew)
            .excluded_expectations(["expect_column_mean_to_be_between"])
            .build();

        let decoded = validate_config(&json!({
            "ignored_columns": ["Survived", "Unnamed: 0"],
            "excluded_expectations": ["expect_column_mean_to_be_between"],
            "primary_or_compound_key": ["Name"],
            "table_expectations_only": false,
            "value_set_threshold": "very_few",
        }))
        .unwrap();

        assert_eq!(built, decoded);
        assert_eq!(ProfilerConfig::from_value(&built.to_value()).unwrap(), built);
    }

    #[test]
    fn test_builder_accumulates_semantic_types() {
        let config = ProfilerConfig::builder()
            .semantic_type(SemanticType::Numeric, ["a"])
            .semantic_type(SemanticType::Numeric, ["b"])
            .build();
        assert_eq!(
            config.semantic_types[&SemanticType::Numeric],
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
