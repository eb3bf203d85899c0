//! Configuration failures surfaced through the suite builder.

use serde_json::json;
use term_profiler::prelude::*;
use term_profiler::test_fixtures::{cardinality_dataset, titanic_like_dataset};

fn config_error(config: serde_json::Value) -> ProfilerError {
    build_suite(&cardinality_dataset().unwrap(), Some(&config)).unwrap_err()
}

#[test]
fn test_unrecognized_parameter() {
    let err = config_error(json!({"bad_keyword": 100}));
    assert!(err.is_config_error());
    assert_eq!(
        err.to_string(),
        "Parameter bad_keyword from config is not recognized."
    );
}

#[test]
fn test_unrecognized_parameter_reported_before_shape_errors() {
    let err = config_error(json!({"ignored_columns": 3, "zz_unknown": true}));
    assert_eq!(
        err.as_config_error(),
        Some(&ConfigError::UnrecognizedParameter("zz_unknown".to_string()))
    );
}

#[test]
fn test_parameter_shapes() {
    assert_eq!(
        config_error(json!({"ignored_columns": "col_name"})).to_string(),
        "Config parameter ignored_columns must be formatted as a list rather than a string."
    );
    assert_eq!(
        config_error(json!({"table_expectations_only": "True"})).to_string(),
        "Config parameter table_expectations_only must be formatted as a boolean rather than a string."
    );
    assert_eq!(
        config_error(json!({"excluded_expectations": {"a": 1}})).to_string(),
        "Config parameter excluded_expectations must be formatted as a list rather than an object."
    );
}

#[test]
fn test_malformed_semantic_types() {
    let err = config_error(json!({"semantic_types": {"value_set": "few"}}));
    assert_eq!(
        err.to_string(),
        "Entries in semantic type dict must be lists of column names e.g. \
         {\"semantic_types\": {\"numeric\": [\"number_of_transactions\"]}}"
    );
}

#[test]
fn test_unknown_semantic_type() {
    let err = config_error(json!({"semantic_types": {"money": ["col_few"]}}));
    assert!(matches!(
        err.as_config_error(),
        Some(ConfigError::UnknownSemanticType { found, .. }) if found == "money"
    ));
}

#[test]
fn test_incompatible_semantic_type() {
    let err = build_suite(
        &titanic_like_dataset().unwrap(),
        Some(&json!({"semantic_types": {"numeric": ["PClass"]}})),
    )
    .unwrap_err();
    assert!(matches!(
        err.as_config_error(),
        Some(ConfigError::IncompatibleSemanticType { column, .. }) if column == "PClass"
    ));
}

#[test]
fn test_unknown_key_column() {
    let err = config_error(json!({"primary_or_compound_key": ["id"]}));
    assert_eq!(
        err.to_string(),
        "Column id from primary_or_compound_key is not present in the dataset."
    );
}

#[test]
fn test_semantic_type_for_missing_column_is_skipped() {
    let suite = build_suite(
        &cardinality_dataset().unwrap(),
        Some(&json!({"semantic_types": {"value_set": ["col_two", "col_missing"]}})),
    )
    .unwrap();
    assert_eq!(
        suite
            .of_type(ExpectationType::ExpectColumnValuesToBeInSet)
            .len(),
        1
    );
}

#[test]
fn test_null_config_uses_defaults() {
    let dataset = titanic_like_dataset().unwrap();
    let from_null = build_suite(&dataset, Some(&serde_json::Value::Null)).unwrap();
    let from_none = build_suite(&dataset, None).unwrap();
    assert_eq!(from_null, from_none);
}

#[test]
fn test_json_text_config() {
    let config = ProfilerConfig::from_json_str(
        r#"{"ignored_columns": ["Survived", "Unnamed: 0"], "value_set_threshold": "two"}"#,
    )
    .unwrap();
    assert_eq!(config.value_set_threshold, Some(Cardinality::Two));

    let err = ProfilerConfig::from_json_str(r#"{"ignored_columns": ["a"],"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(ProfilerError::from(err).is_config_error());
}
