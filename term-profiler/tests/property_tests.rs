//! Property-based tests for classification, validation and suite building.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use term_profiler::config::RECOGNIZED_PARAMETERS;
use term_profiler::prelude::*;
use term_profiler::test_fixtures::cardinality_dataset;

const CARDINALITY_COLUMNS: [&str; 8] = [
    "col_none",
    "col_one",
    "col_two",
    "col_very_few",
    "col_few",
    "col_many",
    "col_very_many",
    "col_unique",
];

fn single_column(values: &[Option<i64>]) -> MemoryDataset {
    MemoryDataset::from_columns(vec![(
        "value",
        Arc::new(Int64Array::from(values.to_vec())) as ArrayRef,
    )])
    .unwrap()
}

// ============================================================================
// Cardinality classification
// ============================================================================

proptest! {
    /// More distinct values never move a column into a lower bucket.
    #[test]
    fn test_classification_is_monotonic(
        rows in 1u64..5000,
        null_share in 0.0f64..1.0,
        a in 0u64..5000,
        b in 0u64..5000,
    ) {
        let policy = CardinalityPolicy::default();
        let nulls = (rows as f64 * null_share) as u64;
        let non_null = rows - nulls;
        let (low, high) = (a.min(b).min(non_null), a.max(b).min(non_null));

        prop_assert!(
            policy.classify(rows, nulls, low) <= policy.classify(rows, nulls, high)
        );
    }

    /// `unique` means every row holds a distinct non-null value.
    #[test]
    fn test_unique_bucket(rows in 1u64..5000, nulls in 0u64..10, distinct in 1u64..5000) {
        let policy = CardinalityPolicy::default();
        let nulls = nulls.min(rows);
        let distinct = distinct.min(rows - nulls);
        prop_assume!(distinct > 0);

        let is_unique = policy.classify(rows, nulls, distinct) == Cardinality::Unique;
        prop_assert_eq!(is_unique, nulls == 0 && distinct == rows);
    }
}

// ============================================================================
// Configuration validation
// ============================================================================

proptest! {
    /// Any key outside the recognized set is rejected by name.
    #[test]
    fn test_unknown_keys_are_named(key in "[a-z_]{1,24}") {
        prop_assume!(!RECOGNIZED_PARAMETERS.contains(&key.as_str()));

        let mut map = Map::new();
        map.insert(key.clone(), json!(true));
        let err = ProfilerConfig::from_value(&Value::Object(map)).unwrap_err();

        prop_assert_eq!(
            err.to_string(),
            format!("Parameter {key} from config is not recognized.")
        );
    }

    /// List parameters reject every non-list value.
    #[test]
    fn test_list_parameters_reject_scalars(
        parameter in prop::sample::select(vec![
            "primary_or_compound_key",
            "ignored_columns",
            "excluded_expectations",
        ]),
        value in prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ],
    ) {
        let mut map = Map::new();
        map.insert(parameter.to_string(), value);
        let err = ProfilerConfig::from_value(&Value::Object(map)).unwrap_err();
        let is_type_error = matches!(err, ConfigError::InvalidParameterType { .. });
        prop_assert!(is_type_error);
    }
}

// ============================================================================
// Statistics and suites
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Counts agree with a direct computation over the values.
    #[test]
    fn test_counts_match_values(values in prop::collection::vec(prop::option::of(0i64..20), 1..200)) {
        let dataset = single_column(&values);

        let nulls = values.iter().filter(|v| v.is_none()).count() as u64;
        let distinct: HashSet<i64> = values.iter().flatten().copied().collect();

        prop_assert_eq!(dataset.null_count("value").unwrap(), nulls);
        prop_assert_eq!(dataset.distinct_count("value").unwrap(), distinct.len() as u64);
    }

    /// Every nullity expectation carries a `mostly` in (0, 1], or none at all.
    #[test]
    fn test_nullity_mostly_bounds(values in prop::collection::vec(prop::option::of(0i64..5), 1..200)) {
        let suite = build_suite(&single_column(&values), None).unwrap();

        let nullity: Vec<&Expectation> = suite
            .expectations
            .iter()
            .filter(|e| matches!(
                e.expectation_type,
                ExpectationType::ExpectColumnValuesToNotBeNull
                    | ExpectationType::ExpectColumnValuesToBeNull
            ))
            .collect();
        prop_assert_eq!(nullity.len(), 1);

        if let Some(mostly) = nullity[0].kwarg("mostly").and_then(Value::as_f64) {
            prop_assert!(mostly >= 0.001 && mostly <= 1.0);
        }
    }

    /// Ignored columns never receive column expectations.
    #[test]
    fn test_ignored_columns_never_profiled(
        ignored in prop::sample::subsequence(CARDINALITY_COLUMNS.to_vec(), 0..=8)
    ) {
        let config = ProfilerConfig::builder().ignored_columns(ignored.clone()).build();
        let suite = SuiteProfiler::new()
            .build_suite(&cardinality_dataset().unwrap(), &config)
            .unwrap();

        for column in &ignored {
            prop_assert!(suite.for_column(column).is_empty());
        }
        for column in CARDINALITY_COLUMNS.iter().filter(|c| !ignored.contains(c)) {
            prop_assert!(!suite.for_column(column).is_empty());
        }
    }
}
