//! # Term Profiler - Expectation Suites from Observed Data
//!
//! Term Profiler inspects a dataset and proposes a suite of data quality
//! expectations describing it: which columns exist, how many rows there are,
//! how often values are null, which values occur in low-cardinality columns,
//! and where numeric and datetime values lie. It runs on Apache Arrow and
//! DataFusion, either over in-memory record batches or by pushing every
//! statistic down to a DataFusion table as SQL.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use term_profiler::prelude::*;
//! use term_profiler::test_fixtures::titanic_like_dataset;
//!
//! let dataset = titanic_like_dataset().unwrap();
//!
//! // No configuration: every column is profiled with the defaults
//! let suite = build_suite(&dataset, None).unwrap();
//! assert_eq!(suite.len(), 48);
//!
//! // A configuration narrows and tunes the suite
//! let config = ProfilerConfig::from_value(&json!({
//!     "ignored_columns": ["Survived", "Unnamed: 0"],
//!     "primary_or_compound_key": ["Name"],
//!     "value_set_threshold": "very_few",
//!     "excluded_expectations": ["expect_column_mean_to_be_between"],
//! }))
//! .unwrap();
//!
//! let suite = SuiteProfiler::new().build_suite(&dataset, &config).unwrap();
//! assert_eq!(suite.len(), 29);
//! assert!(suite.for_column("Survived").is_empty());
//! ```
//!
//! ## Configuration
//!
//! A configuration is a JSON object with a closed set of keys:
//!
//! | key | shape | effect |
//! |---|---|---|
//! | `primary_or_compound_key` | list of columns | uniqueness and not-null expectations |
//! | `ignored_columns` | list of columns | no column expectations |
//! | `value_set_threshold` | cardinality name | highest cardinality receiving a value set |
//! | `table_expectations_only` | boolean | skip every column expectation |
//! | `excluded_expectations` | list of expectation names | drop these expectations |
//! | `semantic_types` | object of lists | tag columns; tags then select the rules |
//!
//! Unknown keys and values of the wrong shape are rejected before any
//! statistic is computed.
//!
//! ## Semantic Types
//!
//! Declaring `semantic_types` switches rule selection from the inferred
//! storage type to the declared tags:
//!
//! ```rust
//! use term_profiler::prelude::*;
//! use term_profiler::test_fixtures::cardinality_dataset;
//!
//! let config = ProfilerConfig::builder()
//!     .semantic_type(SemanticType::Numeric, ["col_few", "col_many"])
//!     .semantic_type(SemanticType::ValueSet, ["col_two"])
//!     .build();
//!
//! let suite = SuiteProfiler::new()
//!     .build_suite(&cardinality_dataset().unwrap(), &config)
//!     .unwrap();
//!
//! let value_sets = suite.of_type(ExpectationType::ExpectColumnValuesToBeInSet);
//! assert_eq!(value_sets.len(), 1);
//! assert_eq!(value_sets[0].column(), Some("col_two"));
//! ```
//!
//! ## Architecture
//!
//! - **`config`**: configuration decoding and validation
//! - **`dataset`**: the `Dataset` trait with in-memory and SQL backends
//! - **`profiler`**: metadata cache, semantic type resolution and the rule engine
//! - **`expectations`**: expectation and suite types, JSON serialization
//! - **`sources`**: CSV, Parquet and table loaders
//! - **`logging`**: logging configuration and subscriber setup

pub mod config;
pub mod dataset;
pub mod error;
pub mod expectations;
pub mod logging;
pub mod prelude;
pub mod profiler;
pub mod sources;
pub mod test_fixtures;
