//! Builds expectation suites from a dataset and a profiler configuration.
//!
//! A run moves through four stages, each consuming the output of the previous
//! one:
//!
//! 1. the raw configuration is validated into a [`ProfilerConfig`]
//! 2. [`build_cache`] classifies every retained column into a [`MetadataCache`]
//! 3. [`apply_semantic_types`] tags columns and yields a [`ResolvedCache`]
//! 4. the [`RuleEngine`] turns the resolved cache into an [`ExpectationSuite`]
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use term_profiler::profiler::build_suite;
//! use term_profiler::test_fixtures::titanic_like_dataset;
//!
//! let dataset = titanic_like_dataset().unwrap();
//! let suite = build_suite(
//!     &dataset,
//!     Some(&json!({
//!         "ignored_columns": ["Survived", "Unnamed: 0"],
//!         "primary_or_compound_key": ["Name"],
//!         "value_set_threshold": "very_few",
//!         "excluded_expectations": ["expect_column_mean_to_be_between"],
//!     })),
//! )
//! .unwrap();
//!
//! assert_eq!(suite.len(), 29);
//! ```

use serde_json::Value;
use tracing::{info, instrument};

pub mod cache;
pub mod rules;
pub mod semantic;
pub mod types;

pub use cache::{build_cache, ColumnMetadata, MetadataCache};
pub use rules::{
    DatetimeRule, ExpectationRule, NullityRule, NumericRule, ProportionUniqueRule, RuleContext,
    RuleEngine, TypeListRule, ValueSetRule, DEFAULT_QUANTILES, DEFAULT_VALUE_SET_THRESHOLD,
};
pub use semantic::{apply_semantic_types, ResolvedCache};
pub use types::{Cardinality, CardinalityPolicy, ProfilerDataType, SemanticType};

use crate::config::ProfilerConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::expectations::ExpectationSuite;
use crate::logging::LogConfig;
use crate::perf_debug;

/// Default name of a built suite.
pub const DEFAULT_SUITE_NAME: &str = "default";

/// Profiles datasets into expectation suites.
///
/// Holds the tuning knobs that are not part of the configuration mapping.
/// A profiler is stateless between runs and can be reused.
///
/// # Examples
///
/// ```rust
/// use term_profiler::config::ProfilerConfig;
/// use term_profiler::profiler::{CardinalityPolicy, SuiteProfiler};
/// use term_profiler::test_fixtures::cardinality_dataset;
///
/// let profiler = SuiteProfiler::builder()
///     .suite_name("cardinality")
///     .cardinality_policy(CardinalityPolicy {
///         very_few_limit: 5,
///         ..CardinalityPolicy::default()
///     })
///     .build();
///
/// let suite = profiler
///     .build_suite(&cardinality_dataset().unwrap(), &ProfilerConfig::default())
///     .unwrap();
/// assert_eq!(suite.name, "cardinality");
/// ```
pub struct SuiteProfiler {
    policy: CardinalityPolicy,
    suite_name: String,
    engine: RuleEngine,
    log_config: LogConfig,
}

impl SuiteProfiler {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SuiteProfilerBuilder {
        SuiteProfilerBuilder::default()
    }

    pub fn cardinality_policy(&self) -> &CardinalityPolicy {
        &self.policy
    }

    /// Validates a raw configuration mapping and builds a suite with it.
    pub fn build_suite_from_value(
        &self,
        dataset: &dyn Dataset,
        config: Option<&Value>,
    ) -> Result<ExpectationSuite> {
        let config = match config {
            Some(value) => ProfilerConfig::from_value(value)?,
            None => ProfilerConfig::default(),
        };
        self.build_suite(dataset, &config)
    }

    /// Builds a suite for `dataset` under `config`.
    #[instrument(skip_all, fields(suite = %self.suite_name))]
    pub fn build_suite(
        &self,
        dataset: &dyn Dataset,
        config: &ProfilerConfig,
    ) -> Result<ExpectationSuite> {
        perf_debug!(self.log_config, config = ?config, "Profiling dataset");

        let cache = build_cache(dataset, config, &self.policy)?;
        let resolved = apply_semantic_types(dataset, config, cache)?;
        let suite = self.engine.build(dataset, &resolved, &self.suite_name)?;

        info!(
            expectations = suite.len(),
            columns = resolved.columns.len(),
            "Profiled dataset"
        );
        Ok(suite)
    }

    /// Builds only the resolved metadata cache, without any expectations.
    pub fn resolve(&self, dataset: &dyn Dataset, config: &ProfilerConfig) -> Result<ResolvedCache> {
        let cache = build_cache(dataset, config, &self.policy)?;
        apply_semantic_types(dataset, config, cache)
    }
}

impl Default for SuiteProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`SuiteProfiler`].
pub struct SuiteProfilerBuilder {
    policy: CardinalityPolicy,
    suite_name: String,
    quantiles: Vec<f64>,
    log_config: LogConfig,
    extra_rules: Vec<Box<dyn ExpectationRule>>,
}

impl Default for SuiteProfilerBuilder {
    fn default() -> Self {
        Self {
            policy: CardinalityPolicy::default(),
            suite_name: DEFAULT_SUITE_NAME.to_string(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            log_config: LogConfig::default(),
            extra_rules: Vec::new(),
        }
    }
}

impl SuiteProfilerBuilder {
    /// Sets the limits used to bucket columns by cardinality.
    pub fn cardinality_policy(mut self, policy: CardinalityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Sets the quantiles reported for numeric columns.
    pub fn quantiles(mut self, quantiles: Vec<f64>) -> Self {
        self.quantiles = quantiles;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Adds a column rule evaluated after the standard ones.
    pub fn add_rule(mut self, rule: Box<dyn ExpectationRule>) -> Self {
        self.extra_rules.push(rule);
        self
    }

    pub fn build(self) -> SuiteProfiler {
        let engine = self.extra_rules.into_iter().fold(
            RuleEngine::default()
                .quantiles(self.quantiles)
                .log_config(self.log_config.clone()),
            RuleEngine::add_rule,
        );

        SuiteProfiler {
            policy: self.policy,
            suite_name: self.suite_name,
            engine,
            log_config: self.log_config,
        }
    }
}

/// Builds a suite with the default profiler settings.
///
/// `config` is the raw configuration mapping; `None` uses every default.
pub fn build_suite(dataset: &dyn Dataset, config: Option<&Value>) -> Result<ExpectationSuite> {
    SuiteProfiler::new().build_suite_from_value(dataset, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectations::{Expectation, ExpectationType};
    use crate::test_fixtures::cardinality_dataset;
    use serde_json::json;

    struct ExistsRule;

    impl ExpectationRule for ExistsRule {
        fn applies_to(&self, _column: &ColumnMetadata, _cache: &ResolvedCache) -> bool {
            true
        }

        fn apply(
            &self,
            column: &ColumnMetadata,
            _ctx: &RuleContext<'_>,
        ) -> Result<Vec<Expectation>> {
            // Re-emitting an existing domain replaces the earlier expectation
            Ok(vec![Expectation::for_column(
                ExpectationType::ExpectColumnValuesToBeInTypeList,
                &column.name,
            )
            .with_kwarg("type_list", json!(["Any"]))])
        }

        fn name(&self) -> &str {
            "exists"
        }

        fn description(&self) -> &str {
            "Accepts any storage type"
        }
    }

    #[test]
    fn test_custom_rule_runs_last() {
        let profiler = SuiteProfiler::builder().add_rule(Box::new(ExistsRule)).build();
        let suite = profiler
            .build_suite(&cardinality_dataset().unwrap(), &ProfilerConfig::default())
            .unwrap();

        let type_lists = suite.of_type(ExpectationType::ExpectColumnValuesToBeInTypeList);
        assert_eq!(type_lists.len(), 8);
        assert!(type_lists
            .iter()
            .all(|e| e.kwarg("type_list") == Some(&json!(["Any"]))));
    }

    #[test]
    fn test_custom_quantiles() {
        let profiler = SuiteProfiler::builder().quantiles(vec![0.5]).build();
        let suite = profiler
            .build_suite(&cardinality_dataset().unwrap(), &ProfilerConfig::default())
            .unwrap();
        let quantiles = suite.of_type(ExpectationType::ExpectColumnQuantileValuesToBeBetween);
        assert!(!quantiles.is_empty());
        assert_eq!(
            quantiles[0].kwarg("quantile_ranges").unwrap()["quantiles"],
            json!([0.5])
        );
    }

    #[test]
    fn test_invalid_raw_config_fails_before_profiling() {
        let err = build_suite(
            &cardinality_dataset().unwrap(),
            Some(&json!({"semantic_types": {"value_set": "col_two"}})),
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_policy_changes_buckets() {
        let profiler = SuiteProfiler::builder()
            .cardinality_policy(CardinalityPolicy {
                very_few_limit: 5,
                few_limit: 8,
                very_many_ratio: 0.1,
            })
            .build();
        let cache = profiler
            .resolve(&cardinality_dataset().unwrap(), &ProfilerConfig::default())
            .unwrap();
        assert_eq!(
            cache.column("col_very_few").unwrap().cardinality,
            Cardinality::Many
        );
        assert_eq!(profiler.cardinality_policy().few_limit, 8);
    }
}
