//! Rules that turn resolved column metadata into expectations.
//!
//! Table and key expectations are fixed; column expectations come from a set
//! of [`ExpectationRule`]s evaluated per column by the [`RuleEngine`]. Each
//! rule decides whether it applies to a column and, if so, queries the dataset
//! for the statistics its expectations need.
//!
//! ## Rule selection
//!
//! Without semantic types, the type-specific rules follow the inferred type
//! and cardinality of each column. Once any semantic type is declared, the
//! tags alone select them. The nullity, proportion-unique and type-list rules
//! apply to every column in both modes.

use datafusion::scalar::ScalarValue;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::cache::ColumnMetadata;
use super::semantic::ResolvedCache;
use super::types::{Cardinality, ProfilerDataType, SemanticType};
use crate::config::ConfigError;
use crate::dataset::{
    float_to_json, parse_datetime_strings, scalar_str, scalar_to_json, Dataset,
};
use crate::error::Result;
use crate::expectations::{Expectation, ExpectationSuite, ExpectationType};
use crate::logging::{truncate_field, LogConfig};
use crate::{log_rule, log_stats};

/// Quantiles reported by the quantile expectation.
pub const DEFAULT_QUANTILES: [f64; 5] = [0.05, 0.25, 0.5, 0.75, 0.95];

/// Value-set threshold applied when the configuration leaves it unset.
pub const DEFAULT_VALUE_SET_THRESHOLD: Cardinality = Cardinality::Many;

/// Smallest `mostly` ever emitted.
const MIN_MOSTLY: f64 = 0.001;

/// Everything a rule may consult while building expectations for a column.
pub struct RuleContext<'a> {
    pub dataset: &'a dyn Dataset,
    pub cache: &'a ResolvedCache,
    pub quantiles: &'a [f64],
    pub log_config: &'a LogConfig,
}

impl RuleContext<'_> {
    /// Returns `false` for excluded expectation types.
    ///
    /// Rules call this before querying the dataset so that excluded
    /// expectations never cost a query.
    pub fn allows(&self, expectation_type: ExpectationType, column: &str) -> bool {
        if self.cache.is_excluded(expectation_type.as_str()) {
            log_rule!(
                self.log_config,
                column = %column,
                expectation = %expectation_type,
                "Expectation excluded by configuration"
            );
            false
        } else {
            true
        }
    }
}

/// A rule producing column expectations.
pub trait ExpectationRule: Send + Sync {
    /// Whether this rule should run for the column.
    fn applies_to(&self, column: &ColumnMetadata, cache: &ResolvedCache) -> bool;

    /// Builds the expectations for the column.
    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>>;

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

/// Min, max, mean, median and quantiles of numeric columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericRule;

impl ExpectationRule for NumericRule {
    fn applies_to(&self, column: &ColumnMetadata, cache: &ResolvedCache) -> bool {
        if cache.semantic_mode() {
            column.has_semantic_type(SemanticType::Numeric)
        } else {
            column.data_type.is_numeric()
        }
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let mut expectations = Vec::new();

        let extremes = [
            (ExpectationType::ExpectColumnMinToBeBetween, true),
            (ExpectationType::ExpectColumnMaxToBeBetween, false),
        ];
        for (expectation_type, is_min) in extremes {
            if !ctx.allows(expectation_type, name) {
                continue;
            }
            let value = if is_min {
                ctx.dataset.min(name)?
            } else {
                ctx.dataset.max(name)?
            };
            match value.map(|v| scalar_to_json(&v)).filter(|v| !v.is_null()) {
                Some(value) => expectations.push(between(expectation_type, name, value)),
                None => debug!(column = %name, expectation = %expectation_type, "Statistic undefined, skipping"),
            }
        }

        let averages = [
            (ExpectationType::ExpectColumnMeanToBeBetween, true),
            (ExpectationType::ExpectColumnMedianToBeBetween, false),
        ];
        for (expectation_type, is_mean) in averages {
            if !ctx.allows(expectation_type, name) {
                continue;
            }
            let value = if is_mean {
                ctx.dataset.mean(name)?
            } else {
                ctx.dataset.median(name)?
            };
            match value.filter(|v| v.is_finite()) {
                Some(value) => {
                    expectations.push(between(expectation_type, name, float_to_json(value)))
                }
                None => debug!(column = %name, expectation = %expectation_type, "Statistic undefined, skipping"),
            }
        }

        let quantile_type = ExpectationType::ExpectColumnQuantileValuesToBeBetween;
        if ctx.allows(quantile_type, name) {
            match ctx.dataset.quantiles(name, ctx.quantiles)? {
                Some(values) if values.iter().all(|v| v.is_finite()) => {
                    let value_ranges: Vec<Value> =
                        values.iter().map(|v| json!([v, v])).collect();
                    expectations.push(Expectation::for_column(quantile_type, name).with_kwarg(
                        "quantile_ranges",
                        json!({
                            "quantiles": ctx.quantiles,
                            "value_ranges": value_ranges,
                        }),
                    ));
                }
                _ => debug!(column = %name, expectation = %quantile_type, "Statistic undefined, skipping"),
            }
        }

        Ok(expectations)
    }

    fn name(&self) -> &str {
        "numeric"
    }

    fn description(&self) -> &str {
        "Bounds the observed range, center and quantiles of numeric columns"
    }
}

/// The set of observed values for low-cardinality columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSetRule;

impl ExpectationRule for ValueSetRule {
    fn applies_to(&self, column: &ColumnMetadata, cache: &ResolvedCache) -> bool {
        if cache.semantic_mode() {
            column.has_semantic_type(SemanticType::ValueSet)
                || column.has_semantic_type(SemanticType::Boolean)
        } else {
            let threshold = cache
                .value_set_threshold
                .unwrap_or(DEFAULT_VALUE_SET_THRESHOLD);
            !matches!(column.cardinality, Cardinality::None | Cardinality::Unique)
                && column.cardinality <= threshold
        }
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let expectation_type = ExpectationType::ExpectColumnValuesToBeInSet;
        if !ctx.allows(expectation_type, name) {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = ctx
            .dataset
            .distinct_values(name)?
            .iter()
            .map(scalar_to_json)
            .collect();

        let observed = Value::Array(values.clone()).to_string();
        log_stats!(
            ctx.log_config,
            column = %name,
            value_set = %truncate_field(&observed, ctx.log_config.max_field_length),
            "Observed value set"
        );

        Ok(vec![
            Expectation::for_column(expectation_type, name).with_kwarg("value_set", values)
        ])
    }

    fn name(&self) -> &str {
        "value_set"
    }

    fn description(&self) -> &str {
        "Restricts low-cardinality columns to their observed values"
    }
}

/// Observed bounds of datetime columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatetimeRule;

impl ExpectationRule for DatetimeRule {
    fn applies_to(&self, column: &ColumnMetadata, cache: &ResolvedCache) -> bool {
        if cache.semantic_mode() {
            column.has_semantic_type(SemanticType::Datetime)
        } else {
            column.data_type == ProfilerDataType::Datetime
        }
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let expectation_type = ExpectationType::ExpectColumnValuesToBeBetween;
        if !ctx.allows(expectation_type, name) {
            return Ok(Vec::new());
        }

        let parse_strings = column.data_type == ProfilerDataType::String;
        let bounds = if parse_strings {
            string_datetime_bounds(name, &ctx.dataset.distinct_values(name)?)?
        } else {
            match (ctx.dataset.min(name)?, ctx.dataset.max(name)?) {
                (Some(min), Some(max)) => Some((scalar_to_json(&min), scalar_to_json(&max))),
                _ => None,
            }
        };
        let Some((min, max)) = bounds else {
            debug!(column = %name, "Datetime column has no values, skipping bounds");
            return Ok(Vec::new());
        };

        let mut expectation = Expectation::for_column(expectation_type, name)
            .with_kwarg("min_value", min)
            .with_kwarg("max_value", max);
        if parse_strings {
            expectation = expectation.with_kwarg("parse_strings_as_datetimes", true);
        }

        Ok(vec![expectation])
    }

    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Bounds datetime columns by their earliest and latest values"
    }
}

/// Earliest and latest of the distinct values of a string column tagged
/// datetime, compared as parsed datetimes and reported as written.
///
/// Any value that does not parse is a configuration error.
fn string_datetime_bounds(
    column: &str,
    values: &[ScalarValue],
) -> Result<Option<(Value, Value)>> {
    let strings: Vec<&str> = values.iter().filter_map(scalar_str).collect();
    let parsed = parse_datetime_strings(&strings)?;

    let mut bounds: Option<((i64, &str), (i64, &str))> = None;
    for (text, millis) in strings.iter().copied().zip(parsed) {
        let Some(millis) = millis else {
            return Err(ConfigError::UnparsableDatetime {
                column: column.to_string(),
                value: text.to_string(),
            }
            .into());
        };
        bounds = Some(match bounds {
            None => ((millis, text), (millis, text)),
            Some((earliest, latest)) => {
                let earliest = if millis < earliest.0 {
                    (millis, text)
                } else {
                    earliest
                };
                let latest = if millis > latest.0 {
                    (millis, text)
                } else {
                    latest
                };
                (earliest, latest)
            }
        });
    }

    Ok(bounds.map(|((_, earliest), (_, latest))| {
        (Value::from(earliest), Value::from(latest))
    }))
}

/// Null or not-null expectations from the observed null rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullityRule;

impl ExpectationRule for NullityRule {
    fn applies_to(&self, _column: &ColumnMetadata, _cache: &ResolvedCache) -> bool {
        true
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let not_null = ExpectationType::ExpectColumnValuesToNotBeNull;
        let null = ExpectationType::ExpectColumnValuesToBeNull;

        let null_fraction = column.null_fraction();
        let null_percent = null_fraction * 100.0;

        let expectation = if ctx.cache.is_key_column(name) || null_fraction == 0.0 {
            ctx.allows(not_null, name)
                .then(|| Expectation::for_column(not_null, name))
        } else if null_fraction >= 0.5 {
            let mostly = (null_percent.floor() / 100.0).max(MIN_MOSTLY);
            ctx.allows(null, name)
                .then(|| Expectation::for_column(null, name).with_kwarg("mostly", mostly))
        } else {
            let mostly = ((100.0 - null_percent) / 100.0).max(MIN_MOSTLY);
            ctx.allows(not_null, name)
                .then(|| Expectation::for_column(not_null, name).with_kwarg("mostly", mostly))
        };

        Ok(expectation.into_iter().collect())
    }

    fn name(&self) -> &str {
        "nullity"
    }

    fn description(&self) -> &str {
        "Pins the observed share of null values"
    }
}

/// Ratio of distinct to non-null values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionUniqueRule;

impl ExpectationRule for ProportionUniqueRule {
    fn applies_to(&self, column: &ColumnMetadata, _cache: &ResolvedCache) -> bool {
        column.non_null_count() > 0
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let expectation_type = ExpectationType::ExpectColumnProportionOfUniqueValuesToBeBetween;
        if !ctx.allows(expectation_type, name) {
            return Ok(Vec::new());
        }

        Ok(column
            .unique_proportion()
            .map(|ratio| between(expectation_type, name, float_to_json(ratio)))
            .into_iter()
            .collect())
    }

    fn name(&self) -> &str {
        "proportion_unique"
    }

    fn description(&self) -> &str {
        "Pins the observed ratio of distinct values"
    }
}

/// Accepted storage types for the inferred type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeListRule;

impl ExpectationRule for TypeListRule {
    fn applies_to(&self, column: &ColumnMetadata, _cache: &ResolvedCache) -> bool {
        column.data_type != ProfilerDataType::Unknown
    }

    fn apply(&self, column: &ColumnMetadata, ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
        let name = column.name.as_str();
        let expectation_type = ExpectationType::ExpectColumnValuesToBeInTypeList;
        if !ctx.allows(expectation_type, name) {
            return Ok(Vec::new());
        }

        Ok(vec![Expectation::for_column(expectation_type, name)
            .with_kwarg("type_list", column.data_type.type_list())])
    }

    fn name(&self) -> &str {
        "type_list"
    }

    fn description(&self) -> &str {
        "Restricts the column to storage types of its inferred type"
    }
}

/// Evaluates rules against a resolved cache and assembles the suite.
pub struct RuleEngine {
    rules: Vec<Box<dyn ExpectationRule>>,
    quantiles: Vec<f64>,
    log_config: LogConfig,
}

impl RuleEngine {
    /// Creates an engine with no column rules.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            log_config: LogConfig::default(),
        }
    }

    /// Adds a column rule. Rules run in insertion order for each column.
    pub fn add_rule(mut self, rule: Box<dyn ExpectationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn quantiles(mut self, quantiles: Vec<f64>) -> Self {
        self.quantiles = quantiles;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Builds the suite: table expectations, then key expectations, then
    /// column expectations in dataset order.
    #[instrument(skip_all, fields(suite = %suite_name, columns = cache.columns.len()))]
    pub fn build(
        &self,
        dataset: &dyn Dataset,
        cache: &ResolvedCache,
        suite_name: &str,
    ) -> Result<ExpectationSuite> {
        for name in &cache.excluded_expectations {
            if name.parse::<ExpectationType>().is_err() {
                warn!(expectation = %name, "Excluded expectation is not a known expectation type");
            }
        }

        let ctx = RuleContext {
            dataset,
            cache,
            quantiles: &self.quantiles,
            log_config: &self.log_config,
        };
        let mut suite = ExpectationSuite::new(suite_name);

        for expectation in table_expectations(&ctx)? {
            add_unless_excluded(&mut suite, &ctx, expectation);
        }

        if cache.table_expectations_only {
            info!(expectations = suite.len(), "Built table-only expectation suite");
            return Ok(suite);
        }

        for expectation in key_expectations(&ctx) {
            add_unless_excluded(&mut suite, &ctx, expectation);
        }

        for column in &cache.columns {
            suite.add_column_meta(&column.name);
            for rule in &self.rules {
                if !rule.applies_to(column, cache) {
                    continue;
                }
                log_rule!(self.log_config, column = %column.name, rule = rule.name(), "Applying rule");
                for expectation in rule.apply(column, &ctx)? {
                    add_unless_excluded(&mut suite, &ctx, expectation);
                }
            }
        }

        info!(
            expectations = suite.len(),
            semantic_mode = cache.semantic_mode(),
            "Built expectation suite"
        );
        Ok(suite)
    }
}

impl Default for RuleEngine {
    /// The standard rule set: type-specific rules, then the rules for all
    /// column types.
    fn default() -> Self {
        Self::new()
            .add_rule(Box::new(NumericRule))
            .add_rule(Box::new(ValueSetRule))
            .add_rule(Box::new(DatetimeRule))
            .add_rule(Box::new(NullityRule))
            .add_rule(Box::new(ProportionUniqueRule))
            .add_rule(Box::new(TypeListRule))
    }
}

fn table_expectations(ctx: &RuleContext<'_>) -> Result<Vec<Expectation>> {
    let mut expectations = Vec::new();

    let ordered = ExpectationType::ExpectTableColumnsToMatchOrderedList;
    if ctx.allows(ordered, "") {
        expectations
            .push(Expectation::new(ordered).with_kwarg("column_list", ctx.dataset.columns()));
    }

    let row_count = ExpectationType::ExpectTableRowCountToBeBetween;
    if ctx.allows(row_count, "") {
        let rows = ctx.cache.row_count;
        expectations.push(
            Expectation::new(row_count)
                .with_kwarg("min_value", rows)
                .with_kwarg("max_value", rows),
        );
    }

    Ok(expectations)
}

fn key_expectations(ctx: &RuleContext<'_>) -> Vec<Expectation> {
    let key = &ctx.cache.primary_or_compound_key;
    match key.as_slice() {
        [] => Vec::new(),
        [column] => {
            let expectation_type = ExpectationType::ExpectColumnValuesToBeUnique;
            ctx.allows(expectation_type, column)
                .then(|| Expectation::for_column(expectation_type, column))
                .into_iter()
                .collect()
        }
        columns => {
            let expectation_type = ExpectationType::ExpectCompoundColumnsToBeUnique;
            ctx.allows(expectation_type, "")
                .then(|| Expectation::new(expectation_type).with_kwarg("column_list", columns))
                .into_iter()
                .collect()
        }
    }
}

fn add_unless_excluded(suite: &mut ExpectationSuite, ctx: &RuleContext<'_>, expectation: Expectation) {
    let column = expectation.column().unwrap_or_default().to_string();
    if ctx.allows(expectation.expectation_type, &column) {
        suite.add(expectation);
    }
}

/// An expectation pinning a statistic to its observed value.
fn between(expectation_type: ExpectationType, column: &str, observed: Value) -> Expectation {
    Expectation::for_column(expectation_type, column)
        .with_kwarg("min_value", observed.clone())
        .with_kwarg("max_value", observed)
}
