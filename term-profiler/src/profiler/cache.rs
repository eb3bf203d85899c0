//! The metadata cache: one classified entry per profiled column.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::types::{Cardinality, CardinalityPolicy, ProfilerDataType, SemanticType};
use crate::config::{ConfigError, ProfilerConfig};
use crate::dataset::Dataset;
use crate::error::Result;

/// What the profiler knows about one retained column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub cardinality: Cardinality,
    pub data_type: ProfilerDataType,
    /// Semantic tags, filled in by the resolver
    pub semantic_types: Vec<SemanticType>,
    pub row_count: u64,
    pub null_count: u64,
    /// Distinct non-null values
    pub distinct_count: u64,
}

impl ColumnMetadata {
    pub fn non_null_count(&self) -> u64 {
        self.row_count.saturating_sub(self.null_count)
    }

    /// Fraction of rows that are null; zero for an empty table.
    pub fn null_fraction(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.row_count as f64
        }
    }

    /// Distinct values over non-null values, if any value is present.
    pub fn unique_proportion(&self) -> Option<f64> {
        match self.non_null_count() {
            0 => None,
            non_null => Some(self.distinct_count as f64 / non_null as f64),
        }
    }

    pub fn has_semantic_type(&self, semantic_type: SemanticType) -> bool {
        self.semantic_types.contains(&semantic_type)
    }
}

/// Scalar options plus per-column metadata for one profiling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataCache {
    pub primary_or_compound_key: Vec<String>,
    /// Ignored columns actually removed from profiling
    pub ignored_columns: Vec<String>,
    pub value_set_threshold: Option<Cardinality>,
    pub table_expectations_only: bool,
    pub excluded_expectations: Vec<String>,
    pub row_count: u64,
    /// Retained columns in dataset order
    pub columns: Vec<ColumnMetadata>,
}

impl MetadataCache {
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_or_compound_key.iter().any(|c| c == name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_expectations.iter().any(|e| e == name)
    }
}

/// Classifies every retained column of `dataset`.
///
/// Key columns are checked against the dataset before any statistic is
/// computed, and are always retained even when also listed as ignored.
#[instrument(skip(dataset, config, policy))]
pub fn build_cache(
    dataset: &dyn Dataset,
    config: &ProfilerConfig,
    policy: &CardinalityPolicy,
) -> Result<MetadataCache> {
    let all_columns = dataset.columns();

    if let Some(missing) = config
        .primary_or_compound_key
        .iter()
        .find(|key| !all_columns.contains(key))
    {
        return Err(ConfigError::UnknownKeyColumn {
            column: missing.clone(),
        }
        .into());
    }

    let mut ignored = Vec::new();
    for column in &config.ignored_columns {
        if config.primary_or_compound_key.contains(column) {
            warn!(column = %column, "Key column listed as ignored; it will still be profiled");
        } else if !all_columns.contains(column) {
            warn!(column = %column, "Ignored column is not present in the dataset");
        } else if !ignored.contains(column) {
            ignored.push(column.clone());
        }
    }

    let row_count = dataset.row_count()?;
    let mut columns = Vec::new();

    for name in all_columns.iter().filter(|c| !ignored.contains(c)) {
        let null_count = dataset.null_count(name)?;
        let distinct_count = dataset.distinct_count(name)?;
        let cardinality = policy.classify(row_count, null_count, distinct_count);
        let data_type = ProfilerDataType::from_arrow(&dataset.data_type(name)?);

        debug!(
            column = %name,
            cardinality = %cardinality,
            data_type = %data_type,
            null_count,
            distinct_count,
            "Classified column"
        );

        columns.push(ColumnMetadata {
            name: name.clone(),
            cardinality,
            data_type,
            semantic_types: Vec::new(),
            row_count,
            null_count,
            distinct_count,
        });
    }

    info!(
        row_count,
        profiled = columns.len(),
        ignored = ignored.len(),
        "Built metadata cache"
    );

    Ok(MetadataCache {
        primary_or_compound_key: config.primary_or_compound_key.clone(),
        ignored_columns: ignored,
        value_set_threshold: config.value_set_threshold,
        table_expectations_only: config.table_expectations_only,
        excluded_expectations: config.excluded_expectations.clone(),
        row_count,
        columns,
    })
}
