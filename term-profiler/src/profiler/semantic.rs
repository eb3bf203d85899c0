//! Applies user-declared semantic types to the metadata cache.

use std::ops::Deref;

use tracing::{debug, instrument, warn};

use super::cache::MetadataCache;
use crate::config::{ConfigError, ProfilerConfig};
use crate::dataset::Dataset;
use crate::error::Result;

/// A metadata cache whose semantic tags have been resolved.
///
/// Only [`apply_semantic_types`] produces one, so holding a `ResolvedCache`
/// proves every tag was checked against its column's type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCache {
    cache: MetadataCache,
    semantic_mode: bool,
}

impl ResolvedCache {
    /// Whether semantic types drive rule selection for this run.
    pub fn semantic_mode(&self) -> bool {
        self.semantic_mode
    }

    pub fn into_inner(self) -> MetadataCache {
        self.cache
    }
}

impl Deref for ResolvedCache {
    type Target = MetadataCache;

    fn deref(&self) -> &Self::Target {
        &self.cache
    }
}

/// Tags cached columns with the semantic types declared in `config`.
///
/// Declared columns that are absent from the dataset are skipped with a
/// warning; columns that exist but were ignored are skipped silently.
#[instrument(skip_all)]
pub fn apply_semantic_types(
    dataset: &dyn Dataset,
    config: &ProfilerConfig,
    mut cache: MetadataCache,
) -> Result<ResolvedCache> {
    if !config.has_semantic_types() {
        return Ok(ResolvedCache {
            cache,
            semantic_mode: false,
        });
    }

    for (semantic_type, columns) in &config.semantic_types {
        for name in columns {
            if !dataset.has_column(name) {
                warn!(
                    column = %name,
                    semantic_type = %semantic_type,
                    "Semantic type declared for a column that is not in the dataset"
                );
                continue;
            }

            let Some(column) = cache.column_mut(name) else {
                debug!(
                    column = %name,
                    semantic_type = %semantic_type,
                    "Skipping semantic type of ignored column"
                );
                continue;
            };

            if !semantic_type.accepts(column.data_type) {
                return Err(ConfigError::IncompatibleSemanticType {
                    column: name.clone(),
                    semantic_type: semantic_type.to_string(),
                    expected: semantic_type.expected_storage(),
                    found: column.data_type.to_string(),
                }
                .into());
            }

            if !column.semantic_types.contains(semantic_type) {
                column.semantic_types.push(*semantic_type);
            }
        }
    }

    Ok(ResolvedCache {
        cache,
        semantic_mode: true,
    })
}
