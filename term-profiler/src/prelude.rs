//! Prelude for commonly used types and traits in term-profiler.

pub use crate::config::{validate_config, ConfigError, ProfilerConfig};
pub use crate::dataset::{Dataset, MemoryDataset, SqlDataset};
pub use crate::error::{ProfilerError, Result};
pub use crate::expectations::{Expectation, ExpectationSuite, ExpectationType};
pub use crate::logging::LogConfig;
pub use crate::profiler::{
    build_suite, Cardinality, CardinalityPolicy, ProfilerDataType, SemanticType, SuiteProfiler,
};
