//! CSV loading.

use std::path::Path;
use std::sync::Arc;

use datafusion::arrow::datatypes::Schema;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use tracing::instrument;

use super::{collect, ensure_exists};
use crate::dataset::MemoryDataset;
use crate::error::Result;

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Escape character (default: None)
    pub escape: Option<u8>,
    /// Comment prefix (lines starting with this are ignored)
    pub comment: Option<u8>,
    /// Schema to use (if None, will be inferred)
    pub schema: Option<Arc<Schema>>,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            schema: None,
            schema_infer_max_records: 1000,
        }
    }
}

impl CsvOptions {
    /// Tab separated values with a header row.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// Reads a CSV file into memory.
///
/// # Examples
///
/// ```rust,no_run
/// use term_profiler::profiler::build_suite;
/// use term_profiler::sources::{load_csv, CsvOptions};
///
/// # async fn example() -> term_profiler::error::Result<()> {
/// let dataset = load_csv("data/titanic.csv", &CsvOptions::default()).await?;
/// let suite = build_suite(&dataset, None)?;
/// println!("{}", suite.to_json_pretty()?);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(options), fields(
    csv.delimiter = %(options.delimiter as char),
    csv.has_header = options.has_header
))]
pub async fn load_csv(path: &str, options: &CsvOptions) -> Result<MemoryDataset> {
    ensure_exists(path).await?;

    // DataFusion filters files by extension, even for a single file
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let mut csv_options = CsvReadOptions::new()
        .has_header(options.has_header)
        .delimiter(options.delimiter)
        .quote(options.quote)
        .file_extension(&extension)
        .schema_infer_max_records(options.schema_infer_max_records);

    if let Some(escape) = options.escape {
        csv_options = csv_options.escape(escape);
    }
    if let Some(comment) = options.comment {
        csv_options = csv_options.comment(comment);
    }
    if let Some(schema) = &options.schema {
        csv_options = csv_options.schema(schema);
    }

    let ctx = SessionContext::new();
    let df = ctx.read_csv(path, csv_options).await?;
    collect(df, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CsvOptions::default();
        assert!(options.has_header);
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.quote, b'"');
        assert!(options.schema.is_none());
        assert_eq!(CsvOptions::tsv().delimiter, b'\t');
    }
}
