//! Example profiling a CSV file into an expectation suite.
//!
//! Usage:
//!
//! ```text
//! cargo run --example profile_csv -- data.csv '{"ignored_columns": ["id"]}'
//! ```
//!
//! Without arguments the bundled Titanic-shaped fixture is profiled instead.

use term_profiler::logging::setup::{init_logging, LoggingConfig};
use term_profiler::prelude::*;
use term_profiler::sources::{load_csv, CsvOptions};
use term_profiler::test_fixtures::titanic_like_dataset;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let mut args = std::env::args().skip(1);
    let dataset = match args.next() {
        Some(path) => load_csv(&path, &CsvOptions::default()).await?,
        None => titanic_like_dataset()?,
    };

    // A missing config argument means "profile with defaults"
    let config = match args.next() {
        Some(raw) => ProfilerConfig::from_json_str(&raw)?,
        None => ProfilerConfig::default(),
    };

    let profiler = SuiteProfiler::builder()
        .suite_name("profiled")
        .log_config(LogConfig::verbose())
        .build();
    let suite = profiler.build_suite(&dataset, &config)?;

    println!("{}", suite.to_json_pretty()?);
    eprintln!(
        "{} expectations across {} columns",
        suite.len(),
        suite.columns().len()
    );

    Ok(())
}
