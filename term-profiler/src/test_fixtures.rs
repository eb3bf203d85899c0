//! Deterministic datasets for tests, benchmarks and documentation examples.
//!
//! - [`cardinality_dataset`]: 1000 rows with one integer column per
//!   cardinality bucket
//! - [`titanic_like_dataset`]: 1313 passenger rows shaped like the classic
//!   Titanic table, with a mix of types, nulls and cardinalities

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, NullArray, StringArray};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;

use crate::dataset::MemoryDataset;
use crate::error::Result;

/// Rows in [`cardinality_dataset`].
pub const CARDINALITY_ROWS: i64 = 1000;

/// Rows in [`titanic_like_dataset`].
pub const TITANIC_ROWS: i64 = 1313;

/// Table name used by [`titanic_like_context`].
pub const TITANIC_TABLE: &str = "titanic";

/// Eight columns over 1000 rows, each landing in a different cardinality
/// bucket under the default policy.
///
/// `col_none` is all null with no declared type; every other column holds
/// `i % modulus` for row `i`.
pub fn cardinality_dataset() -> Result<MemoryDataset> {
    let modulus = |m: i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(
            (0..CARDINALITY_ROWS).map(|i| i % m),
        ))
    };

    let columns: Vec<(&str, ArrayRef)> = vec![
        (
            "col_none",
            Arc::new(NullArray::new(CARDINALITY_ROWS as usize)) as ArrayRef,
        ),
        ("col_one", modulus(1)),
        ("col_two", modulus(2)),
        ("col_very_few", modulus(10)),
        ("col_few", modulus(50)),
        ("col_many", modulus(100)),
        ("col_very_many", modulus(500)),
        ("col_unique", modulus(CARDINALITY_ROWS)),
    ];

    MemoryDataset::from_columns(columns)
}

/// A 1313-row passenger table.
///
/// | column | type | shape |
/// |---|---|---|
/// | `Unnamed: 0` | int | row number, unique |
/// | `Name` | string | 1310 distinct names, very many |
/// | `PClass` | string | `1st`/`2nd`/`3rd` plus one `*`, very few |
/// | `Age` | float | 43% null, 71 distinct values, many |
/// | `Sex` | string | two values |
/// | `SexCode` | int | two values |
/// | `Survived` | int | two values |
pub fn titanic_like_dataset() -> Result<MemoryDataset> {
    Ok(MemoryDataset::from_batch(titanic_like_batch()?))
}

/// [`titanic_like_dataset`] registered as [`TITANIC_TABLE`] in a fresh
/// DataFusion context.
pub fn titanic_like_context() -> Result<SessionContext> {
    let ctx = SessionContext::new();
    ctx.register_batch(TITANIC_TABLE, titanic_like_batch()?)?;
    Ok(ctx)
}

fn titanic_like_batch() -> Result<RecordBatch> {
    let rows = 0..TITANIC_ROWS;

    let index = Int64Array::from_iter_values(rows.clone().map(|i| i + 1));
    let name = StringArray::from_iter_values(rows.clone().map(|i| {
        // The last three passengers share names with the first three
        let id = if i < 1310 { i } else { i - 1310 };
        format!("Passenger {id}")
    }));
    let pclass = StringArray::from_iter_values(rows.clone().map(|i| match i {
        456 => "*",
        i if i % 3 == 0 => "1st",
        i if i % 3 == 1 => "2nd",
        _ => "3rd",
    }));
    let age = Float64Array::from_iter(
        rows.clone()
            .map(|i| (i % 7 >= 3).then(|| (i % 71) as f64 + 0.5)),
    );
    let sex = StringArray::from_iter_values(
        rows.clone()
            .map(|i| if i % 3 == 0 { "female" } else { "male" }),
    );
    let sex_code = Int64Array::from_iter_values(rows.clone().map(|i| i64::from(i % 3 == 0)));
    let survived = Int64Array::from_iter_values(rows.map(|i| i % 2));

    Ok(RecordBatch::try_from_iter(vec![
        ("Unnamed: 0", Arc::new(index) as ArrayRef),
        ("Name", Arc::new(name) as ArrayRef),
        ("PClass", Arc::new(pclass) as ArrayRef),
        ("Age", Arc::new(age) as ArrayRef),
        ("Sex", Arc::new(sex) as ArrayRef),
        ("SexCode", Arc::new(sex_code) as ArrayRef),
        ("Survived", Arc::new(survived) as ArrayRef),
    ])?)
}
