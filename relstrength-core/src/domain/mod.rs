//! Domain types: date-indexed tables and the series derived from them.

pub mod series;
pub mod table;

pub use series::{NormalizedSeries, Series};
pub use table::{Column, Table, TableError, TableSummary};

/// Build a table from a start date and named columns, one row per day.
///
/// Test helper shared by the unit tests in this crate.
#[cfg(test)]
pub fn make_table(name: &str, columns: &[(&str, Vec<Option<f64>>)]) -> Table {
    let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates = (0..rows)
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect();
    let mut table = Table::new(name, dates);
    for (col, values) in columns {
        table.push_column(*col, values.clone()).unwrap();
    }
    table
}

/// Wrap plain values as present cells.
#[cfg(test)]
pub fn some(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}
