//! Fatal evaluation errors.
//!
//! Per-series shortfalls are not errors here: a regression window with too few
//! points yields [`crate::InsufficientData`] and the series is labelled
//! undetermined while the rest of the evaluation proceeds.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::TableError;

/// How the factor and equity date axes disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentMismatch {
    #[error("factor table has {factor_rows} rows, equity table has {equity_rows}")]
    RowCount {
        factor_rows: usize,
        equity_rows: usize,
    },

    #[error("row {row}: factor date {factor} != equity date {equity}")]
    Date {
        row: usize,
        factor: NaiveDate,
        equity: NaiveDate,
    },
}

/// Errors that abort a whole evaluation. No partial result is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("data alignment error: {0}")]
    DataAlignment(#[from] AlignmentMismatch),

    #[error("missing column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}
