//! Date-indexed numeric table.
//!
//! A `Table` owns one date axis and any number of named numeric columns of the
//! same length. The date/key column of the source file becomes the axis and is
//! never stored as a numeric column, so it can never be normalized by mistake.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::series::Series;

/// Structural errors when assembling a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("column '{column}' has {actual} values but the date axis has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// One named numeric column. `None` marks an absent or non-numeric cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A date axis plus named numeric columns in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl Table {
    /// Create a table with a date axis and no columns.
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            dates,
            columns: Vec::new(),
        }
    }

    /// Append a column. Its length must match the date axis.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        if self.column(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Builder form of [`Table::push_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, TableError> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Borrow a column together with the shared date axis.
    pub fn series(&self, name: &str) -> Option<Series<'_>> {
        self.column(name).map(|c| Series {
            name: &c.name,
            dates: &self.dates,
            values: &c.values,
        })
    }

    /// Rows, columns and date range, for logs and the CLI.
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            name: self.name.clone(),
            rows: self.len(),
            columns: self.column_names().map(String::from).collect(),
            first_date: self.dates.first().copied(),
            last_date: self.dates.last().copied(),
        }
    }
}

/// Shape of a table at a glance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows == 0 {
            return write!(f, "{}: 0 rows", self.name);
        }
        let range = match (self.first_date, self.last_date) {
            (Some(a), Some(b)) => format!("{a} → {b}"),
            _ => "n/a".into(),
        };
        write!(
            f,
            "{}: {} rows, {} cols, range: {}, cols: {}",
            self.name,
            self.rows,
            self.columns.len(),
            range,
            self.columns.join(", ")
        )
    }
}
