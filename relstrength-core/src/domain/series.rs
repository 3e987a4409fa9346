//! Series views and normalized series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A borrowed view of one table column on the table's date axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Series<'a> {
    pub name: &'a str,
    pub dates: &'a [NaiveDate],
    pub values: &'a [Option<f64>],
}

impl<'a> Series<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate (date, value) pairs.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + 'a {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// A series rescaled into `[0, 1]`.
///
/// Only the normalizer constructs these, so every present value is in range.
/// The date axis is not stored here; it is shared by every series of an
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    name: String,
    values: Vec<Option<f64>>,
}

impl NormalizedSeries {
    pub(crate) fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at the last row (the evaluation point), if present.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// The last `n` values (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[Option<f64>] {
        let start = self.values.len().saturating_sub(n);
        &self.values[start..]
    }
}
