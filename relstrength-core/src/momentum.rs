//! Momentum: slope of an ordinary least-squares line over the trailing window.
//!
//! b = (k·Σxy − Σx·Σy) / (k·Σx² − (Σx)²)
//!
//! x is the position inside the window (0 for the oldest sample), y the
//! normalized value. Absent samples are skipped but keep their neighbours'
//! positions, so a gap widens the x spacing instead of compressing time.
//! Fewer than two usable points is [`InsufficientData`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::NormalizedSeries;

/// Default regression window (trading days).
pub const DEFAULT_WINDOW: usize = 20;

/// Not enough usable points in the window to fit a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("insufficient data: {valid_points} usable point(s) in window, need at least 2")]
pub struct InsufficientData {
    pub valid_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumEstimator {
    window: usize,
}

impl MomentumEstimator {
    /// A line needs at least two points, so `window` must be >= 2.
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window < 2 {
            return Err(ConfigError::Invalid(format!(
                "momentum window must be >= 2, got {window}"
            )));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Momentum of a normalized series at its last row.
    pub fn estimate(&self, series: &NormalizedSeries) -> Result<f64, InsufficientData> {
        self.estimate_values(series.values())
    }

    /// Momentum over the last `min(window, n)` raw values.
    pub fn estimate_values(&self, values: &[Option<f64>]) -> Result<f64, InsufficientData> {
        let start = values.len().saturating_sub(self.window);
        let points: Vec<(f64, f64)> = values[start..]
            .iter()
            .enumerate()
            .filter_map(|(x, y)| y.filter(|v| v.is_finite()).map(|y| (x as f64, y)))
            .collect();

        if points.len() < 2 {
            return Err(InsufficientData {
                valid_points: points.len(),
            });
        }

        ols_slope(&points).ok_or(InsufficientData {
            valid_points: points.len(),
        })
    }
}

impl Default for MomentumEstimator {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

/// Least-squares slope through `(x, y)` points. `None` when the x values
/// are all equal (zero denominator).
pub fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    let k = points.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }

    let denom = k * sxx - sx * sx;
    if denom == 0.0 {
        return None;
    }
    Some((k * sxy - sx * sy) / denom)
}
