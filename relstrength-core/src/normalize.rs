//! Min-max normalization.
//!
//! norm[t] = (v[t] - min) / (max - min)
//!
//! min and max are taken over the present, finite values of the series itself.
//! A flat series (max == min) divides by 1, so every present value maps to 0.
//! Results are clamped to `[0, 1]`.
//! A series with no present values normalizes to all-absent.

use crate::domain::{NormalizedSeries, Series};

/// Normalize one series into `[0, 1]`.
pub fn normalize(series: &Series<'_>) -> NormalizedSeries {
    NormalizedSeries::new(series.name, normalize_values(series.values))
}

/// Normalize raw cells. Output has the same length as the input.
pub fn normalize_values(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let Some((min, max)) = min_max(values) else {
        return vec![None; values.len()];
    };

    // A range wider than f64::MAX is computed on halved operands.
    let scale = if (max - min).is_finite() { 1.0 } else { 0.5 };
    let (min, max) = (min * scale, max * scale);
    let range = max - min;
    let range = if range == 0.0 { 1.0 } else { range };

    values
        .iter()
        .map(|v| present(*v).map(|v| ((v * scale - min) / range).clamp(0.0, 1.0)))
        .collect()
}

/// Minimum and maximum over present, finite values.
pub fn min_max(values: &[Option<f64>]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter_map(|v| present(*v))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// NaN and infinities count as absent.
fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}
