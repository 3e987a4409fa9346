//! Quantile ranks of momentum scores.
//!
//! rank[i] = position of score i in ascending order / (count − 1)
//!
//! The sort is stable, so equal scores keep their enumeration order and the
//! earlier series gets the lower rank. A single score ranks 0.

use std::cmp::Ordering;

/// Rank each score within the set. Output is in input order.
pub fn quantile_ranks(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
    });

    let denom = scores.len().saturating_sub(1).max(1) as f64;
    let mut ranks = vec![0.0; scores.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position as f64 / denom;
    }
    ranks
}
