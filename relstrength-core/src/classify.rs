//! Strength classification.
//!
//! A tracked series is strong at the evaluation point iff
//!
//! - its normalized level minus the benchmark's normalized level is strictly
//!   above the level threshold (default 0), and
//! - its momentum quantile rank is strictly above the rank threshold
//!   (default 0.5).
//!
//! Series whose momentum, latest level, or benchmark level is missing are
//! `Undetermined`, never silently `NotStrong`. Ranks are taken over the series
//! that do have a momentum score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::momentum::InsufficientData;
use crate::rank::quantile_ranks;

/// Strict cut-offs for the strength rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Relative level must be strictly greater than this.
    pub level: f64,
    /// Quantile rank must be strictly greater than this.
    pub rank: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            level: 0.0,
            rank: 0.5,
        }
    }
}

/// Why a label could not be decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndeterminedReason {
    /// The regression window had fewer than two usable points.
    InsufficientData { valid_points: usize },
    /// The series has no value at the evaluation point.
    MissingLatestValue,
    /// The benchmark has no value at the evaluation point.
    MissingBenchmarkValue,
    /// The level or momentum could not be computed as a finite number.
    NonFiniteValue,
}

impl fmt::Display for UndeterminedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndeterminedReason::InsufficientData { valid_points } => {
                write!(f, "insufficient data ({valid_points} usable points)")
            }
            UndeterminedReason::MissingLatestValue => write!(f, "no value at latest date"),
            UndeterminedReason::MissingBenchmarkValue => {
                write!(f, "benchmark has no value at latest date")
            }
            UndeterminedReason::NonFiniteValue => write!(f, "non-finite level or momentum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum StrengthLabel {
    Strong,
    NotStrong,
    Undetermined { reason: UndeterminedReason },
}

impl StrengthLabel {
    pub fn is_strong(&self) -> bool {
        matches!(self, StrengthLabel::Strong)
    }

    /// `Some(bool)` when decided, `None` when undetermined.
    pub fn decided(&self) -> Option<bool> {
        match self {
            StrengthLabel::Strong => Some(true),
            StrengthLabel::NotStrong => Some(false),
            StrengthLabel::Undetermined { .. } => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLabel::Strong => "strong",
            StrengthLabel::NotStrong => "not_strong",
            StrengthLabel::Undetermined { .. } => "undetermined",
        }
    }
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier input for one tracked series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub name: &'a str,
    /// Normalized level at the evaluation point.
    pub latest: Option<f64>,
    pub momentum: Result<f64, InsufficientData>,
}

/// Classification outcome for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub name: String,
    pub momentum: Option<f64>,
    pub rank: Option<f64>,
    pub relative_level: Option<f64>,
    pub label: StrengthLabel,
}

/// Verdicts in enumeration order plus the strong names in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthReport {
    pub verdicts: Vec<Verdict>,
    pub strong: Vec<String>,
}

impl StrengthReport {
    pub fn verdict(&self, name: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.name == name)
    }

    pub fn label(&self, name: &str) -> Option<StrengthLabel> {
        self.verdict(name).map(|v| v.label)
    }

    /// Name → label lookup.
    pub fn labels(&self) -> BTreeMap<&str, StrengthLabel> {
        self.verdicts
            .iter()
            .map(|v| (v.name.as_str(), v.label))
            .collect()
    }

    pub fn undetermined(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts
            .iter()
            .filter(|v| matches!(v.label, StrengthLabel::Undetermined { .. }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrengthClassifier {
    thresholds: Thresholds,
}

impl StrengthClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Label every candidate at one evaluation point.
    pub fn classify(
        &self,
        candidates: &[Candidate<'_>],
        benchmark_latest: Option<f64>,
    ) -> StrengthReport {
        // Rank only the candidates with a score, in enumeration order.
        let scored: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.momentum.ok().map(|m| (i, m)))
            .collect();
        let scores: Vec<f64> = scored.iter().map(|&(_, m)| m).collect();
        let mut ranks: Vec<Option<f64>> = vec![None; candidates.len()];
        for (&(i, _), rank) in scored.iter().zip(quantile_ranks(&scores)) {
            ranks[i] = Some(rank);
        }

        let verdicts: Vec<Verdict> = candidates
            .iter()
            .zip(ranks)
            .map(|(c, rank)| {
                let relative_level = match (c.latest, benchmark_latest) {
                    (Some(level), Some(bench)) => Some(level - bench),
                    _ => None,
                };
                let label = self.label(c, rank, relative_level, benchmark_latest);
                Verdict {
                    name: c.name.to_string(),
                    momentum: c.momentum.ok(),
                    rank,
                    relative_level,
                    label,
                }
            })
            .collect();

        let strong = verdicts
            .iter()
            .filter(|v| v.label.is_strong())
            .map(|v| v.name.clone())
            .collect();

        StrengthReport { verdicts, strong }
    }

    fn label(
        &self,
        candidate: &Candidate<'_>,
        rank: Option<f64>,
        relative_level: Option<f64>,
        benchmark_latest: Option<f64>,
    ) -> StrengthLabel {
        if let Err(e) = candidate.momentum {
            return StrengthLabel::Undetermined {
                reason: UndeterminedReason::InsufficientData {
                    valid_points: e.valid_points,
                },
            };
        }
        if candidate.latest.is_none() {
            return StrengthLabel::Undetermined {
                reason: UndeterminedReason::MissingLatestValue,
            };
        }
        if benchmark_latest.is_none() {
            return StrengthLabel::Undetermined {
                reason: UndeterminedReason::MissingBenchmarkValue,
            };
        }

        let finite = |v: Option<f64>| v.map_or(true, f64::is_finite);
        if !finite(relative_level) || !finite(candidate.momentum.ok()) {
            return StrengthLabel::Undetermined {
                reason: UndeterminedReason::NonFiniteValue,
            };
        }

        match (relative_level, rank) {
            (Some(rel), Some(rank)) if rel > self.thresholds.level && rank > self.thresholds.rank => {
                StrengthLabel::Strong
            }
            _ => StrengthLabel::NotStrong,
        }
    }
}
