//! Orchestration: alignment check, then normalize → momentum → classify.
//!
//! An evaluation takes two immutable tables and a config and returns an
//! immutable [`Evaluation`]. Alignment and missing-column problems abort the
//! whole run; per-series data shortfalls only mark that series undetermined.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{Candidate, StrengthClassifier, StrengthReport, Verdict};
use crate::config::StrengthConfig;
use crate::domain::{NormalizedSeries, Table};
use crate::error::{AlignmentMismatch, CoreError};
use crate::fingerprint::evaluation_hash;
use crate::momentum::MomentumEstimator;
use crate::normalize::normalize;

/// One tracked equity: full normalized history plus its verdict at the latest date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityStrength {
    pub series: NormalizedSeries,
    pub verdict: Verdict,
}

/// Immutable outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Shared date axis of every series below.
    pub dates: Vec<NaiveDate>,
    pub benchmark: NormalizedSeries,
    pub factors: Vec<NormalizedSeries>,
    /// Tracked equities in enumeration order.
    pub equities: Vec<EquityStrength>,
    /// Strong equity names in enumeration order.
    pub strong: Vec<String>,
    pub window: usize,
    /// BLAKE3 over both input tables and the config.
    pub fingerprint: String,
}

impl Evaluation {
    /// The evaluation point.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn equity(&self, name: &str) -> Option<&EquityStrength> {
        self.equities.iter().find(|e| e.series.name() == name)
    }

    /// Verdicts and strong list as a standalone report.
    pub fn report(&self) -> StrengthReport {
        StrengthReport {
            verdicts: self.equities.iter().map(|e| e.verdict.clone()).collect(),
            strong: self.strong.clone(),
        }
    }
}

/// Both tables must have the same number of rows and the same date in every row.
pub fn check_alignment(factors: &Table, equities: &Table) -> Result<(), CoreError> {
    if factors.len() != equities.len() {
        return Err(AlignmentMismatch::RowCount {
            factor_rows: factors.len(),
            equity_rows: equities.len(),
        }
        .into());
    }

    let mismatch = factors
        .dates()
        .iter()
        .zip(equities.dates())
        .position(|(f, e)| f != e);
    if let Some(row) = mismatch {
        return Err(AlignmentMismatch::Date {
            row,
            factor: factors.dates()[row],
            equity: equities.dates()[row],
        }
        .into());
    }
    Ok(())
}

/// Run the full pipeline over one pair of tables.
pub fn evaluate(
    factors: &Table,
    equities: &Table,
    config: &StrengthConfig,
) -> Result<Evaluation, CoreError> {
    config
        .validate()
        .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
    check_alignment(factors, equities)?;

    let benchmark = factors
        .series(&config.benchmark_column)
        .ok_or_else(|| missing(factors, &config.benchmark_column))?;

    let factor_series = config
        .factor_columns
        .iter()
        .map(|name| {
            factors
                .series(name)
                .ok_or_else(|| missing(factors, name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let equity_series = if config.equity_columns.is_empty() {
        equities
            .column_names()
            .filter(|name| *name != config.benchmark_column)
            .filter_map(|name| equities.series(name))
            .collect::<Vec<_>>()
    } else {
        config
            .equity_columns
            .iter()
            .filter(|name| **name != config.benchmark_column)
            .map(|name| {
                equities
                    .series(name)
                    .ok_or_else(|| missing(equities, name))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    // 1. Normalize every tracked column.
    let benchmark = normalize(&benchmark);
    let factors_norm: Vec<NormalizedSeries> = factor_series.iter().map(normalize).collect();
    let equities_norm: Vec<NormalizedSeries> = equity_series.iter().map(normalize).collect();

    // 2. Momentum per tracked equity.
    let estimator = MomentumEstimator::new(config.window)
        .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
    let momenta: Vec<_> = equities_norm.iter().map(|s| estimator.estimate(s)).collect();

    // 3. Classify at the latest point.
    let candidates: Vec<Candidate<'_>> = equities_norm
        .iter()
        .zip(&momenta)
        .map(|(s, m)| Candidate {
            name: s.name(),
            latest: s.latest(),
            momentum: *m,
        })
        .collect();
    let report =
        StrengthClassifier::new(config.thresholds()).classify(&candidates, benchmark.latest());

    for v in report.undetermined() {
        tracing::debug!(series = %v.name, label = ?v.label, "strength undetermined");
    }
    tracing::debug!(
        tracked = report.verdicts.len(),
        strong = report.strong.len(),
        "evaluation complete"
    );

    let StrengthReport { verdicts, strong } = report;
    let equities_out = equities_norm
        .into_iter()
        .zip(verdicts)
        .map(|(series, verdict)| EquityStrength { series, verdict })
        .collect();

    Ok(Evaluation {
        dates: factors.dates().to_vec(),
        benchmark,
        factors: factors_norm,
        equities: equities_out,
        strong,
        window: config.window,
        fingerprint: evaluation_hash(factors, equities, config),
    })
}

fn missing(table: &Table, column: &str) -> CoreError {
    CoreError::MissingColumn {
        table: table.name().to_string(),
        column: column.to_string(),
    }
}
