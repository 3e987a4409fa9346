//! Data preparation: build `factors.csv` and `hk20.csv` from per-symbol sources.
//!
//! The sources file lists one `CODE,location` per line. The `FACTORS` entry
//! supplies the raw factor table; every other entry is one equity whose close
//! column becomes a column named after its code. Equities are outer-joined on
//! date. The factor table gains percentile-position columns and the two fused
//! benchmarks.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use relstrength_core::{Table, TableError, TableSummary};
use serde::Serialize;
use thiserror::Error;

use crate::csv_table::write_table;
use crate::loader::{FallbackLoader, LoadError, TableFetcher};
use crate::source::{SourcePair, TableSource};

/// Code of the factor source in the sources file.
pub const FACTOR_CODE: &str = "FACTORS";

pub const FACTOR_COLUMNS: [&str; 5] = ["HSI", "HSTECH", "USDCNH", "VHSI", "BTC"];

/// Factors where a lower value is the favourable direction.
pub const REVERSED_FACTORS: [&str; 2] = ["USDCNH", "VHSI"];

/// Trailing window cap for percentile positions (one trading year).
pub const PERCENTILE_WINDOW: usize = 252;

/// Fewer usable points than this gives an absent percentile position.
pub const MIN_PERCENTILE_POINTS: usize = 5;

pub const MACRO_WEIGHTS: [(&str, f64); 5] = [
    ("HSI", 28.0),
    ("HSTECH", 22.0),
    ("BTC", 15.0),
    ("USDCNH", 20.0),
    ("VHSI", 15.0),
];

pub const EQUAL_WEIGHTS: [(&str, f64); 5] = [
    ("HSI", 20.0),
    ("HSTECH", 20.0),
    ("BTC", 20.0),
    ("USDCNH", 20.0),
    ("VHSI", 20.0),
];

pub const FACTORS_FILE: &str = "factors.csv";
pub const EQUITIES_FILE: &str = "hk20.csv";

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("read sources file {path}: {cause}")]
    ReadSources {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("sources file lists no entries")]
    NoSources,

    #[error("{code}: no value column besides the date")]
    NoValueColumn { code: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("write {path}: {cause}")]
    Write {
        path: PathBuf,
        #[source]
        cause: csv::Error,
    },

    #[error("create {path}: {cause}")]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
}

/// One line of the sources file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub code: String,
    pub location: TableSource,
}

/// Parse a sources file. Blank lines, `#` comments and lines without a comma
/// are skipped; codes are upper-cased.
pub fn parse_sources(text: &str) -> Vec<SourceEntry> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once(','))
        .map(|(code, location)| SourceEntry {
            code: code.trim().to_uppercase(),
            location: TableSource::from(location.trim()),
        })
        .collect()
}

pub fn read_sources(path: &Path) -> Result<Vec<SourceEntry>, PrepareError> {
    let text = fs::read_to_string(path).map_err(|cause| PrepareError::ReadSources {
        path: path.to_path_buf(),
        cause,
    })?;
    Ok(parse_sources(&text))
}

// ─── Percentile position & fusion ───────────────────────────────────

/// Share of the trailing window at or below the current value, mapped to
/// [−1, 1] as `2·share − 1`.
///
/// The window is the last `min(window, i + 1)` rows; absent cells inside it
/// are ignored. Negated when `reverse` is set.
pub fn percentile_position(
    values: &[Option<f64>],
    window: usize,
    reverse: bool,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let v = values[i].filter(|x| x.is_finite())?;
            let avail = i + 1;
            if avail < MIN_PERCENTILE_POINTS {
                return None;
            }
            let eff = window.min(avail);
            let trailing: Vec<f64> = values[avail - eff..avail]
                .iter()
                .flatten()
                .copied()
                .filter(|x| x.is_finite())
                .collect();
            if trailing.len() < MIN_PERCENTILE_POINTS {
                return None;
            }
            let at_or_below = trailing.iter().filter(|&&x| x <= v).count();
            let share = at_or_below as f64 / trailing.len() as f64;
            let pos = 2.0 * share - 1.0;
            Some(if reverse { -pos } else { pos })
        })
        .collect()
}

/// Drop zero weights and scale the rest to sum to 1. All-zero weights become equal.
pub fn normalized_weights<'a>(weights: &[(&'a str, f64)]) -> Vec<(&'a str, f64)> {
    let kept: Vec<(&str, f64)> = weights.iter().copied().filter(|(_, w)| *w != 0.0).collect();
    let total: f64 = kept.iter().map(|(_, w)| w).sum();
    if total == 0.0 {
        let n = weights.len().max(1) as f64;
        return weights.iter().map(|(k, _)| (*k, 1.0 / n)).collect();
    }
    kept.into_iter().map(|(k, w)| (k, w / total)).collect()
}

/// Weighted row sum over the given columns. Absent cells contribute nothing;
/// a row where every input is absent stays absent.
pub fn fuse(
    columns: &HashMap<&str, Vec<Option<f64>>>,
    weights: &[(&str, f64)],
    rows: usize,
) -> Vec<Option<f64>> {
    let weights = normalized_weights(weights);
    (0..rows)
        .map(|row| {
            let mut sum = None;
            for (name, w) in &weights {
                if let Some(v) = columns.get(name).and_then(|c| c[row]) {
                    *sum.get_or_insert(0.0) += v * w;
                }
            }
            sum
        })
        .collect()
}

/// Raw factors plus `<F>_norm` columns and the fused benchmarks.
pub fn build_factor_table(raw: &Table) -> Result<Table, TableError> {
    let rows = raw.len();
    let mut out = Table::new(FACTORS_FILE, raw.dates().to_vec());

    for name in FACTOR_COLUMNS {
        let values = match raw.column(name) {
            Some(col) => col.values.clone(),
            None => {
                tracing::warn!(column = name, "factor column missing, filled absent");
                vec![None; rows]
            }
        };
        out.push_column(name, values)?;
    }

    let mut norms: HashMap<&str, Vec<Option<f64>>> = HashMap::new();
    for name in FACTOR_COLUMNS {
        let reverse = REVERSED_FACTORS.contains(&name);
        let raw_values = out.column(name).map(|c| c.values.as_slice()).unwrap_or(&[]);
        norms.insert(name, percentile_position(raw_values, PERCENTILE_WINDOW, reverse));
    }
    for name in FACTOR_COLUMNS {
        let values = norms.get(name).cloned().unwrap_or_else(|| vec![None; rows]);
        out.push_column(format!("{name}_norm"), values)?;
    }

    out.push_column("Fused_macro", fuse(&norms, &MACRO_WEIGHTS, rows))?;
    out.push_column("Fused_equal", fuse(&norms, &EQUAL_WEIGHTS, rows))?;
    Ok(out)
}

/// Close column of one equity source: `Close` if present, else the first
/// value column.
pub fn close_column<'t>(
    code: &str,
    table: &'t Table,
) -> Result<&'t [Option<f64>], PrepareError> {
    table
        .column("Close")
        .or_else(|| table.columns().first())
        .map(|c| c.values.as_slice())
        .ok_or_else(|| PrepareError::NoValueColumn {
            code: code.to_string(),
        })
}

/// Outer join of equity close series on date, ascending; missing cells absent.
/// A repeated code keeps its last source.
pub fn merge_equities(equities: &[(String, Table)]) -> Result<Table, PrepareError> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_code: HashMap<&str, HashMap<NaiveDate, Option<f64>>> = HashMap::new();

    for (code, table) in equities {
        let closes = close_column(code, table)?;
        let lookup = table.dates().iter().copied().zip(closes.iter().copied()).collect();
        if by_code.insert(code.as_str(), lookup).is_some() {
            tracing::warn!(code = %code, "duplicate equity code, keeping the later source");
        } else {
            order.push(code.as_str());
        }
    }

    let dates: Vec<NaiveDate> = by_code
        .values()
        .flat_map(|m| m.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut merged = Table::new(EQUITIES_FILE, dates);
    for code in order {
        let lookup = &by_code[code];
        let values = merged
            .dates()
            .iter()
            .map(|d| lookup.get(d).copied().flatten())
            .collect();
        merged.push_column(code, values)?;
    }
    Ok(merged)
}

// ─── Job ────────────────────────────────────────────────────────────

/// What a preparation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareSummary {
    pub factors: Option<TableSummary>,
    pub equities: Option<TableSummary>,
    pub written: Vec<PathBuf>,
}

pub struct PrepareJob<'a, F> {
    loader: &'a FallbackLoader<F>,
    out_dir: PathBuf,
}

impl<'a, F: TableFetcher> PrepareJob<'a, F> {
    pub fn new(loader: &'a FallbackLoader<F>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            out_dir: out_dir.into(),
        }
    }

    /// Fetch every source and write whichever of the two tables has inputs.
    pub fn run(&self, entries: &[SourceEntry]) -> Result<PrepareSummary, PrepareError> {
        if entries.is_empty() {
            return Err(PrepareError::NoSources);
        }

        let mut raw_factors = None;
        let mut equities = Vec::new();
        for entry in entries {
            let loaded = self
                .loader
                .load(&entry.code, &SourcePair::new(entry.location.clone()))?;
            tracing::info!(code = %entry.code, rows = loaded.table.len(), "fetched");
            if entry.code == FACTOR_CODE {
                raw_factors = Some(loaded.table);
            } else {
                equities.push((entry.code.clone(), loaded.table));
            }
        }

        fs::create_dir_all(&self.out_dir).map_err(|cause| PrepareError::Io {
            path: self.out_dir.clone(),
            cause,
        })?;

        let mut summary = PrepareSummary {
            factors: None,
            equities: None,
            written: Vec::new(),
        };

        if equities.is_empty() {
            tracing::warn!("no equity sources listed");
        } else {
            let merged = merge_equities(&equities)?;
            let path = self.write(&merged, EQUITIES_FILE)?;
            tracing::info!(
                path = %path.display(),
                rows = merged.len(),
                symbols = merged.columns().len(),
                "wrote equities"
            );
            summary.equities = Some(merged.summary());
            summary.written.push(path);
        }

        match raw_factors {
            Some(raw) => {
                let factors = build_factor_table(&raw)?;
                let path = self.write(&factors, FACTORS_FILE)?;
                tracing::info!(path = %path.display(), rows = factors.len(), "wrote factors");
                summary.factors = Some(factors.summary());
                summary.written.push(path);
            }
            None => tracing::warn!("no {FACTOR_CODE} source listed"),
        }

        Ok(summary)
    }

    fn write(&self, table: &Table, file: &str) -> Result<PathBuf, PrepareError> {
        let path = self.out_dir.join(file);
        let f = fs::File::create(&path).map_err(|cause| PrepareError::Io {
            path: path.clone(),
            cause,
        })?;
        write_table(table, "Date", f).map_err(|cause| PrepareError::Write {
            path: path.clone(),
            cause,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn sources_file_rules() {
        let text = concat!(
            "# comment\n",
            "\n",
            "factors, data/factors_raw.csv\n",
            "0700,https://x/0700.csv\n",
            "no comma here\n",
            " 9988 , ./9988.csv \n",
        );
        let entries = parse_sources(text);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code, "FACTORS");
        assert_eq!(entries[0].location, TableSource::File("data/factors_raw.csv".into()));
        assert!(entries[1].location.is_remote());
        assert_eq!(entries[2].code, "9988");
        assert_eq!(entries[2].location, TableSource::File("./9988.csv".into()));
    }

    #[test]
    fn percentile_needs_five_points() {
        let out = percentile_position(&some(&[1.0, 2.0, 3.0, 4.0, 5.0, 3.0]), 252, false);
        assert_eq!(&out[..4], &[None, None, None, None]);
        // 5 is the max of five points.
        assert_eq!(out[4], Some(1.0));
        // 3 is at or above 4 of 6 points: 2·(4/6) − 1.
        assert!((out[5].unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_reverse_and_window() {
        let vals = some(&[5.0, 4.0, 3.0, 2.0, 1.0, 10.0]);
        let out = percentile_position(&vals, 5, true);
        // Window of 5: [4,3,2,1,10]; 10 is the max → 1, reversed → -1.
        assert_eq!(out[5], Some(-1.0));
        // Row 4: [5,4,3,2,1]; 1 is the min → 2·(1/5) − 1 = −0.6, reversed 0.6.
        assert!((out[4].unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn percentile_gaps() {
        let vals = vec![Some(1.0), None, Some(2.0), Some(3.0), Some(4.0), None, Some(5.0)];
        let out = percentile_position(&vals, 252, false);
        assert_eq!(out[4], None); // only four usable points
        assert_eq!(out[5], None); // absent value
        assert_eq!(out[6], Some(1.0));
    }

    #[test]
    fn weights_normalize() {
        let w = normalized_weights(&MACRO_WEIGHTS);
        let total: f64 = w.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(w[0], ("HSI", 0.28));

        let zero = normalized_weights(&[("A", 0.0), ("B", 0.0)]);
        assert_eq!(zero, vec![("A", 0.5), ("B", 0.5)]);

        let partial = normalized_weights(&[("A", 0.0), ("B", 3.0)]);
        assert_eq!(partial, vec![("B", 1.0)]);
    }

    #[test]
    fn fusion_skips_gaps_and_keeps_all_absent_rows_absent() {
        let mut cols = HashMap::new();
        cols.insert("HSI", vec![Some(1.0), None, None]);
        cols.insert("BTC", vec![Some(-1.0), Some(0.5), None]);
        let out = fuse(&cols, &[("HSI", 1.0), ("BTC", 1.0)], 3);
        assert_eq!(out, vec![Some(0.0), Some(0.25), None]);
    }

    #[test]
    fn factor_table_layout() {
        let raw = Table::new("raw", dates(3))
            .with_column("HSI", some(&[1.0, 2.0, 3.0]))
            .unwrap()
            .with_column("BTC", some(&[1.0, 2.0, 3.0]))
            .unwrap();
        let out = build_factor_table(&raw).unwrap();
        let names: Vec<&str> = out.column_names().collect();
        assert_eq!(
            names,
            vec![
                "HSI", "HSTECH", "USDCNH", "VHSI", "BTC", "HSI_norm", "HSTECH_norm",
                "USDCNH_norm", "VHSI_norm", "BTC_norm", "Fused_macro", "Fused_equal"
            ]
        );
        assert_eq!(out.column("HSTECH").unwrap().values, vec![None; 3]);
        // Three rows is below the percentile minimum, so the fusion is absent.
        assert_eq!(out.column("Fused_macro").unwrap().values, vec![None; 3]);
    }

    #[test]
    fn merge_outer_joins_and_sorts() {
        let d = dates(4);
        let a = Table::new("0700", vec![d[0], d[2]])
            .with_column("Open", some(&[9.0, 9.0]))
            .unwrap()
            .with_column("Close", some(&[10.0, 12.0]))
            .unwrap();
        let b = Table::new("0005", vec![d[3], d[1]])
            .with_column("Price", some(&[4.0, 2.0]))
            .unwrap();
        let merged = merge_equities(&[("0700".into(), a), ("0005".into(), b)]).unwrap();

        assert_eq!(merged.dates(), &d[..]);
        assert_eq!(
            merged.column("0700").unwrap().values,
            vec![Some(10.0), None, Some(12.0), None]
        );
        assert_eq!(
            merged.column("0005").unwrap().values,
            vec![None, Some(2.0), None, Some(4.0)]
        );
    }

    #[test]
    fn equity_without_values_is_an_error() {
        let empty = Table::new("x", dates(2));
        let err = merge_equities(&[("X".into(), empty)]).unwrap_err();
        assert!(matches!(err, PrepareError::NoValueColumn { .. }));
    }
}
