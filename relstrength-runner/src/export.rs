//! Result export: JSON and CSV artifacts of one evaluation.
//!
//! - **JSON**: the full [`Evaluation`] wrapped with a schema version and a
//!   generation timestamp. Unknown versions are rejected on load.
//! - **CSV**: one row per tracked equity with its verdict at the latest date.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use relstrength_core::{Evaluation, StrengthLabel};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub const EVALUATION_FILE: &str = "evaluation.json";
pub const STRENGTH_FILE: &str = "strength.csv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationExport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub evaluation: Evaluation,
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(evaluation: &Evaluation) -> Result<String> {
    let doc = EvaluationExport {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        evaluation: evaluation.clone(),
    };
    serde_json::to_string_pretty(&doc).context("failed to serialize evaluation to JSON")
}

pub fn import_json(json: &str) -> Result<EvaluationExport> {
    let doc: EvaluationExport =
        serde_json::from_str(json).context("failed to deserialize evaluation from JSON")?;
    if doc.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            doc.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(doc)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: name, momentum, rank, relative_level, label, reason
pub fn strength_csv(evaluation: &Evaluation) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["name", "momentum", "rank", "relative_level", "label", "reason"])?;

    for e in &evaluation.equities {
        let v = &e.verdict;
        let reason = match v.label {
            StrengthLabel::Undetermined { reason } => reason.to_string(),
            _ => String::new(),
        };
        wtr.write_record([
            v.name.clone(),
            fmt_opt(v.momentum),
            fmt_opt(v.rank),
            fmt_opt(v.relative_level),
            v.label.as_str().to_string(),
            reason,
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Write `evaluation.json` and `strength.csv` into `dir`, creating it if needed.
pub fn write_outputs(evaluation: &Evaluation, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let json_path = dir.join(EVALUATION_FILE);
    fs::write(&json_path, export_json(evaluation)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let csv_path = dir.join(STRENGTH_FILE);
    fs::write(&csv_path, strength_csv(evaluation)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    tracing::info!(dir = %dir.display(), "wrote evaluation outputs");
    Ok(vec![json_path, csv_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use relstrength_core::{evaluate, StrengthConfig, Table};

    fn evaluation() -> Evaluation {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates: Vec<_> = (0..3).map(|i| base + chrono::Duration::days(i)).collect();
        let f = Table::new("factors", dates.clone())
            .with_column("Fused_macro", vec![Some(0.0), Some(1.0), Some(0.4)])
            .unwrap();
        let e = Table::new("equities", dates)
            .with_column("A", vec![Some(3.0), Some(2.0), Some(1.0)])
            .unwrap()
            .with_column("B", vec![Some(1.0), Some(2.0), Some(3.0)])
            .unwrap()
            .with_column("C", vec![None, None, Some(1.0)])
            .unwrap();
        let cfg = StrengthConfig {
            factor_columns: vec![],
            window: 3,
            ..Default::default()
        };
        evaluate(&f, &e, &cfg).unwrap()
    }

    #[test]
    fn csv_has_one_row_per_equity() {
        let csv = strength_csv(&evaluation()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,momentum,rank,relative_level,label,reason");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("A,-0.500000,0.000000,-0.400000,not_strong"));
        assert!(lines[2].starts_with("B,0.500000,1.000000,0.600000,strong"));
        assert!(lines[3].starts_with("C,,,"));
        assert!(lines[3].contains("undetermined"));
    }

    #[test]
    fn json_roundtrip_and_version_gate() {
        let eval = evaluation();
        let json = export_json(&eval).unwrap();
        let doc = import_json(&json).unwrap();
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.evaluation.strong, eval.strong);
        assert_eq!(doc.evaluation.fingerprint, eval.fingerprint);

        let future = json.replacen(
            &format!("\"schema_version\": {SCHEMA_VERSION}"),
            "\"schema_version\": 99",
            1,
        );
        let err = import_json(&future).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = write_outputs(&evaluation(), &out).unwrap();
        assert_eq!(written.len(), 2);
        assert!(out.join(EVALUATION_FILE).exists());
        assert!(out.join(STRENGTH_FILE).exists());
    }
}
