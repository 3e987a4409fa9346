//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use relstrength_core::{evaluate, Evaluation, StrengthConfig, Table};

/// Benchmark Fused_macro, factor HSI; A falls and C rises, so C is strong.
pub fn evaluation() -> Evaluation {
    let dates: Vec<NaiveDate> = ["2024-01-02", "2024-01-03", "2024-01-04"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    let factors = Table::new("factors", dates.clone())
        .with_column("HSI", vec![Some(1.0), Some(2.0), Some(3.0)])
        .unwrap()
        .with_column("Fused_macro", vec![Some(0.0), Some(1.0), Some(0.4)])
        .unwrap();
    let equities = Table::new("equities", dates)
        .with_column("A", vec![Some(3.0), Some(2.0), Some(1.0)])
        .unwrap()
        .with_column("C", vec![Some(1.0), Some(2.0), Some(3.0)])
        .unwrap();
    let config = StrengthConfig {
        factor_columns: vec!["HSI".into()],
        window: 3,
        ..Default::default()
    };
    evaluate(&factors, &equities, &config).unwrap()
}
