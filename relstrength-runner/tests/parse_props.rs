//! Property tests for the tolerant cell and date parsers.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use relstrength_runner::{parse_cell, parse_date, parse_table, to_csv_string};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

// ── Dates ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn every_supported_layout_gives_the_same_date(d in arb_date()) {
        let layouts = [
            d.format("%Y-%m-%d").to_string(),
            format!("{}/{}/{}", d.year(), d.month(), d.day()),
            format!("{}年{}月{}日", d.year(), d.month(), d.day()),
            d.format("%Y-%m-%dT00:00:00").to_string(),
            d.format("%Y%m%d").to_string(),
            d.format("%m/%d/%Y").to_string(),
            d.format("%d %b %Y").to_string(),
        ];
        for s in &layouts {
            prop_assert_eq!(parse_date(s), Some(d), "layout {}", s);
        }
    }

    #[test]
    fn parse_date_never_panics(s in "\\PC{0,40}") {
        let _ = parse_date(&s);
    }
}

// ── Cells ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn thousands_separators_are_ignored(int in 1_000u64..10_000_000, frac in 0u32..100) {
        let plain = format!("{int}.{frac:02}");
        let grouped = format!("{}.{frac:02}", group_thousands(int));
        prop_assert_eq!(parse_cell(&grouped), parse_cell(&plain));
        prop_assert!(parse_cell(&plain).is_some());
    }

    #[test]
    fn parsed_cells_are_finite(s in "\\PC{0,20}") {
        if let Some(v) = parse_cell(&s) {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn written_tables_parse_back_within_rounding(
        values in prop::collection::vec(prop::option::of(-1.0e6..1.0e6_f64), 1..60),
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        let table = relstrength_core::Table::new("t", dates)
            .with_column("x", values.clone())
            .unwrap();

        let text = to_csv_string(&table, "Date").unwrap();
        let (back, report) = parse_table("t", &text, "Date").unwrap();
        prop_assert!(report.is_clean());
        prop_assert_eq!(back.dates(), table.dates());
        for (a, b) in values.iter().zip(&back.column("x").unwrap().values) {
            match (a, b) {
                (Some(a), Some(b)) => prop_assert!((a - b).abs() <= 5e-7),
                (None, None) => {}
                _ => prop_assert!(false, "presence changed: {:?} vs {:?}", a, b),
            }
        }
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
