//! CSV ↔ [`Table`] conversion.
//!
//! Every cell is parsed explicitly: the date column through [`parse_date`],
//! every other cell through [`parse_cell`] to a number or absent. Nothing is
//! inferred from the data. Rows whose date cannot be parsed are dropped and
//! counted in the [`ParseReport`]; rows are sorted by date and duplicate dates
//! keep the last row.

use std::io;

use chrono::NaiveDate;
use relstrength_core::{Table, TableError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV error in {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: no header row")]
    NoHeader { table: String },

    #[error("{table}: no rows with a parseable date")]
    Empty { table: String },

    #[error("{table}: {source}")]
    Table {
        table: String,
        #[source]
        source: TableError,
    },
}

/// What the parser skipped or guessed while building a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Column used as the date axis.
    pub date_column: String,
    /// The configured date column was missing and the first column was used.
    pub date_column_fallback: bool,
    /// 1-based line numbers of rows dropped for an unparseable date.
    pub dropped_rows: Vec<u64>,
    /// Rows superseded by a later row with the same date.
    pub duplicate_dates: usize,
    /// Non-empty cells that did not parse as a number.
    pub non_numeric_cells: usize,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        !self.date_column_fallback
            && self.dropped_rows.is_empty()
            && self.duplicate_dates == 0
            && self.non_numeric_cells == 0
    }
}

/// Parse CSV text into a table named `name`.
pub fn parse_table(
    name: &str,
    text: &str,
    date_column: &str,
) -> Result<(Table, ParseReport), ParseError> {
    let csv_err = |source| ParseError::Csv {
        table: name.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(ParseError::NoHeader {
            table: name.to_string(),
        });
    }

    let mut report = ParseReport::default();
    let date_idx = match headers.iter().position(|h| h == date_column) {
        Some(idx) => idx,
        None => {
            report.date_column_fallback = true;
            0
        }
    };
    report.date_column = headers[date_idx].clone();

    let value_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != date_idx).collect();

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());

        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            report.dropped_rows.push(line);
            continue;
        };

        let values = value_idx
            .iter()
            .map(|&i| {
                let raw = record.get(i).unwrap_or("");
                let parsed = parse_cell(raw);
                if parsed.is_none() && !is_blank(raw) {
                    report.non_numeric_cells += 1;
                }
                parsed
            })
            .collect();
        rows.push((date, values));
    }

    if !report.dropped_rows.is_empty() {
        tracing::warn!(
            table = name,
            dropped = report.dropped_rows.len(),
            "dropped rows with unparseable dates"
        );
    }

    // Stable: among equal dates the later row stays last.
    rows.sort_by_key(|(date, _)| *date);
    let mut deduped: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::with_capacity(rows.len());
    for row in rows {
        match deduped.last_mut() {
            Some(last) if last.0 == row.0 => {
                *last = row;
                report.duplicate_dates += 1;
            }
            _ => deduped.push(row),
        }
    }

    if deduped.is_empty() {
        return Err(ParseError::Empty {
            table: name.to_string(),
        });
    }

    let dates: Vec<NaiveDate> = deduped.iter().map(|(d, _)| *d).collect();
    let mut table = Table::new(name, dates);
    for (col, &idx) in value_idx.iter().enumerate() {
        let values = deduped.iter().map(|(_, v)| v[col]).collect();
        table
            .push_column(headers[idx].clone(), values)
            .map_err(|source| ParseError::Table {
                table: name.to_string(),
                source,
            })?;
    }

    Ok((table, report))
}

fn is_blank(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("na")
        || t.eq_ignore_ascii_case("null")
        || t.eq_ignore_ascii_case("none")
        || t == "-"
}

/// A numeric cell, or absent. Thousands separators are accepted; non-finite
/// values are absent.
pub fn parse_cell(raw: &str) -> Option<f64> {
    if is_blank(raw) {
        return None;
    }
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: &[&str] = &["%Y%m%d", "%m/%d/%Y", "%d %b %Y", "%b %d, %Y", "%d-%b-%Y"];

/// Tolerant date parsing.
///
/// The first `YYYY<sep>M<sep>D` digit group wins (any non-digit run is a
/// separator, so `2024/1/2`, `2024-01-02T00:00:00` and `2024年1月2日` all
/// parse); otherwise a handful of common formats are tried.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((y, m, d)) = find_ymd(s.as_bytes()) {
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Leftmost match of four digits, separator, one or two digits, separator,
/// one or two digits.
fn find_ymd(b: &[u8]) -> Option<(i32, u32, u32)> {
    (0..b.len()).find_map(|start| match_ymd(&b[start..]))
}

fn match_ymd(b: &[u8]) -> Option<(i32, u32, u32)> {
    let year_len = digit_run(b);
    if year_len != 4 {
        // A longer run can still match from a later start position.
        return None;
    }
    let mut pos = 4;
    pos += separator_run(&b[pos..])?;

    let month_len = digit_run(&b[pos..]);
    if !(1..=2).contains(&month_len) {
        return None;
    }
    let month = number(&b[pos..pos + month_len]);
    pos += month_len;
    pos += separator_run(&b[pos..])?;

    let day_len = digit_run(&b[pos..]).min(2);
    if day_len == 0 {
        return None;
    }
    let day = number(&b[pos..pos + day_len]);

    Some((number(&b[..4]) as i32, month, day))
}

fn digit_run(b: &[u8]) -> usize {
    b.iter().take_while(|c| c.is_ascii_digit()).count()
}

fn separator_run(b: &[u8]) -> Option<usize> {
    let n = b.iter().take_while(|c| !c.is_ascii_digit()).count();
    (n > 0).then_some(n)
}

fn number(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'))
}

/// Write a table as CSV: ISO dates in `date_column`, values with six decimals,
/// absent cells empty.
pub fn write_table<W: io::Write>(
    table: &Table,
    date_column: &str,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![date_column.to_string()];
    header.extend(table.column_names().map(String::from));
    wtr.write_record(&header)?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(table.columns().len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        for col in table.columns() {
            record.push(match col.values[row] {
                Some(v) => format!("{v:.6}"),
                None => String::new(),
            });
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(table: &Table, date_column: &str) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_table(table, date_column, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn tolerant_date_forms() {
        assert_eq!(parse_date("2024-01-02"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024/1/2"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024-01-02T00:00:00Z"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024年1月2日"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("  2024.12.31 "), Some(d(2024, 12, 31)));
        assert_eq!(parse_date("20240102"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("01/02/2024"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2 Jan 2024"), Some(d(2024, 1, 2)));
    }

    #[test]
    fn bad_dates_are_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("n/a"), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("2024-123-4"), None);
    }

    #[test]
    fn leftmost_match_skips_long_digit_runs() {
        assert_eq!(parse_date("id 12024-03-05"), Some(d(2024, 3, 5)));
    }

    #[test]
    fn cells() {
        assert_eq!(parse_cell("1.5"), Some(1.5));
        assert_eq!(parse_cell(" -2 "), Some(-2.0));
        assert_eq!(parse_cell("1,234.5"), Some(1234.5));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("inf"), None);
        assert_eq!(parse_cell("abc"), None);
    }

    #[test]
    fn parses_sorts_and_dedupes() {
        let text = "Date,HSI,BTC\n\
                    2024-01-03,101,\n\
                    2024-01-02,100,40000\n\
                    garbage,1,2\n\
                    2024-01-03,102,41000\n";
        let (table, report) = parse_table("factors.csv", text, "Date").unwrap();

        assert_eq!(table.dates(), &[d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(
            table.column("HSI").unwrap().values,
            vec![Some(100.0), Some(102.0)]
        );
        assert_eq!(
            table.column("BTC").unwrap().values,
            vec![Some(40000.0), Some(41000.0)]
        );
        assert_eq!(report.dropped_rows, vec![4]);
        assert_eq!(report.duplicate_dates, 1);
        assert!(!report.date_column_fallback);
        assert!(!report.is_clean());
    }

    #[test]
    fn first_column_is_the_date_when_named_differently() {
        let text = "日期,Close\n2024/1/2,10\n2024/1/3,x\n";
        let (table, report) = parse_table("0700", text, "Date").unwrap();
        assert!(report.date_column_fallback);
        assert_eq!(report.date_column, "日期");
        assert_eq!(report.non_numeric_cells, 1);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Close"]);
        assert_eq!(table.column("Close").unwrap().values, vec![Some(10.0), None]);
    }

    #[test]
    fn short_rows_pad_with_absent() {
        let text = "Date,A,B\n2024-01-02,1\n";
        let (table, _) = parse_table("t", text, "Date").unwrap();
        assert_eq!(table.column("B").unwrap().values, vec![None]);
    }

    #[test]
    fn no_valid_rows_is_an_error() {
        let err = parse_table("t", "Date,A\nfoo,1\n", "Date").unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }

    #[test]
    fn duplicate_header_is_an_error() {
        let err = parse_table("t", "Date,A,A\n2024-01-02,1,2\n", "Date").unwrap_err();
        assert!(matches!(err, ParseError::Table { .. }));
    }

    #[test]
    fn writes_six_decimals_and_blanks() {
        let text = "Date,A,B\n2024-01-02,1,\n2024-01-03,2.5,3\n";
        let (table, _) = parse_table("t", text, "Date").unwrap();
        let out = to_csv_string(&table, "Date").unwrap();
        assert_eq!(
            out,
            "Date,A,B\n2024-01-02,1.000000,\n2024-01-03,2.500000,3.000000\n"
        );
        let (back, report) = parse_table("t", &out, "Date").unwrap();
        assert_eq!(back, table);
        assert!(report.is_clean());
    }
}
