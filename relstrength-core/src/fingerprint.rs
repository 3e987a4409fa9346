//! Input fingerprinting: identify a (factors, equities, config) triple.
//!
//! Two evaluations with the same fingerprint ran on bit-identical inputs. The
//! runner uses it to tell whether a reloaded snapshot actually changed.

use crate::config::StrengthConfig;
use crate::domain::Table;

/// BLAKE3 over a table's axis, column names and value bits.
pub fn table_hash(table: &Table) -> String {
    let mut hasher = blake3::Hasher::new();
    feed_table(&mut hasher, table);
    hasher.finalize().to_hex().to_string()
}

/// BLAKE3 over both tables and every config field.
pub fn evaluation_hash(factors: &Table, equities: &Table, config: &StrengthConfig) -> String {
    let mut hasher = blake3::Hasher::new();
    feed_table(&mut hasher, factors);
    feed_table(&mut hasher, equities);

    feed_str(&mut hasher, &config.date_column);
    feed_str(&mut hasher, &config.benchmark_column);
    hasher.update(&(config.window as u64).to_le_bytes());
    hasher.update(&(config.factor_columns.len() as u64).to_le_bytes());
    for col in &config.factor_columns {
        feed_str(&mut hasher, col);
    }
    hasher.update(&(config.equity_columns.len() as u64).to_le_bytes());
    for col in &config.equity_columns {
        feed_str(&mut hasher, col);
    }
    hasher.update(&config.level_threshold.to_bits().to_le_bytes());
    hasher.update(&config.rank_threshold.to_bits().to_le_bytes());

    hasher.finalize().to_hex().to_string()
}

fn feed_table(hasher: &mut blake3::Hasher, table: &Table) {
    hasher.update(&(table.len() as u64).to_le_bytes());
    for date in table.dates() {
        feed_str(hasher, &date.to_string());
    }
    hasher.update(&(table.columns().len() as u64).to_le_bytes());
    for col in table.columns() {
        feed_str(hasher, &col.name);
        for v in &col.values {
            match v {
                Some(x) => {
                    hasher.update(&[1]);
                    hasher.update(&x.to_bits().to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
    }
}

/// Length-prefixed so ("ab", "c") and ("a", "bc") differ.
fn feed_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
