//! Read-only snapshot of the most recently loaded table pair.
//!
//! Evaluations run independently over an `Arc<Snapshot>`. Reloading swaps the
//! `Arc`; readers holding the old one keep a consistent view.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use relstrength_core::fingerprint::table_hash;
use relstrength_core::{evaluate, CoreError, Evaluation, StrengthConfig};

use crate::loader::{FallbackLoader, LoadError, LoadedTable, TableFetcher};
use crate::source::SourcePair;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub factors: LoadedTable,
    pub equities: LoadedTable,
    pub factors_hash: String,
    pub equities_hash: String,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(factors: LoadedTable, equities: LoadedTable) -> Self {
        Self {
            factors_hash: table_hash(&factors.table),
            equities_hash: table_hash(&equities.table),
            factors,
            equities,
            loaded_at: Utc::now(),
        }
    }

    /// Same table contents, regardless of where or when they were loaded.
    pub fn same_data(&self, other: &Snapshot) -> bool {
        self.factors_hash == other.factors_hash && self.equities_hash == other.equities_hash
    }

    pub fn evaluate(&self, config: &StrengthConfig) -> Result<Evaluation, CoreError> {
        evaluate(&self.factors.table, &self.equities.table, config)
    }
}

/// Holds the current snapshot for concurrent readers.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: RwLock<Option<Arc<Snapshot>>>,
}

/// Outcome of a reload.
#[derive(Debug, Clone)]
pub struct Refresh {
    pub snapshot: Arc<Snapshot>,
    /// False when the reloaded tables are identical to the previous ones.
    pub changed: bool,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new snapshot and return it.
    pub fn replace(&self, snapshot: Snapshot) -> Refresh {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let changed = guard
            .as_ref()
            .map_or(true, |old| !old.same_data(&snapshot));
        *guard = Some(Arc::clone(&snapshot));
        Refresh { snapshot, changed }
    }

    /// Load both tables and install them. On failure the previous snapshot stays.
    pub fn refresh<F: TableFetcher>(
        &self,
        loader: &FallbackLoader<F>,
        factors: &SourcePair,
        equities: &SourcePair,
    ) -> Result<Refresh, LoadError> {
        let (f, e) = loader.load_pair(factors, equities)?;
        let refresh = self.replace(Snapshot::new(f, e));
        tracing::info!(
            factors = %refresh.snapshot.factors.table.summary(),
            equities = %refresh.snapshot.equities.table.summary(),
            changed = refresh.changed,
            "snapshot loaded"
        );
        Ok(refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_table::ParseReport;
    use crate::loader::Origin;
    use chrono::NaiveDate;
    use relstrength_core::Table;

    fn loaded(name: &str, col: &str, values: &[f64]) -> LoadedTable {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dates = (0..values.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        let table = Table::new(name, dates)
            .with_column(col, values.iter().map(|v| Some(*v)).collect())
            .unwrap();
        LoadedTable {
            table,
            origin: Origin::Primary,
            location: format!("{name}.csv"),
            report: ParseReport::default(),
        }
    }

    #[test]
    fn replace_reports_changes() {
        let cache = SnapshotCache::new();
        assert!(cache.current().is_none());

        let first = cache.replace(Snapshot::new(
            loaded("f", "Fused_macro", &[0.1, 0.2]),
            loaded("e", "0700", &[1.0, 2.0]),
        ));
        assert!(first.changed);

        let again = cache.replace(Snapshot::new(
            loaded("f", "Fused_macro", &[0.1, 0.2]),
            loaded("e", "0700", &[1.0, 2.0]),
        ));
        assert!(!again.changed);

        let moved = cache.replace(Snapshot::new(
            loaded("f", "Fused_macro", &[0.1, 0.3]),
            loaded("e", "0700", &[1.0, 2.0]),
        ));
        assert!(moved.changed);
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let cache = SnapshotCache::new();
        cache.replace(Snapshot::new(
            loaded("f", "Fused_macro", &[0.1, 0.2]),
            loaded("e", "0700", &[1.0, 2.0]),
        ));
        let held = cache.current().unwrap();
        cache.replace(Snapshot::new(
            loaded("f", "Fused_macro", &[0.5, 0.6, 0.7]),
            loaded("e", "0700", &[1.0, 2.0, 3.0]),
        ));
        assert_eq!(held.factors.table.len(), 2);
        assert_eq!(cache.current().unwrap().factors.table.len(), 3);
    }

    #[test]
    fn evaluates_over_snapshot() {
        let snap = Snapshot::new(
            loaded("f", "Fused_macro", &[0.0, 0.5, 0.25]),
            loaded("e", "0700", &[1.0, 2.0, 3.0]),
        );
        let cfg = StrengthConfig {
            factor_columns: vec![],
            window: 3,
            ..Default::default()
        };
        let eval = snap.evaluate(&cfg).unwrap();
        // Above the benchmark, but a lone series ranks 0.
        assert_eq!(eval.equities[0].verdict.relative_level, Some(0.5));
        assert_eq!(eval.equities[0].verdict.rank, Some(0.0));
        assert!(eval.strong.is_empty());
    }
}
