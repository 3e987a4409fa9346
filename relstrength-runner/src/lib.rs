//! relstrength runner: everything between the raw sources and the core.
//!
//! This crate builds on `relstrength-core` to provide:
//! - Table sources (URL or file) with primary/fallback pairs and retry policy
//! - Explicit CSV parsing into date-indexed tables
//! - Concurrent loading of the factor/equity pair
//! - A snapshot cache so evaluations run over a stable, shared view
//! - The data preparation job (merge, percentile positions, fused benchmarks)
//! - JSON and CSV export of evaluation results

pub mod csv_table;
pub mod export;
pub mod loader;
pub mod prepare;
pub mod snapshot;
pub mod source;

pub use csv_table::{parse_cell, parse_date, parse_table, to_csv_string, ParseError, ParseReport};
pub use export::{export_json, import_json, strength_csv, write_outputs, EvaluationExport};
pub use loader::{
    DefaultFetcher, FallbackLoader, FetchError, LoadError, LoadedTable, Origin, TableFetcher,
};
pub use prepare::{
    parse_sources, read_sources, PrepareError, PrepareJob, PrepareSummary, SourceEntry,
};
pub use snapshot::{Refresh, Snapshot, SnapshotCache};
pub use source::{RetryPolicy, SourcePair, TableSource};
