//! Primary/fallback loading, concurrent pair loading and the snapshot cache,
//! driven by an in-memory fetcher.

use std::collections::HashMap;
use std::sync::Mutex;

use relstrength_core::{StrengthConfig, StrengthLabel};
use relstrength_runner::{
    DefaultFetcher, FallbackLoader, FetchError, LoadError, Origin, RetryPolicy, SnapshotCache,
    SourcePair, TableFetcher, TableSource,
};

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Default)]
struct MockFetcher {
    responses: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    fn with(mut self, location: &str, body: &str) -> Self {
        self.responses.insert(location.to_string(), body.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl TableFetcher for MockFetcher {
    fn fetch_text(&self, source: &TableSource) -> Result<String, FetchError> {
        let key = source.to_string();
        self.calls.lock().unwrap().push(key.clone());
        self.responses
            .get(&key)
            .cloned()
            .ok_or(FetchError::HttpStatus {
                url: key,
                status: 404,
            })
    }
}

const FACTORS: &str = "Date,HSI,Fused_macro\n\
                       2024-01-02,16000,0.0\n\
                       2024-01-03,16100,1.0\n\
                       2024-01-04,16050,0.4\n";

/// Scenario from the strength rule: A falls, B is flat, C rises.
const EQUITIES: &str = "Date,A,B,C\n\
                        2024-01-02,30,5,10\n\
                        2024-01-03,20,5,20\n\
                        2024-01-04,10,5,30\n";

fn config() -> StrengthConfig {
    StrengthConfig {
        factor_columns: vec!["HSI".into()],
        window: 3,
        ..Default::default()
    }
}

// ── Fallback policy ──────────────────────────────────────────────────

#[test]
fn primary_success_never_touches_fallback() {
    let loader = FallbackLoader::new(
        MockFetcher::default().with("https://p/f.csv", FACTORS),
        "Date",
    );
    let pair = SourcePair::new("https://p/f.csv").with_fallback("https://b/f.csv");

    let loaded = loader.load("factors", &pair).unwrap();
    assert_eq!(loaded.origin, Origin::Primary);
    assert_eq!(loaded.table.len(), 3);
    assert_eq!(loader.fetcher().calls(), vec!["https://p/f.csv"]);
}

#[test]
fn primary_failure_uses_fallback() {
    let loader = FallbackLoader::new(
        MockFetcher::default().with("https://b/f.csv", FACTORS),
        "Date",
    );
    let pair = SourcePair::new("https://p/f.csv").with_fallback("https://b/f.csv");

    let loaded = loader.load("factors", &pair).unwrap();
    assert_eq!(loaded.origin, Origin::Fallback);
    assert_eq!(loaded.location, "https://b/f.csv");
    assert_eq!(
        loader.fetcher().calls(),
        vec!["https://p/f.csv", "https://b/f.csv"]
    );
}

#[test]
fn unparseable_primary_uses_fallback() {
    let loader = FallbackLoader::new(
        MockFetcher::default()
            .with("p.csv", "Date,HSI\nnot a date,1\n")
            .with("b.csv", FACTORS),
        "Date",
    );
    let pair = SourcePair::new("p.csv").with_fallback("b.csv");
    let loaded = loader.load("factors", &pair).unwrap();
    assert_eq!(loaded.origin, Origin::Fallback);
}

#[test]
fn both_failing_is_a_retrieval_failure_with_both_causes() {
    let loader = FallbackLoader::new(MockFetcher::default(), "Date");
    let pair = SourcePair::new("https://p/f.csv").with_fallback("https://b/f.csv");

    match loader.load("factors", &pair) {
        Err(LoadError::RetrievalFailure {
            table,
            primary,
            fallback,
        }) => {
            assert_eq!(table, "factors");
            assert!(primary.to_string().contains("https://p/f.csv"));
            assert!(fallback.to_string().contains("https://b/f.csv"));
        }
        other => panic!("expected RetrievalFailure, got {other:?}"),
    }
}

#[test]
fn without_fallback_the_primary_error_is_returned() {
    let loader = FallbackLoader::new(MockFetcher::default(), "Date");
    let err = loader
        .load("factors", &SourcePair::new("https://p/f.csv"))
        .unwrap_err();
    assert!(matches!(err, LoadError::Fetch { .. }));
}

// ── Pair loading & evaluation ────────────────────────────────────────

#[test]
fn pair_loads_and_evaluates_end_to_end() {
    let loader = FallbackLoader::new(
        MockFetcher::default()
            .with("f.csv", FACTORS)
            .with("e.csv", EQUITIES),
        "Date",
    );
    let (f, e) = loader
        .load_pair(&SourcePair::new("f.csv"), &SourcePair::new("e.csv"))
        .unwrap();
    assert_eq!(f.table.name(), "factors");
    assert_eq!(e.table.name(), "equities");

    let eval = relstrength_core::evaluate(&f.table, &e.table, &config()).unwrap();
    assert_eq!(eval.strong, vec!["C".to_string()]);
    assert_eq!(
        eval.equity("A").unwrap().verdict.label,
        StrengthLabel::NotStrong
    );
}

#[test]
fn pair_failure_reports_the_failing_table() {
    let loader = FallbackLoader::new(MockFetcher::default().with("f.csv", FACTORS), "Date");
    let err = loader
        .load_pair(&SourcePair::new("f.csv"), &SourcePair::new("missing.csv"))
        .unwrap_err();
    assert!(err.to_string().contains("missing.csv"));
}

// ── Snapshot cache ───────────────────────────────────────────────────

#[test]
fn refresh_installs_snapshot_and_failure_keeps_it() {
    let cache = SnapshotCache::new();
    let good = FallbackLoader::new(
        MockFetcher::default()
            .with("f.csv", FACTORS)
            .with("e.csv", EQUITIES),
        "Date",
    );
    let f = SourcePair::new("f.csv");
    let e = SourcePair::new("e.csv");

    let first = cache.refresh(&good, &f, &e).unwrap();
    assert!(first.changed);
    let second = cache.refresh(&good, &f, &e).unwrap();
    assert!(!second.changed);

    let broken = FallbackLoader::new(MockFetcher::default(), "Date");
    assert!(cache.refresh(&broken, &f, &e).is_err());

    let snap = cache.current().unwrap();
    assert_eq!(snap.equities.table.len(), 3);
    assert_eq!(snap.evaluate(&config()).unwrap().strong, vec!["C".to_string()]);
}

// ── Files on disk ────────────────────────────────────────────────────

#[test]
fn default_fetcher_reads_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("factors.csv");
    std::fs::write(&path, FACTORS).unwrap();

    let fetcher = DefaultFetcher::new(RetryPolicy::immediate(1)).unwrap();
    let loader = FallbackLoader::new(fetcher, "Date");
    let missing = dir.path().join("nope.csv");
    let pair = SourcePair::new(TableSource::File(missing)).with_fallback(TableSource::File(path));

    let loaded = loader.load("factors", &pair).unwrap();
    assert_eq!(loaded.origin, Origin::Fallback);
    assert_eq!(
        loaded.table.column_names().collect::<Vec<_>>(),
        vec!["HSI", "Fused_macro"]
    );
}
