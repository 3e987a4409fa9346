//! Background loader thread: retrieval and evaluation run here.
//!
//! Communication with the render loop is via `mpsc` channels. The worker owns
//! the snapshot cache, so a failed reload leaves the last good tables in place.

use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use relstrength_core::{Evaluation, StrengthConfig};
use relstrength_runner::{FallbackLoader, SnapshotCache, SourcePair, TableFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    Reload,
    Shutdown,
}

#[derive(Debug)]
pub enum WorkerResponse {
    Loaded {
        evaluation: Box<Evaluation>,
        changed: bool,
        loaded_at: DateTime<Utc>,
        /// Parse issues worth surfacing, one line each.
        warnings: Vec<String>,
    },
    Failed {
        error: String,
    },
}

/// Everything the worker needs to (re)load and evaluate.
pub struct LoadJob<F> {
    pub loader: FallbackLoader<F>,
    pub factors: SourcePair,
    pub equities: SourcePair,
    pub config: StrengthConfig,
}

impl<F: TableFetcher> LoadJob<F> {
    /// One reload against the shared cache.
    pub fn run(&self, cache: &SnapshotCache) -> WorkerResponse {
        let refresh = match cache.refresh(&self.loader, &self.factors, &self.equities) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "reload failed");
                return WorkerResponse::Failed {
                    error: e.to_string(),
                };
            }
        };

        let snapshot = refresh.snapshot;
        let warnings = [&snapshot.factors, &snapshot.equities]
            .into_iter()
            .filter(|t| !t.report.is_clean())
            .map(|t| {
                format!(
                    "{}: {} bad-date rows, {} duplicate dates, {} non-numeric cells",
                    t.table.name(),
                    t.report.dropped_rows.len(),
                    t.report.duplicate_dates,
                    t.report.non_numeric_cells
                )
            })
            .collect();

        match snapshot.evaluate(&self.config) {
            Ok(evaluation) => WorkerResponse::Loaded {
                evaluation: Box::new(evaluation),
                changed: refresh.changed,
                loaded_at: snapshot.loaded_at,
                warnings,
            },
            Err(e) => {
                tracing::warn!(error = %e, "evaluation failed");
                WorkerResponse::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Spawn the loader thread. It performs one load immediately.
pub fn spawn_worker<F: TableFetcher + 'static>(
    job: LoadJob<F>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("relstrength-loader".into())
        .spawn(move || worker_loop(job, rx, tx))
}

fn worker_loop<F: TableFetcher>(
    job: LoadJob<F>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) {
    let cache = SnapshotCache::new();
    if tx.send(job.run(&cache)).is_err() {
        return;
    }

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Reload) => {
                if tx.send(job.run(&cache)).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relstrength_runner::{FetchError, TableSource};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};

    /// Serves fixed tables until `fail` is set.
    struct Fixed {
        fail: Arc<AtomicBool>,
    }

    impl TableFetcher for Fixed {
        fn fetch_text(&self, source: &TableSource) -> Result<String, FetchError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(FetchError::HttpStatus {
                    url: source.to_string(),
                    status: 503,
                });
            }
            let body = match source.to_string().as_str() {
                "f.csv" => "Date,HSI,Fused_macro\n2024-01-02,1,0\n2024-01-03,2,1\n2024-01-04,3,0.4\n",
                _ => "Date,A,C\n2024-01-02,3,1\n2024-01-03,2,2\n2024-01-04,1,3\n",
            };
            Ok(body.to_string())
        }
    }

    fn job(fail: Arc<AtomicBool>) -> LoadJob<Fixed> {
        LoadJob {
            loader: FallbackLoader::new(Fixed { fail }, "Date"),
            factors: SourcePair::new("f.csv"),
            equities: SourcePair::new("e.csv"),
            config: StrengthConfig {
                factor_columns: vec!["HSI".into()],
                window: 3,
                ..Default::default()
            },
        }
    }

    #[test]
    fn loads_on_start_and_on_reload() {
        let fail = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let handle = spawn_worker(job(Arc::clone(&fail)), cmd_rx, resp_tx).unwrap();

        match resp_rx.recv().unwrap() {
            WorkerResponse::Loaded {
                evaluation,
                changed,
                warnings,
                ..
            } => {
                assert!(changed);
                assert!(warnings.is_empty());
                assert_eq!(evaluation.strong, vec!["C".to_string()]);
            }
            other => panic!("expected Loaded, got {other:?}"),
        }

        cmd_tx.send(WorkerCommand::Reload).unwrap();
        match resp_rx.recv().unwrap() {
            WorkerResponse::Loaded { changed, .. } => assert!(!changed),
            other => panic!("expected Loaded, got {other:?}"),
        }

        fail.store(true, Ordering::Relaxed);
        cmd_tx.send(WorkerCommand::Reload).unwrap();
        match resp_rx.recv().unwrap() {
            WorkerResponse::Failed { error } => assert!(error.contains("f.csv")),
            other => panic!("expected Failed, got {other:?}"),
        }

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
