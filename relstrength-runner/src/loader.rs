//! Table retrieval with a primary/fallback policy.
//!
//! For each table:
//! 1. Fetch and parse the primary source → use it
//! 2. On any failure, fetch and parse the fallback source (if configured)
//! 3. If both fail → `RetrievalFailure` carrying both causes
//!
//! Remote fetches retry per [`RetryPolicy`]; a response that does not look
//! like CSV (an HTML login page, say) counts as a failed attempt.

use std::path::PathBuf;

use relstrength_core::Table;
use serde::Serialize;
use thiserror::Error;

use crate::csv_table::{parse_table, ParseError, ParseReport};
use crate::source::{RetryPolicy, SourcePair, TableSource};

/// Errors from fetching raw text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("response from {url} is not CSV (content-type={content_type:?}, head={head:?})")]
    NotCsv {
        url: String,
        content_type: String,
        head: String,
    },

    #[error("read {path}: {cause}")]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("HTTP client: {0}")]
    Client(String),
}

/// Errors from the loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch {location}: {cause}")]
    Fetch {
        location: String,
        #[source]
        cause: FetchError,
    },

    #[error("parse {location}: {cause}")]
    Parse {
        location: String,
        #[source]
        cause: ParseError,
    },

    #[error("retrieval failed for {table}: primary: {primary}; fallback: {fallback}")]
    RetrievalFailure {
        table: String,
        primary: Box<LoadError>,
        fallback: Box<LoadError>,
    },
}

/// Fetches the raw text behind a [`TableSource`].
///
/// Abstracted so tests can serve tables from memory.
pub trait TableFetcher: Send + Sync {
    fn fetch_text(&self, source: &TableSource) -> Result<String, FetchError>;
}

/// Local files from disk, URLs over blocking HTTP with retry.
pub struct DefaultFetcher {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl DefaultFetcher {
    pub fn new(retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(retry.timeout)
            .user_agent(concat!("relstrength/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, retry })
    }

    fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..self.retry.attempts.max(1) {
            match self.try_once(url) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::debug!(url, attempt, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                }
            }
            if let Some(delay) = self.retry.delay_after(attempt) {
                std::thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::NetworkUnreachable(url.to_string())))
    }

    fn try_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let text = resp
            .text()
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        if looks_like_csv(&content_type, &text) {
            Ok(text)
        } else {
            Err(FetchError::NotCsv {
                url: url.to_string(),
                content_type,
                head: text.chars().take(60).collect(),
            })
        }
    }
}

impl TableFetcher for DefaultFetcher {
    fn fetch_text(&self, source: &TableSource) -> Result<String, FetchError> {
        match source {
            TableSource::Http(url) => self.fetch_with_retry(url),
            TableSource::File(path) => {
                std::fs::read_to_string(path).map_err(|cause| FetchError::Io {
                    path: path.clone(),
                    cause,
                })
            }
        }
    }
}

/// A CSV content type, or a body whose first line is a comma-separated header
/// and not markup.
pub fn looks_like_csv(content_type: &str, body: &str) -> bool {
    if content_type.contains("text/csv") {
        return true;
    }
    let first = body
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty());
    match first {
        Some(line) => !line.starts_with('<') && line.contains(','),
        None => false,
    }
}

/// Which source a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Primary,
    Fallback,
}

/// A parsed table plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub origin: Origin,
    pub location: String,
    pub report: ParseReport,
}

/// Loads tables through a [`TableFetcher`], applying the fallback policy.
pub struct FallbackLoader<F> {
    fetcher: F,
    date_column: String,
}

impl<F: TableFetcher> FallbackLoader<F> {
    pub fn new(fetcher: F, date_column: impl Into<String>) -> Self {
        Self {
            fetcher,
            date_column: date_column.into(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and parse one source, without fallback.
    pub fn load_source(
        &self,
        name: &str,
        source: &TableSource,
    ) -> Result<(Table, ParseReport), LoadError> {
        let location = source.to_string();
        let text = self
            .fetcher
            .fetch_text(source)
            .map_err(|cause| LoadError::Fetch {
                location: location.clone(),
                cause,
            })?;
        parse_table(name, &text, &self.date_column)
            .map_err(|cause| LoadError::Parse { location, cause })
    }

    /// Load one table, falling back to the secondary source on any failure.
    pub fn load(&self, name: &str, sources: &SourcePair) -> Result<LoadedTable, LoadError> {
        let primary_err = match self.load_source(name, &sources.primary) {
            Ok((table, report)) => {
                return Ok(LoadedTable {
                    table,
                    origin: Origin::Primary,
                    location: sources.primary.to_string(),
                    report,
                })
            }
            Err(e) => e,
        };

        let Some(fallback) = &sources.fallback else {
            return Err(primary_err);
        };

        tracing::warn!(
            table = name,
            primary = %sources.primary,
            fallback = %fallback,
            error = %primary_err,
            "primary source failed, trying fallback"
        );

        match self.load_source(name, fallback) {
            Ok((table, report)) => Ok(LoadedTable {
                table,
                origin: Origin::Fallback,
                location: fallback.to_string(),
                report,
            }),
            Err(fallback_err) => Err(LoadError::RetrievalFailure {
                table: name.to_string(),
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            }),
        }
    }

    /// Load the factor and equity tables concurrently.
    pub fn load_pair(
        &self,
        factors: &SourcePair,
        equities: &SourcePair,
    ) -> Result<(LoadedTable, LoadedTable), LoadError> {
        let (f, e) = std::thread::scope(|s| {
            let f = s.spawn(|| self.load("factors", factors));
            let e = s.spawn(|| self.load("equities", equities));
            (join(f), join(e))
        });
        Ok((f?, e?))
    }
}

fn join<T>(handle: std::thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
