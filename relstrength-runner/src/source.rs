//! Where a table comes from.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum TableSource {
    Http(String),
    File(PathBuf),
}

impl TableSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, TableSource::Http(_))
    }
}

impl FromStr for TableSource {
    type Err = std::convert::Infallible;

    /// `http://` and `https://` locations are remote; anything else is a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(TableSource::Http(s.to_string()))
        } else {
            Ok(TableSource::File(PathBuf::from(s)))
        }
    }
}

impl From<&str> for TableSource {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::Http(url) => f.write_str(url),
            TableSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Primary location plus an optional fallback tried when the primary fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePair {
    pub primary: TableSource,
    pub fallback: Option<TableSource>,
}

impl SourcePair {
    pub fn new(primary: impl Into<TableSource>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<TableSource>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

/// Retry behaviour for remote fetches.
///
/// Attempt `k` (0-based) that fails sleeps `backoff_step · (k + 1)` before the
/// next one; the last attempt does not sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_step: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_step: Duration::from_secs(2),
            timeout: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt`, or `None` after the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.attempts {
            None
        } else {
            Some(self.backoff_step * (attempt + 1))
        }
    }

    /// No sleeping between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            backoff_step: Duration::ZERO,
            ..Self::default()
        }
    }
}
