//! relstrength TUI: terminal chart of the benchmark, factors and tracked equities.
//!
//! - Chart of every visible series with its strength color
//! - Verdict table: level, momentum, rank, distance to benchmark, label
//! - Toggles for the factor group and the strong-only filter
//! - Reload on demand from a background loader thread

pub mod adapter;
pub mod app;
pub mod input;
pub mod theme;
pub mod ui;
pub mod worker;

pub use adapter::TerminalAdapter;
pub use app::App;
pub use theme::Theme;

#[cfg(test)]
mod test_support;
