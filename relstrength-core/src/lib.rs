//! relstrength core: tables, normalization, momentum, ranking, strength classification.
//!
//! This crate contains the analytical pipeline:
//! - Domain types (date-indexed tables, series, normalized series)
//! - Min-max normalizer
//! - Rolling-window OLS momentum estimator
//! - Quantile ranking with a reproducible tie-break
//! - Strength classification against a fused benchmark
//! - Orchestration with strict table alignment
//! - Presentation contract (view toggles, adapter trait)
//!
//! Everything here is pure and synchronous. Retrieval and parsing of the input
//! tables live in `relstrength-runner`.

pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod momentum;
pub mod normalize;
pub mod pipeline;
pub mod presentation;
pub mod rank;

pub use classify::{
    Candidate, StrengthClassifier, StrengthLabel, StrengthReport, Thresholds, UndeterminedReason,
    Verdict,
};
pub use config::{ConfigError, StrengthConfig};
pub use domain::{Column, NormalizedSeries, Series, Table, TableError, TableSummary};
pub use error::{AlignmentMismatch, CoreError};
pub use momentum::{InsufficientData, MomentumEstimator, DEFAULT_WINDOW};
pub use normalize::normalize;
pub use pipeline::{check_alignment, evaluate, EquityStrength, Evaluation};
pub use presentation::{
    ChartFrame, ChartSeries, PresentationAdapter, SeriesGroup, Toggle, ToggleCallback,
    ViewOptions,
};
pub use rank::quantile_ranks;
