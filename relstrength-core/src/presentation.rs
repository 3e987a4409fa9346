//! Presentation contract: what a chart front-end receives and how it reports toggles.
//!
//! The core never draws. A front-end implements [`PresentationAdapter`]; the
//! caller builds a [`ChartFrame`] from an [`Evaluation`] and the current
//! [`ViewOptions`], hands it to `render`, and applies every [`Toggle`] the
//! adapter reports back through its registered callbacks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{StrengthLabel, Verdict};
use crate::pipeline::Evaluation;

/// Visibility switches exposed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Show the factor series as a group.
    pub show_factors: bool,
    /// Show only equities labelled strong.
    pub strong_only: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            show_factors: true,
            strong_only: false,
        }
    }
}

impl ViewOptions {
    pub fn apply(&mut self, toggle: Toggle) {
        match toggle {
            Toggle::Factors => self.show_factors = !self.show_factors,
            Toggle::StrongOnly => self.strong_only = !self.strong_only,
        }
    }
}

/// A user toggle reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    Factors,
    StrongOnly,
}

pub type ToggleCallback = Box<dyn FnMut(Toggle) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesGroup {
    Benchmark,
    Factor,
    Equity,
}

/// One line on the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSeries<'a> {
    pub name: &'a str,
    pub group: SeriesGroup,
    pub values: &'a [Option<f64>],
    /// Present for equities only.
    pub label: Option<StrengthLabel>,
    pub verdict: Option<&'a Verdict>,
}

/// Everything a front-end needs for one redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame<'a> {
    pub dates: &'a [NaiveDate],
    pub series: Vec<ChartSeries<'a>>,
    /// Strong names in enumeration order, regardless of visibility.
    pub strong: &'a [String],
}

impl<'a> ChartFrame<'a> {
    /// Select the visible series. The benchmark is always shown.
    pub fn build(evaluation: &'a Evaluation, options: &ViewOptions) -> Self {
        let mut series = vec![ChartSeries {
            name: evaluation.benchmark.name(),
            group: SeriesGroup::Benchmark,
            values: evaluation.benchmark.values(),
            label: None,
            verdict: None,
        }];

        if options.show_factors {
            series.extend(
                evaluation
                    .factors
                    .iter()
                    .filter(|f| f.name() != evaluation.benchmark.name())
                    .map(|f| ChartSeries {
                        name: f.name(),
                        group: SeriesGroup::Factor,
                        values: f.values(),
                        label: None,
                        verdict: None,
                    }),
            );
        }

        series.extend(
            evaluation
                .equities
                .iter()
                .filter(|e| !options.strong_only || e.verdict.label.is_strong())
                .map(|e| ChartSeries {
                    name: e.series.name(),
                    group: SeriesGroup::Equity,
                    values: e.series.values(),
                    label: Some(e.verdict.label),
                    verdict: Some(&e.verdict),
                }),
        );

        Self {
            dates: &evaluation.dates,
            series,
            strong: &evaluation.strong,
        }
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.series.iter().map(|s| s.name).collect()
    }

    /// Verdict of a visible equity.
    pub fn verdict(&self, name: &str) -> Option<&'a Verdict> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.verdict)
    }
}

/// A chart front-end.
pub trait PresentationAdapter {
    type Error;

    /// Draw the given series under the given options.
    fn render(&mut self, frame: &ChartFrame<'_>, options: &ViewOptions) -> Result<(), Self::Error>;

    /// Register a callback invoked for every user toggle.
    fn on_toggle(&mut self, callback: ToggleCallback);
}
