//! Application state: single-owner, main-thread only.
//!
//! The loader worker hands over finished evaluations through a channel; the
//! adapter reports toggles through another. Both are drained here.

use chrono::{DateTime, Utc};
use relstrength_core::{ChartFrame, Evaluation, Toggle, ViewOptions};

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub level: StatusLevel,
}

pub struct App {
    pub running: bool,
    pub options: ViewOptions,
    pub evaluation: Option<Evaluation>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// True while a reload is in flight.
    pub loading: bool,
    pub status: Option<Status>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

impl App {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            running: true,
            options,
            evaluation: None,
            loaded_at: None,
            loading: false,
            status: None,
        }
    }

    pub fn apply_toggle(&mut self, toggle: Toggle) {
        self.options.apply(toggle);
        let msg = match toggle {
            Toggle::Factors if self.options.show_factors => "Factors shown",
            Toggle::Factors => "Factors hidden",
            Toggle::StrongOnly if self.options.strong_only => "Showing strong equities only",
            Toggle::StrongOnly => "Showing all equities",
        };
        self.set_status(msg);
    }

    /// Install a finished evaluation. An unchanged reload keeps the old one.
    pub fn set_evaluation(&mut self, evaluation: Evaluation, changed: bool, at: DateTime<Utc>) {
        self.loading = false;
        self.loaded_at = Some(at);
        if changed || self.evaluation.is_none() {
            let strong = evaluation.strong.len();
            let tracked = evaluation.equities.len();
            self.evaluation = Some(evaluation);
            self.set_status(format!("Loaded: {strong} of {tracked} equities strong"));
        } else {
            self.set_status("Reloaded: no changes");
        }
    }

    /// A failed load keeps whatever was on screen.
    pub fn load_failed(&mut self, error: String) {
        self.loading = false;
        self.status = Some(Status {
            message: error,
            level: StatusLevel::Error,
        });
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            level: StatusLevel::Info,
        });
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            level: StatusLevel::Warning,
        });
    }

    pub fn frame(&self) -> Option<ChartFrame<'_>> {
        self.evaluation
            .as_ref()
            .map(|e| ChartFrame::build(e, &self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::evaluation;

    #[test]
    fn starts_with_everything_visible() {
        let app = App::default();
        assert!(app.running);
        assert!(app.options.show_factors);
        assert!(!app.options.strong_only);
        assert!(app.frame().is_none());
    }

    #[test]
    fn toggles_change_the_frame() {
        let mut app = App::default();
        app.set_evaluation(evaluation(), true, Utc::now());
        assert_eq!(
            app.frame().unwrap().names(),
            vec!["Fused_macro", "HSI", "A", "C"]
        );

        app.apply_toggle(Toggle::Factors);
        assert_eq!(app.frame().unwrap().names(), vec!["Fused_macro", "A", "C"]);
        assert_eq!(app.status.as_ref().unwrap().message, "Factors hidden");

        app.apply_toggle(Toggle::StrongOnly);
        assert_eq!(app.frame().unwrap().names(), vec!["Fused_macro", "C"]);

        app.apply_toggle(Toggle::Factors);
        app.apply_toggle(Toggle::StrongOnly);
        assert_eq!(app.options, ViewOptions::default());
    }

    #[test]
    fn failed_reload_keeps_previous_evaluation() {
        let mut app = App::default();
        app.set_evaluation(evaluation(), true, Utc::now());
        app.loading = true;
        app.load_failed("factors: HTTP 503".into());
        assert!(!app.loading);
        assert!(app.evaluation.is_some());
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn unchanged_reload_reports_no_changes() {
        let mut app = App::default();
        app.set_evaluation(evaluation(), true, Utc::now());
        app.set_evaluation(evaluation(), false, Utc::now());
        assert_eq!(app.status.as_ref().unwrap().message, "Reloaded: no changes");
        assert!(app.loaded_at.is_some());
    }
}
