//! Plain-text presentation of an evaluation.

use std::io::{self, Write};

use relstrength_core::{
    ChartFrame, PresentationAdapter, SeriesGroup, StrengthLabel, Toggle, ToggleCallback,
    ViewOptions,
};

/// Writes one table per render: visible series, their latest level, and the
/// verdict columns for equities.
pub struct TextAdapter<W> {
    out: W,
    callbacks: Vec<ToggleCallback>,
}

impl<W: Write> TextAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            callbacks: Vec::new(),
        }
    }

    /// Report a toggle to every registered callback.
    pub fn toggle(&mut self, toggle: Toggle) {
        for cb in &mut self.callbacks {
            cb(toggle);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationAdapter for TextAdapter<W> {
    type Error = io::Error;

    fn render(&mut self, frame: &ChartFrame<'_>, options: &ViewOptions) -> io::Result<()> {
        let w = &mut self.out;
        let latest = frame
            .dates
            .last()
            .map_or_else(|| "n/a".to_string(), ToString::to_string);

        writeln!(w)?;
        writeln!(w, "=== Relative Strength @ {latest} ===")?;
        writeln!(
            w,
            "Rows: {}   factors: {}   filter: {}",
            frame.dates.len(),
            if options.show_factors { "shown" } else { "hidden" },
            if options.strong_only { "strong only" } else { "all" },
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<14} {:<10} {:>8} {:>10} {:>6} {:>9}  {}",
            "series", "group", "level", "momentum", "rank", "vs bench", "label"
        )?;
        writeln!(w, "{}", "-".repeat(76))?;

        for s in &frame.series {
            let level = fmt_opt(s.values.last().copied().flatten(), 3);
            let group = match s.group {
                SeriesGroup::Benchmark => "benchmark",
                SeriesGroup::Factor => "factor",
                SeriesGroup::Equity => "equity",
            };
            match (s.group, frame.verdict(s.name)) {
                (SeriesGroup::Equity, Some(v)) => writeln!(
                    w,
                    "{:<14} {:<10} {:>8} {:>10} {:>6} {:>9}  {}",
                    s.name,
                    group,
                    level,
                    fmt_opt(v.momentum, 4),
                    fmt_opt(v.rank, 2),
                    fmt_opt(v.relative_level, 3),
                    describe(&v.label),
                )?,
                _ => writeln!(w, "{:<14} {:<10} {:>8}", s.name, group, level)?,
            }
        }

        writeln!(w)?;
        if frame.strong.is_empty() {
            writeln!(w, "Strong: none")?;
        } else {
            writeln!(w, "Strong: {}", frame.strong.join(", "))?;
        }
        w.flush()
    }

    fn on_toggle(&mut self, callback: ToggleCallback) {
        self.callbacks.push(callback);
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "-".to_string(),
    }
}

fn describe(label: &StrengthLabel) -> String {
    match label {
        StrengthLabel::Undetermined { reason } => format!("undetermined ({reason})"),
        other => other.as_str().to_string(),
    }
}
