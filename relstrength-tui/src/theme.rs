//! Neon-on-charcoal palette.
//!
//! - **Accent**: electric cyan, the benchmark line and focus
//! - **Positive**: neon green, strong equities
//! - **Negative**: hot pink, equities that are not strong
//! - **Muted**: steel blue, axes and secondary text

use ratatui::style::{Color, Modifier, Style};

use relstrength_core::{SeriesGroup, StrengthLabel};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub neutral: Color,
    pub muted: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    /// Cycled across factor lines.
    pub factor_palette: [Color; 4],
}

impl Default for Theme {
    fn default() -> Self {
        Self::neon()
    }
}

impl Theme {
    pub fn neon() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 140, 0),
            neutral: Color::Rgb(147, 112, 219),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
            text_secondary: Color::Rgb(170, 170, 170),
            factor_palette: [
                Color::Rgb(147, 112, 219),
                Color::Rgb(255, 215, 0),
                Color::Rgb(135, 206, 250),
                Color::Rgb(240, 128, 128),
            ],
        }
    }

    pub fn label_color(&self, label: &StrengthLabel) -> Color {
        match label {
            StrengthLabel::Strong => self.positive,
            StrengthLabel::NotStrong => self.negative,
            StrengthLabel::Undetermined { .. } => self.text_secondary,
        }
    }

    /// Line color for a series. `index` counts factors only.
    pub fn series_color(
        &self,
        group: SeriesGroup,
        label: Option<&StrengthLabel>,
        index: usize,
    ) -> Color {
        match (group, label) {
            (SeriesGroup::Benchmark, _) => self.accent,
            (SeriesGroup::Factor, _) => self.factor_palette[index % self.factor_palette.len()],
            (SeriesGroup::Equity, Some(l)) => self.label_color(l),
            (SeriesGroup::Equity, None) => self.text_secondary,
        }
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn on_off(&self, on: bool) -> Style {
        if on {
            Style::default().fg(self.positive)
        } else {
            Style::default().fg(self.text_secondary)
        }
    }
}
