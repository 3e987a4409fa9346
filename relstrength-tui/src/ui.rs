//! Layout: chart on top, verdict table below, one-line status bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Dataset, GraphType, LegendPosition, Paragraph, Row, Table,
};
use ratatui::Frame;

use relstrength_core::{ChartFrame, SeriesGroup, StrengthLabel, ViewOptions};

use crate::app::{Status, StatusLevel};
use crate::input::HINTS;
use crate::theme::Theme;

/// Draw one full screen.
pub fn draw(
    f: &mut Frame,
    frame: &ChartFrame<'_>,
    options: &ViewOptions,
    status: Option<&Status>,
    theme: &Theme,
) {
    let equities = frame
        .series
        .iter()
        .filter(|s| s.group == SeriesGroup::Equity)
        .count() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length((equities + 3).min(14)),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_chart(f, chunks[0], frame, options, theme);
    draw_verdicts(f, chunks[1], frame, theme);
    draw_status(f, chunks[2], status, theme);
}

/// Placeholder shown before the first evaluation arrives.
pub fn draw_message(f: &mut Frame, message: &str, status: Option<&Status>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let block = panel(" Relative Strength ", theme);
    let para = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.muted())),
    ])
    .block(block);
    f.render_widget(para, chunks[0]);
    draw_status(f, chunks[1], status, theme);
}

fn panel<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.muted))
        .title(title)
        .title_style(theme.title())
}

fn draw_chart(
    f: &mut Frame,
    area: Rect,
    frame: &ChartFrame<'_>,
    options: &ViewOptions,
    theme: &Theme,
) {
    // Points per series; absent values are skipped.
    let points: Vec<Vec<(f64, f64)>> = frame
        .series
        .iter()
        .map(|s| {
            s.values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|y| (i as f64, y)))
                .collect()
        })
        .collect();

    let (y_min, y_max) = y_bounds(&points);
    let x_max = frame.dates.len().saturating_sub(1) as f64;

    let mut factor_index = 0;
    let datasets: Vec<Dataset> = frame
        .series
        .iter()
        .zip(&points)
        .map(|(s, data)| {
            let color = theme.series_color(s.group, s.label.as_ref(), factor_index);
            if s.group == SeriesGroup::Factor {
                factor_index += 1;
            }
            Dataset::default()
                .name(s.name.to_string())
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(color))
                .graph_type(GraphType::Line)
                .data(data)
        })
        .collect();

    let first = frame.dates.first().map(ToString::to_string).unwrap_or_default();
    let last = frame.dates.last().map(ToString::to_string).unwrap_or_default();
    let title = format!(
        " Relative Strength @ {last}   factors:{}  filter:{} ",
        if options.show_factors { "on" } else { "off" },
        if options.strong_only { "strong" } else { "all" },
    );

    let chart = Chart::new(datasets)
        .block(panel(&title, theme))
        .legend_position(Some(LegendPosition::TopLeft))
        .hidden_legend_constraints((Constraint::Percentage(40), Constraint::Percentage(60)))
        .x_axis(
            Axis::default()
                .style(theme.muted())
                .bounds([0.0, x_max.max(1.0)])
                .labels(vec![
                    Span::styled(first, theme.muted()),
                    Span::styled(last, theme.muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("normalized", theme.muted()))
                .style(theme.muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format!("{y_min:.2}"), theme.muted()),
                    Span::styled(format!("{y_max:.2}"), theme.muted()),
                ]),
        );

    f.render_widget(chart, area);
}

/// Bounds over every plotted point, padded by 5%. Normalized series sit in [0, 1].
fn y_bounds(points: &[Vec<(f64, f64)>]) -> (f64, f64) {
    let (lo, hi) = points
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let padding = ((hi - lo).abs() * 0.05).max(0.01);
    (lo - padding, hi + padding)
}

fn draw_verdicts(f: &mut Frame, area: Rect, frame: &ChartFrame<'_>, theme: &Theme) {
    let header = Row::new(["equity", "level", "momentum", "rank", "vs bench", "label"])
        .style(theme.title());

    let rows: Vec<Row> = frame
        .series
        .iter()
        .filter_map(|s| s.verdict.map(|v| (s, v)))
        .map(|(s, v)| {
            let level = s.values.last().copied().flatten();
            let label = match v.label {
                StrengthLabel::Undetermined { reason } => format!("undetermined: {reason}"),
                other => other.as_str().to_string(),
            };
            Row::new(vec![
                Cell::from(s.name.to_string()),
                Cell::from(fmt_opt(level, 3)),
                Cell::from(fmt_opt(v.momentum, 4)),
                Cell::from(fmt_opt(v.rank, 2)),
                Cell::from(fmt_opt(v.relative_level, 3)),
                Cell::from(label).style(Style::default().fg(theme.label_color(&v.label))),
            ])
        })
        .collect();

    let strong = if frame.strong.is_empty() {
        " Strong: none ".to_string()
    } else {
        format!(" Strong: {} ", frame.strong.join(", "))
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(panel(&strong, theme));

    f.render_widget(table, area);
}

fn draw_status(f: &mut Frame, area: Rect, status: Option<&Status>, theme: &Theme) {
    let mut spans = vec![Span::styled(HINTS, theme.muted())];
    if let Some(s) = status {
        let color = match s.level {
            StatusLevel::Info => theme.accent,
            StatusLevel::Warning => theme.warning,
            StatusLevel::Error => theme.negative,
        };
        spans.push(Span::raw("| "));
        spans.push(Span::styled(s.message.as_str(), Style::default().fg(color)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "-".to_string(),
    }
}
