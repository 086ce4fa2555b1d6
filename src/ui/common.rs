//! Common UI components shared across views.
//!
//! This module contains the header bar, status bar, help overlay and the
//! number/time formatting used by the table and the charts.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::Severity;

/// Render the header bar with store totals.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(" PERFMON ", Style::default().add_modifier(Modifier::BOLD));

    let table = app.dashboard.table();
    if table.is_empty() {
        let line = Line::from(vec![
            title,
            Span::raw(format!("│ {} │ Loading...", app.source_description())),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let warnings = table
        .rows
        .iter()
        .flat_map(|r| &r.cells)
        .filter(|c| c.severity == Severity::Warning)
        .count();

    let warning_span = if warnings > 0 {
        Span::styled(
            format!("{}", warnings),
            app.theme.severity_style(Severity::Warning),
        )
    } else {
        Span::styled("0", Style::default().add_modifier(Modifier::DIM))
    };

    let line = Line::from(vec![
        title,
        Span::raw("│ "),
        Span::styled(
            format!("{}", app.store.hosts().len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" hosts "),
        Span::styled(
            format!("{}", table.rows.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" procs "),
        Span::raw(format!("{} attrs │ ", table.columns.len())),
        warning_span,
        Span::raw(" warn │ "),
        Span::raw(format!("{} points │ ", format_count(table.points as u64))),
        Span::raw(app.source_description().to_string()),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows the full names behind the selected cell, time since the last
/// update and the controls. Temporary messages and errors take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(" Error: {} | r:retry q:quit", err))
            .style(Style::default().fg(app.theme.error));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = match (app.dashboard.selected_key(), app.last_updated) {
        (Some(key), Some(updated)) => {
            let value = app
                .store
                .series(&key)
                .and_then(|s| s.latest_value())
                .filter(|v| !v.is_nan())
                .map(format_value)
                .unwrap_or_else(|| "-".to_string());
            format!(
                " {} / {} / {} = {} | Updated {:.1}s ago | Enter:chart x:close ?:help q:quit",
                key.host,
                key.process,
                key.attr,
                value,
                updated.elapsed().as_secs_f64(),
            )
        }
        _ => " Loading... | q:quit".to_string(),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Table"),
        Line::from("  ↑/↓ j/k     Select row"),
        Line::from("  ←/→ h/l     Select column"),
        Line::from("  PgUp/PgDn   Jump 10 rows"),
        Line::from("  Home/End    First/last row"),
        Line::from("  Enter       Chart selected cell"),
        Line::from(""),
        section(" Charts"),
        Line::from("  Tab         Focus next chart"),
        Line::from("  Shift-Tab   Focus previous chart"),
        Line::from("  x           Close focused chart"),
        Line::from("  X           Close all charts"),
        Line::from(""),
        section(" General"),
        Line::from("  r         Poll now"),
        Line::from("  e         Export table to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 40u16.min(area.width.saturating_sub(4));
    let help_height = 24u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Render the notice shown when the terminal is below the minimum size.
pub fn render_too_small(frame: &mut Frame, area: Rect, min_width: u16, min_height: u16) {
    let msg = format!(
        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
        area.width, area.height, min_width, min_height
    );
    let paragraph = Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(paragraph, notice_area(area));
}

/// Five rows centred vertically, clamped to the area.
fn notice_area(area: Rect) -> Rect {
    let height = area.height.min(5);
    let y = area.y + (area.height / 2).saturating_sub(2).min(area.height - height);
    Rect::new(area.x, y, area.width, height)
}

/// Format a cell value: integers as-is, otherwise two decimals (one above 100).
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else if value.abs() >= 100.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Wall-clock `HH:MM:SS` (UTC) for a time in epoch seconds.
pub fn format_clock(secs: i64) -> String {
    let day = secs.rem_euclid(86_400);
    format!("{:02}:{:02}:{:02}", day / 3600, (day % 3600) / 60, day % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.7), "0.70");
        assert_eq!(format_value(1234.56), "1234.6");
        assert_eq!(format_value(f64::INFINITY), "inf");
    }

    #[test]
    fn test_notice_area_fits_tiny_terminals() {
        assert_eq!(notice_area(Rect::new(0, 0, 80, 24)), Rect::new(0, 10, 80, 5));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 3)), Rect::new(0, 0, 40, 3));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 1)), Rect::new(0, 0, 40, 1));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 0)), Rect::new(0, 0, 40, 0));
        assert_eq!(notice_area(Rect::new(0, 0, 40, 6)), Rect::new(0, 1, 40, 5));
    }

    #[test]
    fn test_too_small_notice_renders_in_two_rows() {
        let backend = ratatui::backend::TestBackend::new(30, 2);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_too_small(frame, frame.area(), 60, 12))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let first: String = (0..30u16).map(|x| buffer[(x, 0u16)].symbol()).collect();
        assert!(first.contains("Terminal too small: 30x2"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234), "1.2K");
        assert_eq!(format_count(1_234_567), "1.2M");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(1_700_000_000), "22:13:20");
        assert_eq!(format_clock(-1), "23:59:59");
    }
}
