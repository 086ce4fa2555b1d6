//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::Severity;

/// Line colours handed out to series viewers in opening order.
pub const SERIES_COLORS: [Color; 20] = [
    Color::Rgb(0x1f, 0x77, 0xb4),
    Color::Rgb(0xae, 0xc7, 0xe8),
    Color::Rgb(0xff, 0x7f, 0x0e),
    Color::Rgb(0xff, 0xbb, 0x78),
    Color::Rgb(0x2c, 0xa0, 0x2c),
    Color::Rgb(0x98, 0xdf, 0x8a),
    Color::Rgb(0xd6, 0x27, 0x28),
    Color::Rgb(0xff, 0x98, 0x96),
    Color::Rgb(0x94, 0x67, 0xbd),
    Color::Rgb(0xc5, 0xb0, 0xd5),
    Color::Rgb(0x8c, 0x56, 0x4b),
    Color::Rgb(0xc4, 0x9c, 0x94),
    Color::Rgb(0xe3, 0x77, 0xc2),
    Color::Rgb(0xf7, 0xb6, 0xd2),
    Color::Rgb(0x7f, 0x7f, 0x7f),
    Color::Rgb(0xc7, 0xc7, 0xc7),
    Color::Rgb(0xbc, 0xbd, 0x22),
    Color::Rgb(0xdb, 0xdb, 0x8d),
    Color::Rgb(0x17, 0xbe, 0xcf),
    Color::Rgb(0x9e, 0xda, 0xe5),
];

/// Palette colour for the n-th viewer (1-based, wraps after 20).
pub fn series_color(n: u64) -> Color {
    let idx = n.saturating_sub(1) % SERIES_COLORS.len() as u64;
    SERIES_COLORS[idx as usize]
}

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and the focused viewer.
    pub highlight: Color,
    /// Color for warning cells.
    pub warning: Color,
    /// Color for errors in the status bar.
    pub error: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for the selected row.
    pub selected: Style,
    /// Style for the selected cell within the selected row.
    pub selected_cell: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            error: Color::Red,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            selected_cell: Style::default().add_modifier(Modifier::REVERSED),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Rgb(0xb5, 0x89, 0x00),
            error: Color::Red,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            selected_cell: Style::default().add_modifier(Modifier::REVERSED),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for a dashboard cell of the given severity.
    pub fn severity_style(&self, severity: Severity) -> Style {
        match severity {
            Severity::Info => Style::default(),
            Severity::Warning => Style::default().fg(self.warning).add_modifier(Modifier::BOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_color_wraps() {
        assert_eq!(series_color(1), Color::Rgb(0x1f, 0x77, 0xb4));
        assert_eq!(series_color(20), Color::Rgb(0x9e, 0xda, 0xe5));
        assert_eq!(series_color(21), series_color(1));
    }

    #[test]
    fn test_info_cells_are_unstyled() {
        let theme = Theme::dark();
        assert_eq!(theme.severity_style(Severity::Info), Style::default());
        assert_ne!(theme.severity_style(Severity::Warning), Style::default());
    }
}
