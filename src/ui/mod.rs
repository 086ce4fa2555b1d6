//! UI rendering modules for the TUI.
//!
//! Each view implements [`View`]; series viewers additionally implement
//! [`LiveView`] so the store can push points into them.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    Frame,
};

use crate::app::App;
use crate::data::{SeriesObserver, Store};

pub mod common;
pub mod dashboard;
pub mod theme;
pub mod viewer;

pub use dashboard::{DashboardCell, DashboardRow, DashboardTable, DashboardView, TableHit};
pub use theme::Theme;
pub use viewer::{AppendMode, SeriesViewer, ViewerOptions};

/// Charts shown side by side below the table.
pub const MAX_VISIBLE_VIEWERS: usize = 3;

/// Per-frame rendering inputs shared by all views.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub theme: &'a Theme,
    /// Whether this view currently has input focus.
    pub focused: bool,
}

/// Something that draws itself into an area.
pub trait View {
    fn render(&self, frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>);
}

/// A view fed by a series as points arrive.
pub trait LiveView: View + SeriesObserver {
    /// Stop observing and release rendering state.
    fn close(&mut self, store: &mut Store);
}

/// Screen regions for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub dashboard: Rect,
    /// (viewer index, area) for each visible chart.
    pub viewers: Vec<(usize, Rect)>,
    pub status: Rect,
}

/// Split the terminal into header, table, charts and status bar.
///
/// At most [`MAX_VISIBLE_VIEWERS`] charts are shown, a window that always
/// contains the focused one.
pub fn screen_layout(area: Rect, viewer_count: usize, focused: usize) -> ScreenLayout {
    let [header, content, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(6),
        Constraint::Length(1),
    ])
    .areas(area);

    if viewer_count == 0 {
        return ScreenLayout {
            header,
            dashboard: content,
            viewers: Vec::new(),
            status,
        };
    }

    let [dashboard, charts] =
        Layout::vertical([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(content);

    let shown = viewer_count.min(MAX_VISIBLE_VIEWERS);
    let start = focused
        .min(viewer_count - 1)
        .saturating_sub(shown - 1)
        .min(viewer_count - shown);
    let columns = Layout::horizontal(vec![Constraint::Ratio(1, shown as u32); shown]).split(charts);

    ScreenLayout {
        header,
        dashboard,
        viewers: (start..start + shown).zip(columns.iter().copied()).collect(),
        status,
    }
}

/// Draw one full frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let layout = screen_layout(frame.area(), app.viewers.len(), app.focused_viewer);

    common::render_header(frame, app, layout.header);

    let ctx = ViewContext {
        theme: &app.theme,
        focused: app.viewers.is_empty(),
    };
    app.dashboard.render(frame, layout.dashboard, &ctx);

    for (idx, area) in &layout.viewers {
        let ctx = ViewContext {
            theme: &app.theme,
            focused: *idx == app.focused_viewer,
        };
        app.viewers[*idx].borrow().render(frame, *area, &ctx);
    }

    common::render_status_bar(frame, app, layout.status);

    if app.show_help {
        common::render_help(frame, app, frame.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_viewers() {
        let layout = screen_layout(Rect::new(0, 0, 100, 30), 0, 0);
        assert_eq!(layout.header.height, 1);
        assert_eq!(layout.status.y, 29);
        assert_eq!(layout.dashboard.height, 28);
        assert!(layout.viewers.is_empty());
    }

    #[test]
    fn test_layout_window_follows_focus() {
        let area = Rect::new(0, 0, 120, 40);

        let layout = screen_layout(area, 2, 0);
        let shown: Vec<usize> = layout.viewers.iter().map(|(i, _)| *i).collect();
        assert_eq!(shown, vec![0, 1]);

        let layout = screen_layout(area, 5, 0);
        let shown: Vec<usize> = layout.viewers.iter().map(|(i, _)| *i).collect();
        assert_eq!(shown, vec![0, 1, 2]);

        let layout = screen_layout(area, 5, 4);
        let shown: Vec<usize> = layout.viewers.iter().map(|(i, _)| *i).collect();
        assert_eq!(shown, vec![2, 3, 4]);
        assert!(layout.viewers[0].1.y > layout.dashboard.y);
    }
}
