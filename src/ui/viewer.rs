//! Live line chart bound to one attribute series.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use super::common::{format_clock, format_value};
use super::theme::series_color;
use super::{LiveView, View, ViewContext};
use crate::bus::SubscriberId;
use crate::data::{AttrSeries, Point, SeriesKey, SeriesObserver, Store};

/// Chart sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Points copied from the series when the viewer opens.
    pub backfill: usize,
    /// Once the chart holds more than this many points, appends shift.
    pub shift_after: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            backfill: 10,
            shift_after: 20,
        }
    }
}

/// How the last point was added to the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Chart grows by one point.
    Animated,
    /// Oldest point dropped to make room; chart length stays fixed.
    ShiftIn,
}

/// A chart panel following one [`AttrSeries`].
///
/// The chart is a display window only. The series keeps its full history
/// whatever the chart drops.
pub struct SeriesViewer {
    id: SubscriberId,
    key: SeriesKey,
    color: Color,
    chart: VecDeque<Point>,
    options: ViewerOptions,
    last_mode: Option<AppendMode>,
    notifications: usize,
    closed: bool,
}

impl SeriesViewer {
    /// Open a viewer on `series`: draw its last points, then attach as its
    /// sole observer.
    pub fn open(series: &mut AttrSeries, options: ViewerOptions) -> Rc<RefCell<SeriesViewer>> {
        let id = SubscriberId::next();
        let mut viewer = SeriesViewer {
            id,
            key: series.key().clone(),
            color: series_color(id.get()),
            chart: VecDeque::with_capacity(options.shift_after + 1),
            options,
            last_mode: None,
            notifications: 0,
            closed: false,
        };
        for point in series.tail(options.backfill) {
            viewer.append(*point);
        }

        let viewer = Rc::new(RefCell::new(viewer));
        let observer: Rc<RefCell<dyn SeriesObserver>> = viewer.clone();
        series.attach(Rc::downgrade(&observer));
        viewer
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn title(&self) -> String {
        self.key.to_string()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Points currently drawn, oldest first.
    pub fn chart(&self) -> impl Iterator<Item = &Point> {
        self.chart.iter()
    }

    pub fn chart_len(&self) -> usize {
        self.chart.len()
    }

    /// Mode used for the most recent point, `None` before any point.
    pub fn last_mode(&self) -> Option<AppendMode> {
        self.last_mode
    }

    /// Live points received since opening, backfill excluded.
    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn append(&mut self, point: Point) {
        let mode = if self.chart.len() > self.options.shift_after {
            AppendMode::ShiftIn
        } else {
            AppendMode::Animated
        };
        if mode == AppendMode::ShiftIn {
            self.chart.pop_front();
        }
        self.chart.push_back(point);
        self.last_mode = Some(mode);
    }

    fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let first = self.chart.front()?;
        let last = self.chart.back()?;

        let (min, max) = self
            .chart
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        let x = if last.time > first.time {
            [first.time as f64, last.time as f64]
        } else {
            [first.time as f64, first.time as f64 + 1.0]
        };
        let y = if max > min {
            let pad = (max - min) * 0.05;
            [min - pad, max + pad]
        } else if max == min {
            [min - 1.0, max + 1.0]
        } else {
            // nothing plottable yet
            [0.0, 1.0]
        };
        Some((x, y))
    }
}

impl SeriesObserver for SeriesViewer {
    fn on_point(&mut self, point: Point) {
        if self.closed {
            return;
        }
        self.append(point);
        self.notifications += 1;
    }
}

impl View for SeriesViewer {
    fn render(&self, frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>) {
        let border = if ctx.focused {
            Style::default().fg(ctx.theme.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(ctx.theme.border)
        };
        let block = Block::default()
            .title(format!(" {} ", self.title()))
            .borders(Borders::ALL)
            .border_type(ctx.theme.border_type)
            .border_style(border);

        let Some((x_bounds, y_bounds)) = self.bounds() else {
            let waiting = Paragraph::new("waiting for data")
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::DIM))
                .block(block);
            frame.render_widget(waiting, area);
            return;
        };

        let data: Vec<(f64, f64)> = self
            .chart
            .iter()
            .filter(|p| p.value.is_finite())
            .map(|p| (p.time as f64, p.value))
            .collect();

        let dataset = Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(self.color))
            .data(&data);

        let x_labels = vec![
            Span::raw(format_clock(x_bounds[0] as i64)),
            Span::raw(format_clock(x_bounds[1] as i64)),
        ];
        let y_labels = vec![
            Span::raw(format_value(y_bounds[0])),
            Span::raw(format_value(y_bounds[1])),
        ];

        let chart = Chart::new(vec![dataset])
            .block(block)
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds(x_bounds)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds(y_bounds)
                    .labels(y_labels),
            );

        frame.render_widget(chart, area);
    }
}

impl LiveView for SeriesViewer {
    /// Detach from the series and drop the chart buffer.
    fn close(&mut self, store: &mut Store) {
        if self.closed {
            return;
        }
        if let Some(series) = store.series_mut(&self.key) {
            series.detach();
        }
        self.chart.clear();
        self.chart.shrink_to_fit();
        self.closed = true;
    }
}

impl fmt::Debug for SeriesViewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesViewer")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("points", &self.chart.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfmon_types::PollPayload;
    use serde_json::json;

    fn key() -> SeriesKey {
        SeriesKey::new("h1", "p1", "cpu")
    }

    fn feed(store: &mut Store, times: std::ops::Range<i64>) {
        for t in times {
            let payload = PollPayload::builder()
                .snapshot("h1", t, |s| s.process("p1", |p| p.attr("cpu", t as f64 / 100.0)))
                .build();
            store.ingest(&payload);
        }
    }

    fn open(store: &mut Store, options: ViewerOptions) -> Rc<RefCell<SeriesViewer>> {
        SeriesViewer::open(store.series_mut(&key()).unwrap(), options)
    }

    #[test]
    fn test_backfill_takes_last_points() {
        let mut store = Store::new();
        feed(&mut store, 0..15);

        let viewer = open(&mut store, ViewerOptions::default());
        let viewer = viewer.borrow();
        let times: Vec<i64> = viewer.chart().map(|p| p.time).collect();
        assert_eq!(times, (5..15).collect::<Vec<_>>());
        assert_eq!(viewer.notifications(), 0);
    }

    #[test]
    fn test_backfill_short_series() {
        let mut store = Store::new();
        feed(&mut store, 0..3);

        let viewer = open(&mut store, ViewerOptions::default());
        assert_eq!(viewer.borrow().chart_len(), 3);
    }

    #[test]
    fn test_notified_in_ingestion_order() {
        let mut store = Store::new();
        feed(&mut store, 0..1);
        let viewer = open(&mut store, ViewerOptions::default());

        feed(&mut store, 1..8);

        let viewer = viewer.borrow();
        assert_eq!(viewer.notifications(), 7);
        let times: Vec<i64> = viewer.chart().map(|p| p.time).collect();
        assert_eq!(times, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_switches_to_shift_after_21st_point() {
        let mut store = Store::new();
        feed(&mut store, 0..1);
        let options = ViewerOptions {
            backfill: 0,
            shift_after: 20,
        };
        let viewer = open(&mut store, options);

        for t in 1..=25 {
            feed(&mut store, t..t + 1);
            let viewer = viewer.borrow();
            let expected = if t <= 21 {
                AppendMode::Animated
            } else {
                AppendMode::ShiftIn
            };
            assert_eq!(viewer.last_mode(), Some(expected), "point {t}");
        }

        let viewer = viewer.borrow();
        assert_eq!(viewer.chart_len(), 21);
        assert_eq!(viewer.chart().next().map(|p| p.time), Some(5));
        assert_eq!(store.series(&key()).unwrap().len(), 26);
    }

    #[test]
    fn test_close_stops_notifications() {
        let mut store = Store::new();
        feed(&mut store, 0..5);
        let viewer = open(&mut store, ViewerOptions::default());

        viewer.borrow_mut().close(&mut store);
        assert!(!store.series(&key()).unwrap().has_viewer());

        feed(&mut store, 5..10);
        let viewer = viewer.borrow();
        assert!(viewer.is_closed());
        assert_eq!(viewer.notifications(), 0);
        assert_eq!(viewer.chart_len(), 0);
    }

    #[test]
    fn test_dropped_viewer_is_forgotten() {
        let mut store = Store::new();
        feed(&mut store, 0..2);
        drop(open(&mut store, ViewerOptions::default()));

        feed(&mut store, 2..3);
        assert!(!store.series(&key()).unwrap().has_viewer());
    }

    #[test]
    fn test_flat_series_bounds() {
        let mut store = Store::new();
        let payload = PollPayload::builder()
            .snapshot("h1", 10, |s| s.process("p1", |p| p.attr("cpu", 0.5)))
            .build();
        store.ingest(&payload);

        let viewer = open(&mut store, ViewerOptions::default());
        let (x, y) = viewer.borrow().bounds().unwrap();
        assert_eq!(x, [10.0, 11.0]);
        assert_eq!(y, [-0.5, 1.5]);
    }

    #[test]
    fn test_nan_points_skipped_in_bounds() {
        let mut store = Store::new();
        for (t, v) in [(10, json!("n/a")), (11, json!(2.0)), (12, json!(4.0))] {
            let payload = PollPayload::builder()
                .snapshot("h1", t, |s| s.process("p1", |p| p.raw("cpu", v)))
                .build();
            store.ingest(&payload);
        }

        let viewer = open(&mut store, ViewerOptions::default());
        let viewer = viewer.borrow();
        assert_eq!(viewer.chart_len(), 3);
        let (x, y) = viewer.bounds().unwrap();
        assert_eq!(x, [10.0, 12.0]);
        assert!((y[0] - 1.9).abs() < 1e-9);
        assert!((y[1] - 4.1).abs() < 1e-9);
    }

    #[test]
    fn test_all_nan_series_has_default_bounds() {
        let mut store = Store::new();
        let payload = PollPayload::builder()
            .snapshot("h1", 10, |s| s.process("p1", |p| p.raw("cpu", json!(null))))
            .build();
        store.ingest(&payload);

        let viewer = open(&mut store, ViewerOptions::default());
        let (_, y) = viewer.borrow().bounds().unwrap();
        assert_eq!(y, [0.0, 1.0]);
    }
}
