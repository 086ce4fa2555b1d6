//! Per-attribute time series and the viewer back-reference.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use serde::Serialize;

/// One sample: collection time in seconds and the attribute value.
///
/// `value` is NaN when the daemon sent something that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub time: i64,
    pub value: f64,
}

impl Point {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Identifies one series: (host, process, attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeriesKey {
    pub host: String,
    pub process: String,
    pub attr: String,
}

impl SeriesKey {
    pub fn new(
        host: impl Into<String>,
        process: impl Into<String>,
        attr: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            process: process.into(),
            attr: attr.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({},{})", self.attr, self.host, self.process)
    }
}

/// Receives points as they are appended to a series.
///
/// Called synchronously from [`AttrSeries::push`], on the ingesting thread.
pub trait SeriesObserver {
    fn on_point(&mut self, point: Point);
}

/// Ordered value history for one (host, process, attribute) triple.
///
/// Points are append-only and kept in arrival order; time is assumed to be
/// monotonic but is not checked. The series holds at most one weak reference
/// to a viewer. It never owns the viewer: a viewer dropped without detaching
/// simply stops receiving points.
pub struct AttrSeries {
    key: SeriesKey,
    points: Vec<Point>,
    viewer: Option<Weak<RefCell<dyn SeriesObserver>>>,
}

impl AttrSeries {
    pub fn new(key: SeriesKey) -> Self {
        Self {
            key,
            points: Vec::new(),
            viewer: None,
        }
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the most recently appended point.
    pub fn latest_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// Up to the last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> &[Point] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Append a point and notify the attached viewer, if any.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);

        let Some(weak) = self.viewer.as_ref() else {
            return;
        };
        match weak.upgrade() {
            Some(viewer) => match viewer.try_borrow_mut() {
                Ok(mut viewer) => viewer.on_point(point),
                Err(_) => {
                    tracing::warn!(series = %self.key, "viewer busy, point not delivered");
                }
            },
            None => {
                tracing::debug!(series = %self.key, "viewer dropped, detaching");
                self.viewer = None;
            }
        }
    }

    /// Make `viewer` the sole observer of this series, replacing any other.
    pub fn attach(&mut self, viewer: Weak<RefCell<dyn SeriesObserver>>) {
        self.viewer = Some(viewer);
    }

    /// Drop the viewer reference.
    pub fn detach(&mut self) {
        self.viewer = None;
    }

    /// True while a live viewer is attached.
    pub fn has_viewer(&self) -> bool {
        self.viewer.as_ref().is_some_and(|w| w.strong_count() > 0)
    }
}

impl fmt::Debug for AttrSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrSeries")
            .field("key", &self.key)
            .field("points", &self.points.len())
            .field("has_viewer", &self.has_viewer())
            .finish()
    }
}
