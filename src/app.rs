//! Application state and action dispatch.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::bus::{self, BusEvent, EventBus};
use crate::data::{IngestReport, Labels, SeriesKey, SeverityRule, Store, ThresholdRule};
use crate::source::{DataSource, SourceError};
use crate::ui::{DashboardView, LiveView, SeriesViewer, Theme, ViewerOptions};

/// Payloads taken from the source per refresh, so a flooding stream
/// cannot starve the UI.
const MAX_PAYLOADS_PER_CYCLE: usize = 64;

/// A user intent, produced from key and mouse events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a chart for a series, replacing any chart already on it.
    OpenViewer(SeriesKey),
    /// Open a chart for the selected cell.
    OpenSelected,
    CloseViewer(SeriesKey),
    CloseFocusedViewer,
    CloseAllViewers,
    /// Move the table selection by rows and columns.
    MoveSelection { rows: isize, cols: isize },
    SelectCell { row: usize, col: usize },
    SelectFirstRow,
    SelectLastRow,
    FocusViewer(usize),
    FocusNextViewer,
    FocusPrevViewer,
    Reload,
    Export,
    ToggleHelp,
    Quit,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Data
    source: Box<dyn DataSource>,
    pub store: Store,
    pub load_error: Option<String>,
    pub last_report: Option<IngestReport>,
    pub last_updated: Option<Instant>,

    // Views
    pub dashboard: DashboardView,
    /// Open charts, newest first.
    pub viewers: Vec<Rc<RefCell<SeriesViewer>>>,
    pub focused_viewer: usize,
    viewer_options: ViewerOptions,
    rule: Box<dyn SeverityRule>,
    labels: Labels,

    bus: EventBus<BusEvent>,

    // UI
    pub theme: Theme,
    /// Terminal area of the last drawn frame, for mouse hit-testing.
    pub frame_area: Rect,
    pub export_path: std::path::PathBuf,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading from `source` with default rule, labels
    /// and chart options.
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self {
            running: true,
            show_help: false,
            source,
            store: Store::new(),
            load_error: None,
            last_report: None,
            last_updated: None,
            dashboard: DashboardView::new(),
            viewers: Vec::new(),
            focused_viewer: 0,
            viewer_options: ViewerOptions::default(),
            rule: Box::new(ThresholdRule::default()),
            labels: Labels::default(),
            bus: EventBus::new(),
            theme: Theme::dark(),
            frame_area: Rect::default(),
            export_path: "perfmon_export.json".into(),
            status_message: None,
        }
    }

    /// Replace the cell classification rule.
    pub fn with_rule(mut self, rule: impl SeverityRule + 'static) -> Self {
        self.rule = Box::new(rule);
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_viewer_options(mut self, options: ViewerOptions) -> Self {
        self.viewer_options = options;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Event bus carrying ingestion and viewer lifecycle events.
    pub fn bus_mut(&mut self) -> &mut EventBus<BusEvent> {
        &mut self.bus
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Drain the data source into the store.
    ///
    /// Every payload is ingested in full before the dashboard is rebuilt.
    /// An error ends the cycle; it is logged and kept for the status bar
    /// until a later payload clears it. Returns true if any payload arrived.
    pub fn reload_data(&mut self) -> bool {
        let mut report = IngestReport::default();
        let mut received = 0;

        while received < MAX_PAYLOADS_PER_CYCLE {
            match self.source.poll() {
                Ok(Some(payload)) => {
                    report.merge(self.store.ingest(&payload));
                    self.load_error = None;
                    received += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    match &err {
                        SourceError::Closed(_) => {
                            debug!(source = self.source.description(), error = %err, "source closed")
                        }
                        _ => warn!(source = self.source.description(), error = %err, "poll failed"),
                    }
                    self.load_error = Some(err.to_string());
                    break;
                }
            }
        }

        if received == 0 {
            return false;
        }

        debug!(payloads = received, points = report.points, "refresh");
        self.dashboard
            .refresh(&self.store, self.rule.as_ref(), &self.labels);
        self.last_report = Some(report);
        self.last_updated = Some(Instant::now());
        self.bus
            .publish(bus::STORE_INGESTED, &BusEvent::Ingested(report));
        true
    }

    /// Apply one user action.
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::OpenViewer(key) => self.open_viewer(&key),
            Action::OpenSelected => {
                if let Some(key) = self.dashboard.selected_key() {
                    self.open_viewer(&key);
                }
            }
            Action::CloseViewer(key) => {
                if let Some(idx) = self.viewer_index(&key) {
                    self.close_viewer(idx);
                }
            }
            Action::CloseFocusedViewer => {
                if !self.viewers.is_empty() {
                    self.close_viewer(self.focused_viewer);
                }
            }
            Action::CloseAllViewers => {
                while !self.viewers.is_empty() {
                    self.close_viewer(0);
                }
            }
            Action::MoveSelection { rows, cols } => self.dashboard.move_selection(rows, cols),
            Action::SelectCell { row, col } => self.dashboard.select(row, col),
            Action::SelectFirstRow => self.dashboard.select_first_row(),
            Action::SelectLastRow => self.dashboard.select_last_row(),
            Action::FocusViewer(idx) => {
                if idx < self.viewers.len() {
                    self.focused_viewer = idx;
                }
            }
            Action::FocusNextViewer => {
                if !self.viewers.is_empty() {
                    self.focused_viewer = (self.focused_viewer + 1) % self.viewers.len();
                }
            }
            Action::FocusPrevViewer => {
                if !self.viewers.is_empty() {
                    self.focused_viewer =
                        (self.focused_viewer + self.viewers.len() - 1) % self.viewers.len();
                }
            }
            Action::Reload => {
                self.reload_data();
            }
            Action::Export => {
                let path = self.export_path.clone();
                match self.export_state(&path) {
                    Ok(()) => self.set_status_message(format!("Exported to {}", path.display())),
                    Err(e) => self.set_status_message(format!("Export failed: {}", e)),
                }
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::Quit => self.running = false,
        }
    }

    fn viewer_index(&self, key: &SeriesKey) -> Option<usize> {
        self.viewers.iter().position(|v| v.borrow().key() == key)
    }

    /// Open a chart for `key` at the front of the list and focus it.
    ///
    /// A chart already open on the same series is closed first.
    pub fn open_viewer(&mut self, key: &SeriesKey) {
        if let Some(idx) = self.viewer_index(key) {
            self.close_viewer(idx);
        }

        let Some(series) = self.store.series_mut(key) else {
            self.set_status_message(format!("No data for {}", key));
            return;
        };

        let viewer = SeriesViewer::open(series, self.viewer_options);
        info!(series = %key, viewer = %viewer.borrow().id(), "viewer opened");
        self.viewers.insert(0, viewer);
        self.focused_viewer = 0;
        self.bus
            .publish(bus::VIEWER_OPENED, &BusEvent::ViewerOpened(key.clone()));
    }

    /// Close the chart at `idx` and detach it from its series.
    pub fn close_viewer(&mut self, idx: usize) {
        if idx >= self.viewers.len() {
            return;
        }
        let viewer = self.viewers.remove(idx);
        viewer.borrow_mut().close(&mut self.store);
        let key = viewer.borrow().key().clone();
        info!(series = %key, "viewer closed");

        if self.focused_viewer > idx || self.focused_viewer >= self.viewers.len() {
            self.focused_viewer = self.focused_viewer.saturating_sub(1);
        }
        self.bus
            .publish(bus::VIEWER_CLOSED, &BusEvent::ViewerClosed(key));
    }

    /// Export the current dashboard table to a JSON file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let table = self.dashboard.table();
        if table.is_empty() {
            anyhow::bail!("No data to export");
        }
        let json = serde_json::to_string_pretty(&table.to_json())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("source", &self.source.description())
            .field("hosts", &self.store.hosts().len())
            .field("viewers", &self.viewers.len())
            .finish()
    }
}
