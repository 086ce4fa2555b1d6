//! # perfmon-dash
//!
//! A terminal dashboard for the perfmon daemon: it polls per-host,
//! per-process performance snapshots, keeps them as time series and shows
//! the latest values in a table with live charts on demand.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐   ┌──────────┐  │
//! │  │   app   │───▶│   data   │───▶│    ui    │──▶│ Terminal │  │
//! │  │(actions)│    │ (store)  │    │(table,   │   │          │  │
//! │  └────┬────┘    └────┬─────┘    │ charts)  │   └──────────┘  │
//! │       │              │ points   └──────────┘                 │
//! │       ▼              └──────────▶ SeriesViewer               │
//! │  ┌─────────┐                                                 │
//! │  │ source  │◀── HttpSource | FileSource | StreamSource | ... │
//! │  └─────────┘                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`DataSource`] trait and its implementations
//! - **[`data`]**: the host → process → attribute [`Store`], ingestion with
//!   per-host timestamp deduplication, severity rules and labels
//! - **[`ui`]**: the dashboard table and the [`SeriesViewer`] charts
//! - **[`app`]**: state and [`Action`] dispatch
//! - **[`bus`]**: a synchronous publish/subscribe [`EventBus`]
//! - **[`config`]**: layered [`Settings`]
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll the daemon
//! perfmon-dash --url http://localhost:8888
//!
//! # Replay a saved payload
//! perfmon-dash --file snapshots.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use perfmon_dash::{Labels, Store, ThresholdRule};
//! use perfmon_dash::ui::DashboardView;
//!
//! let mut store = Store::new();
//! store
//!     .ingest_json(r#"{"snapshots":[{"hname":"h1","time":100,"procs":[{"pname":"p1","cpu":0.7}]}]}"#)
//!     .unwrap();
//!
//! let table = DashboardView::build(&store, &ThresholdRule::default(), &Labels::default());
//! assert_eq!(table.rows[0].cells[0].severity.class(), "warning");
//! ```
//!
//! ### With a channel source
//!
//! ```
//! use perfmon_dash::{App, ChannelSource};
//!
//! let (tx, source) = ChannelSource::create("embedded collector");
//! let app = App::new(Box::new(source));
//! ```

pub mod app;
pub mod bus;
pub mod config;
pub mod data;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{Action, App};
pub use bus::{BusEvent, EventBus, SubscriberId};
pub use config::Settings;
pub use data::{
    AttrSeries, IngestReport, Labels, Point, SeriesKey, SeriesObserver, Severity, SeverityRule,
    Store, ThresholdRule,
};
pub use source::{
    ChannelSource, DataSource, FileSource, HttpSource, PollPayload, SourceError, StreamSource,
};
pub use ui::{DashboardView, SeriesViewer, ViewerOptions};
