//! Client-side data model for polled perfmon snapshots.
//!
//! ## Submodules
//!
//! - [`store`]: [`Store`] with its host → process → attribute hierarchy and
//!   snapshot ingestion
//! - [`series`]: [`AttrSeries`] value history and the [`SeriesObserver`] hook
//!   used by live viewers
//! - [`severity`]: pluggable cell classification ([`SeverityRule`])
//! - [`labels`]: short display names for columns, hosts and processes
//!
//! ## Data Flow
//!
//! ```text
//! PollPayload (decoded JSON)
//!        │
//!        ▼
//! Store::ingest()  ── skips snapshots whose (host, time) is already known
//!        │
//!        ├──▶ AttrSeries::push()  ──▶ SeriesObserver::on_point() (open viewer)
//!        │
//!        └──▶ IngestReport
//! ```

pub mod labels;
pub mod series;
pub mod severity;
pub mod store;

pub use labels::Labels;
pub use series::{AttrSeries, Point, SeriesKey, SeriesObserver};
pub use severity::{Severity, SeverityRule, ThresholdRule};
pub use store::{Host, IngestReport, Process, Store};
