//! The host → process → attribute store and snapshot ingestion.
//!
//! The store is owned by the application and mutated only through
//! [`Store::ingest`]. Hosts, processes and attribute columns are created on
//! first mention and never removed.

use std::collections::{HashMap, HashSet};

use perfmon_types::{PollPayload, Snapshot};
use serde::Serialize;
use tracing::{debug, warn};

use super::series::{AttrSeries, Point, SeriesKey};
use crate::source::SourceError;

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Snapshots whose points were appended.
    pub applied: usize,
    /// Snapshots skipped because their host already had that timestamp.
    pub duplicates: usize,
    /// Snapshots skipped because their time could not be read.
    pub rejected: usize,
    /// Points appended across all series.
    pub points: usize,
}

impl IngestReport {
    /// True if the cycle changed the store.
    pub fn changed(&self) -> bool {
        self.points > 0 || self.applied > 0
    }

    /// Fold another cycle's counts into this one.
    pub fn merge(&mut self, other: IngestReport) {
        self.applied += other.applied;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
        self.points += other.points;
    }
}

/// A process and its attribute series.
#[derive(Debug)]
pub struct Process {
    name: String,
    attrs: HashMap<String, AttrSeries>,
}

impl Process {
    fn new(name: String) -> Self {
        Self {
            name,
            attrs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self, attr: &str) -> Option<&AttrSeries> {
        self.attrs.get(attr)
    }

    pub fn series_mut(&mut self, attr: &str) -> Option<&mut AttrSeries> {
        self.attrs.get_mut(attr)
    }

    /// Number of attributes this process has reported.
    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }
}

/// A monitored host.
#[derive(Debug)]
pub struct Host {
    name: String,
    times: Vec<i64>,
    seen: HashSet<i64>,
    procs: Vec<Process>,
    proc_index: HashMap<String, usize>,
}

impl Host {
    fn new(name: String) -> Self {
        Self {
            name,
            times: Vec::new(),
            seen: HashSet::new(),
            procs: Vec::new(),
            proc_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot times ingested for this host, in arrival order.
    pub fn times(&self) -> &[i64] {
        &self.times
    }

    /// Processes in first-seen order.
    pub fn processes(&self) -> &[Process] {
        &self.procs
    }

    pub fn process(&self, name: &str) -> Option<&Process> {
        self.proc_index.get(name).map(|&i| &self.procs[i])
    }

    fn process_mut(&mut self, name: &str) -> Option<&mut Process> {
        self.proc_index.get(name).map(|&i| &mut self.procs[i])
    }

    /// Record a snapshot time. Returns false if it was already recorded.
    fn record_time(&mut self, time: i64) -> bool {
        if !self.seen.insert(time) {
            return false;
        }
        self.times.push(time);
        true
    }

    fn process_entry(&mut self, name: &str) -> &mut Process {
        let idx = match self.proc_index.get(name) {
            Some(&idx) => idx,
            None => {
                self.procs.push(Process::new(name.to_string()));
                self.proc_index.insert(name.to_string(), self.procs.len() - 1);
                self.procs.len() - 1
            }
        };
        &mut self.procs[idx]
    }
}

/// Time-series store for every host, process and attribute seen so far.
#[derive(Debug, Default)]
pub struct Store {
    hosts: Vec<Host>,
    host_index: HashMap<String, usize>,
    attributes: Vec<String>,
    attribute_set: HashSet<String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts in first-seen order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.host_index.get(name).map(|&i| &self.hosts[i])
    }

    /// Every attribute name ever observed, in first-seen order.
    pub fn attribute_names(&self) -> &[String] {
        &self.attributes
    }

    pub fn series(&self, key: &SeriesKey) -> Option<&AttrSeries> {
        self.host(&key.host)?.process(&key.process)?.series(&key.attr)
    }

    pub fn series_mut(&mut self, key: &SeriesKey) -> Option<&mut AttrSeries> {
        let idx = *self.host_index.get(&key.host)?;
        self.hosts[idx].process_mut(&key.process)?.series_mut(&key.attr)
    }

    /// Total number of points across all series.
    pub fn point_count(&self) -> usize {
        self.hosts
            .iter()
            .flat_map(|h| h.procs.iter())
            .flat_map(|p| p.attrs.values())
            .map(AttrSeries::len)
            .sum()
    }

    /// Number of (host, process) rows.
    pub fn row_count(&self) -> usize {
        self.hosts.iter().map(|h| h.procs.len()).sum()
    }

    /// Decode a JSON payload and ingest it.
    ///
    /// A payload that fails to decode leaves the store untouched.
    pub fn ingest_json(&mut self, text: &str) -> Result<IngestReport, SourceError> {
        let payload: PollPayload =
            serde_json::from_str(text).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(self.ingest(&payload))
    }

    /// Merge every snapshot of a payload into the store.
    ///
    /// A snapshot whose time is already recorded for its host is skipped,
    /// so re-polling the same data is a no-op. Points are appended
    /// synchronously; attached viewers are notified before this returns.
    pub fn ingest(&mut self, payload: &PollPayload) -> IngestReport {
        let mut report = IngestReport::default();

        for snapshot in &payload.snapshots {
            let Some(time) = snapshot.time_secs() else {
                warn!(host = %snapshot.hname, time = %snapshot.time, "snapshot time unreadable, skipping");
                report.rejected += 1;
                continue;
            };

            let host = self.host_entry(&snapshot.hname);
            if !self.hosts[host].record_time(time) {
                report.duplicates += 1;
                continue;
            }

            report.points += self.apply(host, time, snapshot);
            report.applied += 1;
        }

        debug!(
            applied = report.applied,
            duplicates = report.duplicates,
            rejected = report.rejected,
            points = report.points,
            "ingested payload"
        );
        report
    }

    fn apply(&mut self, host: usize, time: i64, snapshot: &Snapshot) -> usize {
        let Self {
            hosts,
            attributes,
            attribute_set,
            ..
        } = self;
        let host = &mut hosts[host];
        let host_name = host.name.clone();
        let mut points = 0;

        for entry in &snapshot.procs {
            let process = host.process_entry(&entry.pname);

            for (attr, value) in entry.values() {
                if value.is_nan() {
                    debug!(host = %host_name, process = %entry.pname, attr, "non-numeric value stored as NaN");
                }

                if !attribute_set.contains(attr) {
                    attribute_set.insert(attr.to_string());
                    attributes.push(attr.to_string());
                }

                process
                    .attrs
                    .entry(attr.to_string())
                    .or_insert_with(|| {
                        AttrSeries::new(SeriesKey::new(&host_name, &entry.pname, attr))
                    })
                    .push(Point::new(time, value));
                points += 1;
            }
        }

        points
    }

    fn host_entry(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.host_index.get(name) {
            return idx;
        }
        self.hosts.push(Host::new(name.to_string()));
        self.host_index.insert(name.to_string(), self.hosts.len() - 1);
        self.hosts.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(host: &str, time: i64, cpu: f64) -> PollPayload {
        PollPayload::builder()
            .snapshot(host, time, |s| s.process("p1", |p| p.attr("cpu", cpu)))
            .build()
    }

    #[test]
    fn test_duplicate_time_is_noop() {
        let mut store = Store::new();
        let first = store.ingest(&payload("h1", 100, 0.3));
        let second = store.ingest(&payload("h1", 100, 0.3));

        assert_eq!(first.applied, 1);
        assert_eq!(second.duplicates, 1);
        assert!(!second.changed());

        let key = SeriesKey::new("h1", "p1", "cpu");
        assert_eq!(store.series(&key).unwrap().len(), 1);
        assert_eq!(store.host("h1").unwrap().times(), &[100]);
    }

    #[test]
    fn test_dedup_compares_whole_seconds() {
        let mut store = Store::new();
        let at = |time: serde_json::Value| {
            PollPayload::builder()
                .push(
                    Snapshot::builder("h1", time)
                        .process("p1", |p| p.attr("cpu", 0.1))
                        .build(),
                )
                .build()
        };

        assert_eq!(store.ingest(&at(json!(100.2))).applied, 1);
        assert_eq!(store.ingest(&at(json!(100.9))).duplicates, 1);
        assert_eq!(store.ingest(&at(json!("100"))).duplicates, 1);
        assert_eq!(store.host("h1").unwrap().times(), &[100]);
    }

    #[test]
    fn test_same_time_on_other_host_is_kept() {
        let mut store = Store::new();
        store.ingest(&payload("h1", 100, 0.3));
        store.ingest(&payload("h2", 100, 0.4));

        assert_eq!(store.hosts().len(), 2);
        assert_eq!(store.point_count(), 2);
    }

    #[test]
    fn test_attributes_discovered_in_first_seen_order() {
        let mut store = Store::new();
        let payload = PollPayload::builder()
            .snapshot("h1", 1, |s| {
                s.process("a", |p| p.attr("cpu", 0.1).attr("rss", 10.0))
                    .process("b", |p| p.attr("vmem", 5.0).attr("cpu", 0.2))
            })
            .build();
        store.ingest(&payload);

        assert_eq!(store.attribute_names(), &["cpu", "rss", "vmem"]);
        let host = store.host("h1").unwrap();
        let names: Vec<&str> = host.processes().iter().map(Process::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(host.process("a").unwrap().series("vmem").is_none());
    }

    #[test]
    fn test_daemon_string_values_are_coerced() {
        let mut store = Store::new();
        let report = store
            .ingest_json(
                r#"{"snapshots":[{"hname":"h1","time":"100","procs":[
                    {"pname":"p1","cpu":"12.5","rss":"2048","state":"running"}]}]}"#,
            )
            .unwrap();

        assert_eq!(report.points, 3);
        let cpu = store.series(&SeriesKey::new("h1", "p1", "cpu")).unwrap();
        assert_eq!(cpu.points(), &[Point::new(100, 12.5)]);

        // non-numeric fields still register a column and append a NaN point
        assert_eq!(store.attribute_names(), &["cpu", "rss", "state"]);
        let state = store.series(&SeriesKey::new("h1", "p1", "state")).unwrap();
        assert_eq!(state.len(), 1);
        assert!(state.latest_value().unwrap().is_nan());
    }

    #[test]
    fn test_unreadable_time_rejected() {
        let mut store = Store::new();
        let bad = PollPayload::builder()
            .push(
                perfmon_types::SnapshotBuilder::new("h1".into(), json!("soon"))
                    .process("p1", |p| p.attr("cpu", 0.1))
                    .build(),
            )
            .build();

        let report = store.ingest(&bad);
        assert_eq!(report.rejected, 1);
        assert_eq!(store.point_count(), 0);
        assert!(store.host("h1").is_none());
    }

    #[test]
    fn test_malformed_json_leaves_store_untouched() {
        let mut store = Store::new();
        store.ingest(&payload("h1", 100, 0.3));

        let err = store.ingest_json("{not json").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert_eq!(store.point_count(), 1);
    }

    #[test]
    fn test_absent_fields_produce_no_series() {
        let mut store = Store::new();
        store.ingest(&payload("h1", 1, 0.1));
        store.ingest(
            &PollPayload::builder()
                .snapshot("h1", 2, |s| s.process("p2", |p| p))
                .build(),
        );

        let host = store.host("h1").unwrap();
        assert_eq!(host.processes().len(), 2);
        assert_eq!(host.process("p2").unwrap().attr_count(), 0);
        assert_eq!(store.row_count(), 2);
    }

    #[test]
    fn test_latest_value_is_last_ingested() {
        let mut store = Store::new();
        for (t, v) in [(10, 0.1), (11, 0.5), (12, 0.2)] {
            store.ingest(&payload("h1", t, v));
        }
        let key = SeriesKey::new("h1", "p1", "cpu");
        assert_eq!(store.series(&key).unwrap().latest_value(), Some(0.2));
    }
}
