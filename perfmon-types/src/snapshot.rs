//! Snapshot - one host's process table at one instant.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded poll response.
///
/// Snapshots are kept in document order. The daemon may repeat snapshots it
/// already served; deduplication is the consumer's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollPayload {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

impl PollPayload {
    /// Create a builder for constructing payloads.
    pub fn builder() -> PollPayloadBuilder {
        PollPayloadBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

/// Process table of one host at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Host name.
    pub hname: String,

    /// Collection time in seconds. Number or numeric string on the wire.
    pub time: Value,

    #[serde(default)]
    pub procs: Vec<ProcessEntry>,
}

impl Snapshot {
    /// Start a snapshot for `host` at `time`; the time may be a number or a
    /// numeric string, as the daemon sends it.
    pub fn builder(host: impl Into<String>, time: impl Into<Value>) -> SnapshotBuilder {
        SnapshotBuilder::new(host.into(), time.into())
    }

    /// Collection time coerced to whole seconds.
    pub fn time_secs(&self) -> Option<i64> {
        crate::coerce_time(&self.time)
    }
}

/// One process row: its name plus every other field as an attribute.
///
/// Attributes keep the order they had in the document, so columns can be
/// introduced in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pname: String,

    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl ProcessEntry {
    /// Iterate over every attribute in document order with its value as a
    /// float. Values that do not coerce read as NaN.
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.attrs
            .iter()
            .map(|(name, v)| (name.as_str(), crate::coerce_value(v).unwrap_or(f64::NAN)))
    }
}

/// Builder for [`PollPayload`].
#[derive(Debug, Default)]
pub struct PollPayloadBuilder {
    snapshots: Vec<Snapshot>,
}

impl PollPayloadBuilder {
    /// Add a snapshot for `host` taken at `time` seconds.
    pub fn snapshot<F>(mut self, host: impl Into<String>, time: i64, f: F) -> Self
    where
        F: FnOnce(SnapshotBuilder) -> SnapshotBuilder,
    {
        let builder = f(SnapshotBuilder::new(host.into(), Value::from(time)));
        self.snapshots.push(builder.build());
        self
    }

    /// Add a pre-built snapshot.
    pub fn push(mut self, snapshot: Snapshot) -> Self {
        self.snapshots.push(snapshot);
        self
    }

    pub fn build(self) -> PollPayload {
        PollPayload {
            snapshots: self.snapshots,
        }
    }
}

/// Builder for [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotBuilder {
    hname: String,
    time: Value,
    procs: Vec<ProcessEntry>,
}

impl SnapshotBuilder {
    pub fn new(hname: String, time: Value) -> Self {
        Self {
            hname,
            time,
            procs: Vec::new(),
        }
    }

    /// Add a process entry built using a closure.
    pub fn process<F>(mut self, pname: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ProcessBuilder) -> ProcessBuilder,
    {
        self.procs.push(f(ProcessBuilder::new(pname.into())).build());
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            hname: self.hname,
            time: self.time,
            procs: self.procs,
        }
    }
}

/// Builder for [`ProcessEntry`].
#[derive(Debug)]
pub struct ProcessBuilder {
    pname: String,
    attrs: Map<String, Value>,
}

impl ProcessBuilder {
    pub fn new(pname: String) -> Self {
        Self {
            pname,
            attrs: Map::new(),
        }
    }

    /// Set a numeric attribute.
    pub fn attr(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attrs.insert(name.into(), Value::from(value));
        self
    }

    /// Set an attribute to an arbitrary JSON value, e.g. the daemon's
    /// string-encoded numbers.
    pub fn raw(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    pub fn build(self) -> ProcessEntry {
        ProcessEntry {
            pname: self.pname,
            attrs: self.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_daemon_payload() {
        // Shape produced by the perfmon daemon: every number is a string.
        let json = r#"{ "snapshots" : [ { "time" : "1700000000" , "hname" : "node-1" , "procs" : [
            { "pname" : "redis:6379" , "cpu" : "12.5" , "vmem" : "204800" , "rss" : "10240" ,
              "io_read" : "0" , "io_write" : "3" , "net_send" : "17" , "net_recv" : "4" } ] } ] }"#;

        let payload: PollPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.len(), 1);

        let snapshot = &payload.snapshots[0];
        assert_eq!(snapshot.hname, "node-1");
        assert_eq!(snapshot.time_secs(), Some(1_700_000_000));

        let proc = &snapshot.procs[0];
        assert_eq!(proc.pname, "redis:6379");
        assert!(!proc.attrs.contains_key("pname"));

        let names: Vec<&str> = proc.attrs.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["cpu", "vmem", "rss", "io_read", "io_write", "net_send", "net_recv"]
        );

        let cpu = proc.values().find(|(n, _)| *n == "cpu").unwrap().1;
        assert!((cpu - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_numeric_values_read_as_nan() {
        let json = r#"{ "pname": "p1", "cpu": "0.5", "state": "running", "nice": null }"#;
        let proc: ProcessEntry = serde_json::from_str(json).unwrap();

        let values: Vec<(&str, f64)> = proc.values().collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], ("cpu", 0.5));
        assert_eq!(values[1].0, "state");
        assert!(values[1].1.is_nan());
        assert!(values[2].1.is_nan());
    }

    #[test]
    fn test_missing_snapshots_key_is_empty() {
        let payload: PollPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_builder() {
        let payload = PollPayload::builder()
            .snapshot("h1", 100, |s| s.process("p1", |p| p.attr("cpu", 0.3)))
            .snapshot("h2", 100, |s| {
                s.process("p1", |p| p.attr("cpu", 0.1))
                    .process("p2", |p| p.raw("rss", Value::from("2048")))
            })
            .build();

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.snapshots[1].procs.len(), 2);
        assert_eq!(payload.snapshots[0].time_secs(), Some(100));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["snapshots"][0]["procs"][0]["pname"], "p1");
        assert_eq!(json["snapshots"][0]["procs"][0]["cpu"], 0.3);
    }

    #[test]
    fn test_snapshot_builder_with_string_time() {
        let payload = PollPayload::builder()
            .push(
                Snapshot::builder("node-1", "1700000000")
                    .process("sshd", |p| p.attr("cpu", 0.0))
                    .build(),
            )
            .build();

        assert_eq!(payload.snapshots[0].time, Value::from("1700000000"));
        assert_eq!(payload.snapshots[0].time_secs(), Some(1_700_000_000));
    }
}
