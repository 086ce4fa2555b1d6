//! # perfmon-types
//!
//! Wire schema for the payload served by the perfmon daemon's HTTP endpoint
//! and consumed by `perfmon-dash`.
//!
//! A poll returns one JSON document:
//!
//! ```text
//! { "snapshots": [ { "hname": "...", "time": ..., "procs": [ { "pname": "...", "<attr>": ..., ... } ] } ] }
//! ```
//!
//! The daemon renders numbers as JSON strings (`"cpu" : "12.5"`), while other
//! producers send plain numbers. Both are accepted; see [`coerce_time`] and
//! [`coerce_value`].
//!
//! ## Example
//!
//! ```rust
//! use perfmon_types::PollPayload;
//!
//! let payload = PollPayload::builder()
//!     .snapshot("web-01", 1_700_000_000, |s| {
//!         s.process("nginx:80", |p| p.attr("cpu", 0.42).attr("rss", 18_432.0))
//!     })
//!     .build();
//!
//! let json = serde_json::to_string(&payload).unwrap();
//! let parsed: PollPayload = serde_json::from_str(&json).unwrap();
//! assert_eq!(parsed, payload);
//! ```

mod coerce;
mod snapshot;

pub use coerce::{coerce_time, coerce_value};
pub use snapshot::{
    PollPayload, PollPayloadBuilder, ProcessBuilder, ProcessEntry, Snapshot, SnapshotBuilder,
};
