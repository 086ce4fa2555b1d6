//! Data source abstraction for receiving perfmon payloads.
//!
//! The dashboard pulls decoded [`PollPayload`]s from a [`DataSource`]. The
//! primary source polls the daemon's HTTP endpoint; the others replay a file,
//! read newline-delimited JSON from a stream, or take payloads pushed through
//! a channel.

mod channel;
mod error;
mod file;
mod http;
mod stream;

pub use channel::ChannelSource;
pub use error::SourceError;
pub use file::FileSource;
pub use http::HttpSource;
pub use perfmon_types::PollPayload;
pub use stream::StreamSource;

use std::fmt::Debug;

/// Trait for receiving perfmon payloads from various sources.
///
/// # Example
///
/// ```
/// use perfmon_dash::{DataSource, FileSource};
///
/// let mut source = FileSource::new("perfmon.json");
/// match source.poll() {
///     Ok(Some(payload)) => println!("Got {} snapshots", payload.len()),
///     Ok(None) => println!("Nothing new"),
///     Err(e) => println!("Poll failed: {}", e),
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Take the next available result without blocking.
    ///
    /// Returns `Ok(None)` when nothing new is available. Sources that can
    /// buffer several results (e.g. overlapping HTTP requests) return them
    /// one per call, in completion order.
    fn poll(&mut self) -> Result<Option<PollPayload>, SourceError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}
