//! Channel-based data source.
//!
//! Receives perfmon payloads via a tokio watch channel, for embedding the
//! dashboard in a process that already has the data.

use tokio::sync::watch;

use perfmon_types::PollPayload;

use super::{DataSource, SourceError};

/// A data source that receives payloads via a channel.
///
/// Only the most recent payload is kept; older ones that were never polled
/// are replaced.
///
/// # Example
///
/// ```
/// use perfmon_dash::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("embedded collector");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<PollPayload>,
    description: String,
    initial_returned: bool,
}

impl ChannelSource {
    /// Create a new channel source from the receiving end of a watch channel.
    pub fn new(receiver: watch::Receiver<PollPayload>, source_description: &str) -> Self {
        let description = format!("channel: {}", source_description);
        Self {
            receiver,
            description,
            initial_returned: false,
        }
    }

    /// Create a channel pair. Returns (sender, source).
    pub fn create(source_description: &str) -> (watch::Sender<PollPayload>, Self) {
        let (tx, rx) = watch::channel(PollPayload::default());
        let source = Self::new(rx, source_description);
        (tx, source)
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Result<Option<PollPayload>, SourceError> {
        if !self.initial_returned {
            self.initial_returned = true;
            self.receiver.mark_changed();
        }

        match self.receiver.has_changed() {
            Ok(true) => Ok(Some(self.receiver.borrow_and_update().clone())),
            Ok(false) => Ok(None),
            Err(_) => Err(SourceError::Closed("sender dropped".to_string())),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
