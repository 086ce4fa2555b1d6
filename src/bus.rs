//! In-process publish/subscribe registry.
//!
//! Decouples whoever produces an event (ingestion, viewer lifecycle) from
//! whoever reacts to it. Delivery is synchronous and single-threaded: a
//! `publish` call returns after every subscriber has run.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::data::{IngestReport, SeriesKey};

/// Published after each ingestion cycle that received a payload.
pub const STORE_INGESTED: &str = "store.ingested";
/// Published when a series viewer opens.
pub const VIEWER_OPENED: &str = "viewer.opened";
/// Published when a series viewer closes.
pub const VIEWER_CLOSED: &str = "viewer.closed";

/// Process-unique identity of a subscriber.
///
/// Drawn from a global sequence starting at 1 when the subscribing object
/// is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate the next id in the sequence.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events the dashboard publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Ingested(IngestReport),
    ViewerOpened(SeriesKey),
    ViewerClosed(SeriesKey),
}

type Callback<T> = Box<dyn FnMut(&T) -> anyhow::Result<()>>;

/// Per-event registry of subscriber callbacks.
pub struct EventBus<T> {
    topics: HashMap<String, Vec<(SubscriberId, Callback<T>)>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Register `callback` for `event` under `id`.
    ///
    /// Subscribing an id that is already registered for the event replaces
    /// its callback and keeps its place in the delivery order.
    pub fn subscribe<F>(&mut self, event: &str, id: SubscriberId, callback: F)
    where
        F: FnMut(&T) -> anyhow::Result<()> + 'static,
    {
        let subscribers = self.topics.entry(event.to_string()).or_default();
        match subscribers.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = Box::new(callback),
            None => subscribers.push((id, Box::new(callback))),
        }
    }

    /// Remove `id` from `event`. Returns true if it was registered.
    pub fn unsubscribe(&mut self, event: &str, id: SubscriberId) -> bool {
        let Some(subscribers) = self.topics.get_mut(event) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    /// Deliver `data` to every subscriber of `event`, in registration order.
    ///
    /// A subscriber that returns an error is logged and skipped; the rest
    /// still run and the publisher never sees the failure. Returns the number
    /// of subscribers that handled the event successfully.
    pub fn publish(&mut self, event: &str, data: &T) -> usize {
        let Some(subscribers) = self.topics.get_mut(event) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, callback) in subscribers.iter_mut() {
            match callback(data) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(event, subscriber = %id, error = %e, "subscriber failed"),
            }
        }
        delivered
    }

    /// Number of subscribers currently registered for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.topics.get(event).map_or(0, Vec::len)
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> =
            self.topics.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}
