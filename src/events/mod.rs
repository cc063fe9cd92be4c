//! Structured routing events.
//!
//! Pipelines never format log lines themselves. Every log-worthy occurrence
//! is a [`RouteEvent`] handed to an [`EventSink`]; the production sink
//! renders it through `tracing`, tests collect it with [`MemorySink`].

mod types;

pub use types::{RawInput, RouteEvent, Severity, Stage};

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

/// Destination for routing events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RouteEvent);
}

/// Shared event sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that reports events through `tracing` at their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RouteEvent) {
        let name = event.name();
        match event.severity() {
            Severity::Debug => debug!(target: "smsrouter::events", event = name, "{}", event),
            Severity::Info => info!(target: "smsrouter::events", event = name, "{}", event),
            Severity::Warn => warn!(target: "smsrouter::events", event = name, "{}", event),
            Severity::Error => error!(target: "smsrouter::events", event = name, "{}", event),
        }
    }
}

/// In-memory sink, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RouteEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<RouteEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RouteEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: RouteEvent) {
        self.lock().push(event);
    }
}
