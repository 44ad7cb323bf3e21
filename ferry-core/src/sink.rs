//! Outbound event sinks.
//!
//! Emitters hand every serialized wire event to an injected [`EventSink`],
//! one event per call. The HTTP layer that frames events into SSE lives
//! outside this crate.

use std::collections::VecDeque;

/// Receives one serialized JSON event per call.
pub trait EventSink: Send {
    fn accept(&mut self, event: Vec<u8>);
}

/// Drains previously accepted events, in order.
pub trait EventBuffer {
    fn drain_events(&mut self) -> Vec<Vec<u8>>;
}

/// In-memory sink used by the bridge pump and by tests.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: VecDeque<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for BufferSink {
    fn accept(&mut self, event: Vec<u8>) {
        self.events.push_back(event);
    }
}

impl EventBuffer for BufferSink {
    fn drain_events(&mut self) -> Vec<Vec<u8>> {
        self.events.drain(..).collect()
    }
}
