use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex, PoisonError,
};

use crate::RunwayEvent;

/// Consumer of operation events.
///
/// The CLI renders them as progress bars; tests collect them.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunwayEvent);
}

/// Forwards events over an mpsc channel to a consumer thread.
pub struct ChannelSink {
    sender: Sender<RunwayEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<RunwayEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunwayEvent) {
        // A dropped receiver just means nobody is rendering anymore.
        let _ = self.sender.send(event);
    }
}

/// Discards everything. Used for `--no-progress` and JSON output.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: RunwayEvent) {}
}

/// Stores every event for later inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<RunwayEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<RunwayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: RunwayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
