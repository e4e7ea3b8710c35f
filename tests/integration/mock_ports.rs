//! Mock port adapters for integration tests.
//!
//! Records every emitted event so tests can assert on the full event
//! history, and provides a hand-driven clock for worker tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use pawtrack::app::events::TrackerEvent;
use pawtrack::app::ports::{Clock, EventSink};
use pawtrack::fix::Timestamp;

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<TrackerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(TrackerEvent::kind).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &TrackerEvent) {
        self.events.push(event.clone());
    }
}

// ── SharedSink (crosses into a worker thread) ─────────────────

#[derive(Clone, Default)]
pub struct SharedSink {
    events: Arc<Mutex<Vec<TrackerEvent>>>,
}

#[allow(dead_code)]
impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TrackerEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(TrackerEvent::kind).collect()
    }
}

impl EventSink for SharedSink {
    fn emit(&mut self, event: &TrackerEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ── ManualClock ───────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now: Timestamp) -> Self {
        let clock = Self::default();
        clock.set(now);
        clock
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
