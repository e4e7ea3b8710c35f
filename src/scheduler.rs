//! Per-subject periodic tick scheduler.
//!
//! The tick is the only time-driven input to a tracker.  The scheduler
//! keeps one deadline per registered subject and notifies a
//! [`TickDelegate`] when deadlines pass; the registry implements the
//! delegate by calling `SubjectTracker::tick`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     TickScheduler                            │
//! │                                                              │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐                    │
//! │  │ "rex"    │  │ "bella"  │  │ "max"    │   next_due / every │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘                    │
//! │       │             │             │                          │
//! │       ▼             ▼             ▼                          │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              TickDelegate::on_tick_due                  │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                 SubjectTracker::tick(now)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deregistering a subject cancels its timer: no tick fires for it
//! afterwards, even within the same `poll` call.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::SubjectId;
use crate::app::ports::TickDelegate;
use crate::fix::Timestamp;

// ═══════════════════════════════════════════════════════════════
//  Schedule entries
// ═══════════════════════════════════════════════════════════════

/// Internal bookkeeping for one subject's timer.
#[derive(Debug, Clone, Copy)]
struct TickEntry {
    interval_ms: u64,
    next_due: Timestamp,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Deadline table, iterated in subject-id order.
#[derive(Debug, Clone, Default)]
pub struct TickScheduler {
    entries: BTreeMap<SubjectId, TickEntry>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a subject.  The first tick is due one
    /// interval after `now`.
    pub fn register(&mut self, subject: SubjectId, interval_ms: u64, now: Timestamp) {
        let interval_ms = interval_ms.max(1);
        info!("Scheduler: '{}' every {} ms", subject, interval_ms);
        self.entries.insert(
            subject,
            TickEntry {
                interval_ms,
                next_due: now.saturating_add(interval_ms),
            },
        );
    }

    /// Cancel a subject's timer.  Returns `false` if it was not registered.
    pub fn deregister(&mut self, subject: &str) -> bool {
        let removed = self.entries.remove(subject).is_some();
        if removed {
            info!("Scheduler: '{}' deregistered", subject);
        }
        removed
    }

    /// Change a subject's interval; the next tick is re-based on `now`.
    pub fn set_interval(&mut self, subject: &str, interval_ms: u64, now: Timestamp) -> bool {
        match self.entries.get_mut(subject) {
            Some(entry) => {
                entry.interval_ms = interval_ms.max(1);
                entry.next_due = now.saturating_add(entry.interval_ms);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, subject: &str) -> bool {
        self.entries.contains_key(subject)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest pending deadline, if any subject is registered.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.entries.values().map(|e| e.next_due).min()
    }

    /// Fire every subject whose deadline is at or before `now`.
    ///
    /// Each due subject fires once per poll, however many intervals were
    /// missed; its next deadline is one interval after `now`.  Returns the
    /// number of ticks fired.
    pub fn poll(&mut self, now: Timestamp, delegate: &mut dyn TickDelegate) -> usize {
        let mut fired = 0;
        for (subject, entry) in &mut self.entries {
            if entry.next_due > now {
                continue;
            }
            let missed = (now - entry.next_due) / entry.interval_ms;
            if missed > 0 {
                debug!("Scheduler: '{}' skipped {} ticks", subject, missed);
            }
            entry.next_due = now.saturating_add(entry.interval_ms);
            delegate.on_tick_due(subject, now);
            fired += 1;
        }
        fired
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Test delegate that records fire events.
    struct RecordingDelegate {
        fires: Vec<(String, Timestamp)>,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self { fires: Vec::new() }
        }
    }

    impl TickDelegate for RecordingDelegate {
        fn on_tick_due(&mut self, subject: &str, now: Timestamp) {
            self.fires.push((subject.to_string(), now));
        }
    }

    #[test]
    fn fires_at_interval() {
        let mut sched = TickScheduler::new();
        let mut delegate = RecordingDelegate::new();
        sched.register("rex".into(), 60_000, 0);

        assert_eq!(sched.poll(59_999, &mut delegate), 0);
        assert!(delegate.fires.is_empty());

        assert_eq!(sched.poll(60_000, &mut delegate), 1);
        assert_eq!(delegate.fires, vec![("rex".to_string(), 60_000)]);
        assert_eq!(sched.next_deadline(), Some(120_000));
    }

    #[test]
    fn missed_intervals_fire_once() {
        let mut sched = TickScheduler::new();
        let mut delegate = RecordingDelegate::new();
        sched.register("rex".into(), 1_000, 0);

        sched.poll(10_500, &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
        assert_eq!(sched.next_deadline(), Some(11_500));
    }

    #[test]
    fn deregistered_subject_never_fires() {
        let mut sched = TickScheduler::new();
        let mut delegate = RecordingDelegate::new();
        sched.register("rex".into(), 1_000, 0);
        sched.register("bella".into(), 1_000, 0);

        assert!(sched.deregister("rex"));
        assert!(!sched.deregister("rex"));
        sched.poll(5_000, &mut delegate);
        assert_eq!(delegate.fires, vec![("bella".to_string(), 5_000)]);
    }

    #[test]
    fn subjects_have_independent_deadlines() {
        let mut sched = TickScheduler::new();
        let mut delegate = RecordingDelegate::new();
        sched.register("rex".into(), 1_000, 0);
        sched.register("bella".into(), 5_000, 0);

        sched.poll(1_000, &mut delegate);
        assert_eq!(delegate.fires.len(), 1);
        assert_eq!(delegate.fires[0].0, "rex");
        assert_eq!(sched.next_deadline(), Some(2_000));

        assert!(sched.set_interval("rex", 10_000, 1_000));
        assert_eq!(sched.next_deadline(), Some(5_000));
    }

    #[test]
    fn empty_scheduler_does_nothing() {
        let mut sched = TickScheduler::new();
        let mut delegate = RecordingDelegate::new();
        assert!(sched.is_empty());
        assert_eq!(sched.next_deadline(), None);
        assert_eq!(sched.poll(u64::MAX, &mut delegate), 0);
    }
}
