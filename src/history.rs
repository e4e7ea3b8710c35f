//! Bounded log of recently closed walks.
//!
//! Only summaries are kept (no paths), and only the last
//! [`WALK_LOG_CAPACITY`] of them.  Long-term history belongs to the
//! caller; this log exists so "walks today" style totals can be derived
//! without a round trip to storage.

use heapless::HistoryBuffer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fix::Timestamp;
use crate::session::{EndTrigger, StartTrigger, WalkSession};

pub const WALK_LOG_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub id: Uuid,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub start_trigger: StartTrigger,
    pub end_trigger: EndTrigger,
    pub distance_m: f64,
    pub duration_s: f64,
    pub calories_kcal: f64,
}

impl WalkSummary {
    /// Summarise a closed session; `None` if it is still open.
    pub fn from_session(session: &WalkSession) -> Option<Self> {
        Some(Self {
            id: session.id,
            start_time: session.start_time,
            end_time: session.end_time?,
            start_trigger: session.start_trigger,
            end_trigger: session.end_trigger?,
            distance_m: session.distance_m,
            duration_s: session.duration_s,
            calories_kcal: session.calories_kcal,
        })
    }
}

/// Sums over a set of walks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotals {
    pub walks: u32,
    pub distance_m: f64,
    pub duration_s: f64,
    pub calories_kcal: f64,
}

pub struct WalkLog {
    entries: HistoryBuffer<WalkSummary, WALK_LOG_CAPACITY>,
}

impl Default for WalkLog {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkLog {
    pub fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
        }
    }

    pub fn record(&mut self, summary: WalkSummary) {
        self.entries.write(summary);
    }

    pub fn last_walk(&self) -> Option<&WalkSummary> {
        self.entries.recent()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &WalkSummary> {
        self.entries.oldest_ordered()
    }

    /// Totals over walks that ended at or after `since`.
    pub fn totals_since(&self, since: Timestamp) -> ActivityTotals {
        self.iter()
            .filter(|w| w.end_time >= since)
            .fold(ActivityTotals::default(), |mut acc, w| {
                acc.walks += 1;
                acc.distance_m += w.distance_m;
                acc.duration_s += w.duration_s;
                acc.calories_kcal += w.calories_kcal;
                acc
            })
    }

    pub fn to_vec(&self) -> Vec<WalkSummary> {
        self.iter().cloned().collect()
    }

    pub fn from_summaries(summaries: Vec<WalkSummary>) -> Self {
        let mut log = Self::new();
        for s in summaries {
            log.record(s);
        }
        log
    }
}
