//! Automatic walk start/stop detection.
//!
//! The decision itself is the pure function [`decide`]: it sees one
//! [`Observation`] (a fix or a timer tick) plus the current session and
//! dwell timer, and returns at most one [`AutoAction`].  The
//! [`AutoWalkDetector`] only owns the dwell timer ("at home since").
//!
//! ```text
//!  fix: Exited(home), no session, enabled      ──▶ Start
//!  fix/tick: Auto session, home for >= dwell   ──▶ Stop(Auto)
//!  tick: Auto session, silent for > staleness  ──▶ Stop(AutoTimeout)
//! ```
//!
//! Manual sessions are never closed here.

use crate::fix::Timestamp;
use crate::geofence::{HOME_ZONE, ZoneTransition};
use crate::session::{EndTrigger, StartTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAction {
    Start,
    Stop(EndTrigger),
}

/// What woke the detector.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Fix {
        timestamp: Timestamp,
        transitions: &'a [ZoneTransition],
    },
    Tick {
        now: Timestamp,
    },
}

/// Everything [`decide`] looks at.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    pub observation: Observation<'a>,
    pub enabled: bool,
    /// Trigger and start time of the open session, if any.
    pub session: Option<(StartTrigger, Timestamp)>,
    pub home_since: Option<Timestamp>,
    pub last_fix_at: Option<Timestamp>,
    pub dwell_ms: u64,
    pub staleness_ms: u64,
}

/// Pure auto-detection rule.
pub fn decide(input: &DetectorInput<'_>) -> Option<AutoAction> {
    match input.observation {
        Observation::Fix {
            timestamp,
            transitions,
        } => {
            let left_home = transitions
                .iter()
                .any(|t| matches!(t, ZoneTransition::Exited(name) if name == HOME_ZONE));
            if left_home && input.enabled && input.session.is_none() {
                return Some(AutoAction::Start);
            }
            dwell_elapsed(input, timestamp).then_some(AutoAction::Stop(EndTrigger::Auto))
        }
        Observation::Tick { now } => {
            let (trigger, started) = input.session?;
            if trigger != StartTrigger::Auto {
                return None;
            }
            let last_seen = input.last_fix_at.map_or(started, |t| t.max(started));
            if now.saturating_sub(last_seen) > input.staleness_ms {
                return Some(AutoAction::Stop(EndTrigger::AutoTimeout));
            }
            dwell_elapsed(input, now).then_some(AutoAction::Stop(EndTrigger::Auto))
        }
    }
}

fn dwell_elapsed(input: &DetectorInput<'_>, now: Timestamp) -> bool {
    matches!(input.session, Some((StartTrigger::Auto, _)))
        && input
            .home_since
            .is_some_and(|since| now.saturating_sub(since) >= input.dwell_ms)
}

// ═══════════════════════════════════════════════════════════════
//  Dwell timer
// ═══════════════════════════════════════════════════════════════

/// Owns the "continuously at home since" timestamp.
#[derive(Debug, Clone, Default)]
pub struct AutoWalkDetector {
    home_since: Option<Timestamp>,
}

impl AutoWalkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(home_since: Option<Timestamp>) -> Self {
        Self { home_since }
    }

    pub fn home_since(&self) -> Option<Timestamp> {
        self.home_since
    }

    /// Record whether an accepted fix was inside home.  The timer starts
    /// at the first fix inside and resets on the first fix outside.
    pub fn observe_home(&mut self, at_home: bool, timestamp: Timestamp) {
        if at_home {
            self.home_since.get_or_insert(timestamp);
        } else {
            self.home_since = None;
        }
    }
}
