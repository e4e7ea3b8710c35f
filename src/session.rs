//! Walk session state machine.
//!
//! ```text
//!            start(Manual | Auto)
//!   IDLE ─────────────────────────▶ ACTIVE ──┐
//!     ▲                               │      │ fix(f): append, distance,
//!     │   end(Manual | Auto |         │      │ duration, speed, calories
//!     └──────── AutoTimeout) ─────────┘ ◀────┘
//! ```
//!
//! There is no pause: ending and restarting always opens a new session
//! with a fresh id.  The engine holds at most one session, so "two
//! active walks for one subject" is unrepresentable.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SubjectId;
use crate::error::{Error, Result, SessionError};
use crate::fix::{GpsFix, Timestamp, secs_between};
use crate::geo::{self, ActivityType};

// ---------------------------------------------------------------------------
// Triggers and states
// ---------------------------------------------------------------------------

/// What opened a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartTrigger {
    Manual,
    Auto,
}

/// What closed a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndTrigger {
    Manual,
    Auto,
    /// The tracker went silent while an auto walk was open.
    AutoTimeout,
}

/// Engine-level state for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Idle,
    Active,
}

/// Lifecycle of a single session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Ended,
}

// ---------------------------------------------------------------------------
// Session record
// ---------------------------------------------------------------------------

/// One continuous walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkSession {
    pub id: Uuid,
    pub subject_id: SubjectId,
    pub state: SessionState,
    pub start_trigger: StartTrigger,
    pub end_trigger: Option<EndTrigger>,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// Accepted fixes in arrival order.
    pub path: Vec<GpsFix>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub current_speed_kmh: f64,
    pub calories_kcal: f64,
}

impl WalkSession {
    fn open(subject_id: SubjectId, trigger: StartTrigger, at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            state: SessionState::Active,
            start_trigger: trigger,
            end_trigger: None,
            start_time: at,
            end_time: None,
            path: Vec::new(),
            distance_m: 0.0,
            duration_s: 0.0,
            current_speed_kmh: 0.0,
            calories_kcal: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn distance_km(&self) -> f64 {
        geo::meters_to_km(self.distance_m)
    }

    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.path.last()
    }

    /// Metrics snapshot without the path.
    pub fn progress(&self) -> WalkProgress {
        WalkProgress {
            id: self.id,
            subject_id: self.subject_id.clone(),
            start_trigger: self.start_trigger,
            start_time: self.start_time,
            last_fix: self.path.last().copied(),
            points: self.path.len(),
            distance_m: self.distance_m,
            duration_s: self.duration_s,
            current_speed_kmh: self.current_speed_kmh,
            calories_kcal: self.calories_kcal,
        }
    }

    /// Copy of the record whose path holds only `path[from..]`.
    fn with_path_from(&self, from: usize) -> Self {
        Self {
            id: self.id,
            subject_id: self.subject_id.clone(),
            state: self.state,
            start_trigger: self.start_trigger,
            end_trigger: self.end_trigger,
            start_time: self.start_time,
            end_time: self.end_time,
            path: self.path[from..].to_vec(),
            distance_m: self.distance_m,
            duration_s: self.duration_s,
            current_speed_kmh: self.current_speed_kmh,
            calories_kcal: self.calories_kcal,
        }
    }
}

/// Per-fix view of an open walk.  Carries the newest fix and the point
/// count instead of the path, so its size does not grow with the walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkProgress {
    pub id: Uuid,
    pub subject_id: SubjectId,
    pub start_trigger: StartTrigger,
    pub start_time: Timestamp,
    pub last_fix: Option<GpsFix>,
    pub points: usize,
    pub distance_m: f64,
    pub duration_s: f64,
    pub current_speed_kmh: f64,
    pub calories_kcal: f64,
}

/// Most path points a checkpoint keeps for an open walk.
pub const CHECKPOINT_TAIL_MAX: usize = 512;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Open session plus the cumulative distance at each path point, which
/// keeps the trailing-window speed from re-running Haversine.
#[derive(Debug, Clone)]
struct ActiveWalk {
    session: WalkSession,
    cumulative_m: Vec<f64>,
}

/// Per-subject session engine.
#[derive(Debug, Clone)]
pub struct WalkSessionEngine {
    subject_id: SubjectId,
    active: Option<ActiveWalk>,
    weight_kg: f64,
    speed_window_ms: u64,
}

impl WalkSessionEngine {
    pub fn new(subject_id: SubjectId, weight_kg: f64, speed_window_ms: u64) -> Self {
        Self {
            subject_id,
            active: None,
            weight_kg,
            speed_window_ms,
        }
    }

    pub fn state(&self) -> EngineState {
        if self.active.is_some() {
            EngineState::Active
        } else {
            EngineState::Idle
        }
    }

    pub fn active(&self) -> Option<&WalkSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn set_weight(&mut self, weight_kg: f64) {
        self.weight_kg = weight_kg;
    }

    pub fn set_speed_window(&mut self, window_ms: u64) {
        self.speed_window_ms = window_ms;
    }

    /// `Idle --start--> Active`.
    pub fn start(&mut self, trigger: StartTrigger, at: Timestamp) -> Result<&WalkSession> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive.into());
        }

        let session = WalkSession::open(self.subject_id.clone(), trigger, at);
        info!(
            "Walk[{}]: Idle -> Active ({:?}, id={})",
            self.subject_id, trigger, session.id
        );
        let walk = self.active.insert(ActiveWalk {
            session,
            cumulative_m: Vec::new(),
        });
        Ok(&walk.session)
    }

    /// `Active --fix--> Active`: append and recompute metrics.
    ///
    /// Fixes older than the session start are ignored; they predate the
    /// walk and would produce a negative duration.
    pub fn record_fix(&mut self, fix: &GpsFix) -> Result<&WalkSession> {
        let weight_kg = self.weight_kg;
        let window_ms = self.speed_window_ms;
        let walk = self
            .active
            .as_mut()
            .ok_or(Error::Session(SessionError::NoActiveSession))?;

        if fix.timestamp < walk.session.start_time {
            debug!(
                "Walk[{}]: ignoring fix at {} before session start {}",
                walk.session.subject_id, fix.timestamp, walk.session.start_time
            );
            return Ok(&walk.session);
        }

        let segment_m = match walk.session.path.last() {
            Some(prev) if fix.timestamp <= prev.timestamp => {
                error!(
                    "Walk[{}]: out-of-order fix reached the session engine ({} <= {})",
                    walk.session.subject_id, fix.timestamp, prev.timestamp
                );
                debug_assert!(false, "out-of-order fix reached the session engine");
                return Err(Error::Invariant("out-of-order fix reached the session engine"));
            }
            Some(prev) => geo::distance(prev.position, fix.position)
                .map_err(|_| Error::Invariant("unvalidated fix reached the session engine"))?,
            None => 0.0,
        };

        let s = &mut walk.session;
        s.path.push(*fix);
        s.distance_m += segment_m;
        walk.cumulative_m.push(s.distance_m);
        s.duration_s = secs_between(s.start_time, fix.timestamp);
        s.current_speed_kmh = window_speed(&s.path, &walk.cumulative_m, window_ms);
        s.calories_kcal = estimate_walk_calories(weight_kg, s.distance_m, s.duration_s);

        debug!(
            "Walk[{}]: {:.1} m, {:.0} s, {:.1} km/h, {:.1} kcal",
            s.subject_id, s.distance_m, s.duration_s, s.current_speed_kmh, s.calories_kcal
        );
        Ok(&walk.session)
    }

    /// `Active --end--> Idle`: finalise and hand back the closed session.
    ///
    /// A timeout closes the walk at its last fix (or its start when it
    /// never received one) so the silent period is not counted.
    pub fn end(&mut self, trigger: EndTrigger, at: Timestamp) -> Result<WalkSession> {
        let walk = self
            .active
            .take()
            .ok_or(Error::Session(SessionError::NoActiveSession))?;
        let mut s = walk.session;

        let last_ts = s.path.last().map_or(s.start_time, |f| f.timestamp);
        let end_time = match trigger {
            EndTrigger::AutoTimeout => last_ts,
            EndTrigger::Manual | EndTrigger::Auto => at.max(last_ts),
        };

        s.state = SessionState::Ended;
        s.end_trigger = Some(trigger);
        s.end_time = Some(end_time);
        s.duration_s = secs_between(s.start_time, end_time);
        s.calories_kcal = estimate_walk_calories(self.weight_kg, s.distance_m, s.duration_s);

        info!(
            "Walk[{}]: Active -> Idle ({:?}, id={}, {}, {:.0} s)",
            s.subject_id,
            trigger,
            s.id,
            geo::format_distance(s.distance_m),
            s.duration_s
        );
        Ok(s)
    }

    /// The open session as it goes into a checkpoint.
    ///
    /// Metrics are kept whole; the path is cut to the fixes inside the
    /// trailing speed window (at most [`CHECKPOINT_TAIL_MAX`]), so the
    /// snapshot stays bounded however long the walk runs.
    pub fn snapshot(&self) -> Option<WalkSession> {
        let s = &self.active.as_ref()?.session;
        let Some(last) = s.path.last() else {
            return Some(s.with_path_from(0));
        };
        let cutoff = last.timestamp.saturating_sub(self.speed_window_ms);
        let from = s
            .path
            .partition_point(|f| f.timestamp < cutoff)
            .max(s.path.len().saturating_sub(CHECKPOINT_TAIL_MAX));
        Some(s.with_path_from(from))
    }

    /// Reinstate an open session from a checkpoint.  Ended sessions are
    /// not reinstated.
    ///
    /// The path may be only the tail of the walk; `distance_m` stays as
    /// recorded and new segments add on top of it.
    pub fn restore(&mut self, session: Option<WalkSession>) -> Result<()> {
        self.active = match session {
            Some(s) if s.is_active() => {
                if s.subject_id != self.subject_id {
                    return Err(Error::Invariant("checkpoint session belongs to another subject"));
                }
                let mut cumulative_m = rebuild_cumulative(&s.path)?;
                let tail_m = cumulative_m.last().copied().unwrap_or(0.0);
                let base_m = (s.distance_m - tail_m).max(0.0);
                for c in &mut cumulative_m {
                    *c += base_m;
                }
                Some(ActiveWalk {
                    session: s,
                    cumulative_m,
                })
            }
            _ => None,
        };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

fn estimate_walk_calories(weight_kg: f64, distance_m: f64, duration_s: f64) -> f64 {
    geo::estimate_calories(
        weight_kg,
        geo::meters_to_km(distance_m),
        duration_s / 60.0,
        ActivityType::Walking,
    )
}

/// Distance over the trailing window divided by the window's elapsed
/// time.  Zero with fewer than two fixes in the window.
fn window_speed(path: &[GpsFix], cumulative_m: &[f64], window_ms: u64) -> f64 {
    let Some(last) = path.last() else {
        return 0.0;
    };
    let cutoff = last.timestamp.saturating_sub(window_ms);
    let first = path.partition_point(|f| f.timestamp < cutoff);
    let last_idx = path.len() - 1;
    if last_idx <= first {
        return 0.0;
    }

    let meters = cumulative_m[last_idx] - cumulative_m[first];
    let secs = secs_between(path[first].timestamp, last.timestamp);
    geo::speed_kmh(meters, secs)
}

fn rebuild_cumulative(path: &[GpsFix]) -> Result<Vec<f64>> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(path.len());
    for (i, fix) in path.iter().enumerate() {
        if i > 0 {
            total += geo::distance(path[i - 1].position, fix.position)?;
        }
        out.push(total);
    }
    Ok(out)
}
