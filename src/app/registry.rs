//! Multi-subject registry.
//!
//! An explicit map from subject id to that subject's [`SubjectTracker`],
//! plus the [`TickScheduler`] that drives each subject's periodic tick.
//! Subjects share nothing; an operation on one never touches another.
//!
//! Removing a subject is synchronous teardown: its timer is cancelled
//! and any open walk is discarded (and handed back to the caller, who
//! may archive it or call `force_end` first).

use std::collections::HashMap;

use log::{info, warn};

use crate::SubjectId;
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::fix::{Confidence, GpsFix, Timestamp};
use crate::geofence::GeofenceZone;
use crate::scheduler::TickScheduler;
use crate::session::{EndTrigger, StartTrigger, WalkSession};
use crate::status::TrackerStatus;

use super::commands::TrackerCommand;
use super::ports::{EventSink, TickDelegate};
use super::service::{SubjectProfile, SubjectTracker};

#[derive(Default)]
pub struct TrackerRegistry {
    trackers: HashMap<SubjectId, SubjectTracker>,
    scheduler: TickScheduler,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Create a tracker for a new subject and start its tick timer.
    pub fn add_subject(
        &mut self,
        profile: SubjectProfile,
        zones: Vec<GeofenceZone>,
        config: TrackerConfig,
        now: Timestamp,
    ) -> Result<()> {
        if self.trackers.contains_key(&profile.id) {
            return Err(Error::DuplicateSubject);
        }
        let tracker = SubjectTracker::new(profile, zones, config)?;
        self.insert(tracker, now);
        Ok(())
    }

    /// Register an already-built tracker (e.g. one restored from a
    /// checkpoint).
    pub fn add_tracker(&mut self, tracker: SubjectTracker, now: Timestamp) -> Result<()> {
        if self.trackers.contains_key(tracker.subject_id()) {
            return Err(Error::DuplicateSubject);
        }
        self.insert(tracker, now);
        Ok(())
    }

    /// Tear a subject down.  Returns the open walk that was discarded.
    pub fn remove_subject(&mut self, subject: &str) -> Result<Option<WalkSession>> {
        let tracker = self.trackers.remove(subject).ok_or(Error::UnknownSubject)?;
        self.scheduler.deregister(subject);
        let abandoned = tracker.active_session().cloned();
        match &abandoned {
            Some(s) => warn!("Registry: '{}' removed, discarding open walk {}", subject, s.id),
            None => info!("Registry: '{}' removed", subject),
        }
        Ok(abandoned)
    }

    // ── Keyed inbound operations ──────────────────────────────

    pub fn submit_fix(
        &mut self,
        subject: &str,
        fix: GpsFix,
        sink: &mut impl EventSink,
    ) -> Result<Confidence> {
        self.tracker_mut(subject)?.submit_fix(fix, sink)
    }

    pub fn start_walk(
        &mut self,
        subject: &str,
        trigger: StartTrigger,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<&WalkSession> {
        self.tracker_mut(subject)?.start_walk(trigger, at, sink)
    }

    pub fn end_walk(
        &mut self,
        subject: &str,
        trigger: EndTrigger,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<WalkSession> {
        self.tracker_mut(subject)?.end_walk(trigger, at, sink)
    }

    pub fn force_end(
        &mut self,
        subject: &str,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<Option<WalkSession>> {
        Ok(self.tracker_mut(subject)?.force_end(at, sink))
    }

    pub fn set_zones(&mut self, subject: &str, zones: Vec<GeofenceZone>) -> Result<()> {
        self.tracker_mut(subject)?.set_zones(zones)
    }

    pub fn set_auto_detection(&mut self, subject: &str, enabled: bool) -> Result<()> {
        self.tracker_mut(subject)?.set_auto_detection(enabled);
        Ok(())
    }

    /// Tick one subject immediately, outside its schedule.
    pub fn tick(&mut self, subject: &str, now: Timestamp, sink: &mut impl EventSink) -> Result<()> {
        self.tracker_mut(subject)?.tick(now, sink)
    }

    /// Hot-swap a subject's thresholds; its tick interval follows.
    pub fn update_config(
        &mut self,
        subject: &str,
        config: TrackerConfig,
        now: Timestamp,
    ) -> Result<()> {
        let interval_ms = config.tick_interval_ms();
        self.tracker_mut(subject)?.update_config(config)?;
        self.scheduler.set_interval(subject, interval_ms, now);
        Ok(())
    }

    pub fn update_profile(&mut self, profile: SubjectProfile) -> Result<()> {
        self.tracker_mut(&profile.id)?.update_profile(profile)
    }

    /// Route a command to one subject.  `now` re-bases the tick timer
    /// when the command changes the subject's config.
    pub fn dispatch(
        &mut self,
        subject: &str,
        cmd: TrackerCommand,
        now: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            TrackerCommand::UpdateConfig(config) => self.update_config(subject, config, now),
            cmd => self.tracker_mut(subject)?.handle_command(cmd, sink),
        }
    }

    // ── Timer ─────────────────────────────────────────────────

    /// Run the tick for every subject whose timer is due.  Returns the
    /// number of ticks run.
    pub fn advance(&mut self, now: Timestamp, sink: &mut impl EventSink) -> usize {
        let mut dispatch = TickDispatch {
            trackers: &mut self.trackers,
            sink,
        };
        self.scheduler.poll(now, &mut dispatch)
    }

    /// Earliest pending tick deadline across all subjects.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.scheduler.next_deadline()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn get(&self, subject: &str) -> Option<&SubjectTracker> {
        self.trackers.get(subject)
    }

    pub fn status(&self, subject: &str) -> Result<&TrackerStatus> {
        Ok(self.tracker(subject)?.status())
    }

    pub fn active_session(&self, subject: &str) -> Result<Option<&WalkSession>> {
        Ok(self.tracker(subject)?.active_session())
    }

    /// Registered subject ids, sorted.
    pub fn subjects(&self) -> Vec<&SubjectId> {
        let mut ids: Vec<_> = self.trackers.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    // ── Internal ──────────────────────────────────────────────

    fn insert(&mut self, tracker: SubjectTracker, now: Timestamp) {
        let id = tracker.subject_id().clone();
        self.scheduler
            .register(id.clone(), tracker.config().tick_interval_ms(), now);
        info!("Registry: '{}' added", id);
        self.trackers.insert(id, tracker);
    }

    fn tracker(&self, subject: &str) -> Result<&SubjectTracker> {
        self.trackers.get(subject).ok_or(Error::UnknownSubject)
    }

    fn tracker_mut(&mut self, subject: &str) -> Result<&mut SubjectTracker> {
        self.trackers.get_mut(subject).ok_or(Error::UnknownSubject)
    }
}

/// Bridges scheduler callbacks to tracker ticks.
struct TickDispatch<'a, S> {
    trackers: &'a mut HashMap<SubjectId, SubjectTracker>,
    sink: &'a mut S,
}

impl<S: EventSink> TickDelegate for TickDispatch<'_, S> {
    fn on_tick_due(&mut self, subject: &str, now: Timestamp) {
        let Some(tracker) = self.trackers.get_mut(subject) else {
            warn!("Registry: tick for unknown subject '{}'", subject);
            return;
        };
        if let Err(e) = tracker.tick(now, &mut *self.sink) {
            warn!("Registry: tick for '{}' failed: {}", subject, e);
        }
    }
}
