//! Per-subject tracking service, the hexagonal core.
//!
//! [`SubjectTracker`] owns everything one tracked subject needs: the fix
//! validator, geofence evaluator, walk session engine, auto-walk dwell
//! timer, recent-fix window, published status and walk log.  It exposes a
//! platform-agnostic API; all output flows through an [`EventSink`]
//! injected at call sites.
//!
//! ```text
//!                 ┌──────────────────────────────────────┐
//!  submit_fix ──▶ │ FixValidator                         │
//!  start/end  ──▶ │   ▼                                  │
//!  tick       ──▶ │ GeofenceEvaluator ─▶ AutoWalkDetector│ ──▶ EventSink
//!                 │   ▼                       ▼          │
//!                 │ WalkSessionEngine ─▶ StatusAggregator│
//!                 └──────────────────────────────────────┘
//! ```
//!
//! Every operation carries its own timestamp; the tracker never reads a
//! clock and never blocks.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::SubjectId;
use crate::autowalk::{self, AutoAction, AutoWalkDetector, DetectorInput, Observation};
use crate::checkpoint::{self, TrackerCheckpoint};
use crate::config::TrackerConfig;
use crate::error::{Error, Result, SessionError};
use crate::fix::{Confidence, FixValidator, GpsFix, RecentFixes, Timestamp};
use crate::geofence::{self, GeofenceEvaluator, GeofenceZone, ZoneMembership, ZoneSet, ZoneTransition};
use crate::history::{WalkLog, WalkSummary};
use crate::session::{EndTrigger, EngineState, StartTrigger, WalkSession, WalkSessionEngine};
use crate::status::{self, StatusInput, TrackerStatus};

use super::commands::TrackerCommand;
use super::events::TrackerEvent;
use super::ports::{ConfigError, EventSink, StorageError, StoragePort};

// ───────────────────────────────────────────────────────────────
// Subject profile
// ───────────────────────────────────────────────────────────────

/// Caller-owned facts about the subject (from the subject registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub id: SubjectId,
    pub name: String,
    /// Body weight used for calorie estimates.
    pub weight_kg: f64,
    /// Whether leaving home opens a walk automatically.
    pub auto_detection: bool,
}

impl SubjectProfile {
    pub fn new(id: impl Into<SubjectId>, name: impl Into<String>, weight_kg: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight_kg,
            auto_detection: false,
        }
    }

    pub fn with_auto_detection(mut self, enabled: bool) -> Self {
        self.auto_detection = enabled;
        self
    }
}

// ───────────────────────────────────────────────────────────────
// SubjectTracker
// ───────────────────────────────────────────────────────────────

/// Tracking state and orchestration for one subject.
pub struct SubjectTracker {
    profile: SubjectProfile,
    config: TrackerConfig,
    validator: FixValidator,
    zones: ZoneSet,
    geofence: GeofenceEvaluator,
    engine: WalkSessionEngine,
    detector: AutoWalkDetector,
    recent: RecentFixes,
    status: TrackerStatus,
    history: WalkLog,
    checkpoint_dirty: bool,
}

impl SubjectTracker {
    /// Construct a tracker with no fixes and no open walk.
    ///
    /// `zones` must contain a zone named `"home"`.
    pub fn new(
        profile: SubjectProfile,
        zones: Vec<GeofenceZone>,
        config: TrackerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let zones = ZoneSet::new(zones, &config)?;
        let engine = WalkSessionEngine::new(
            profile.id.clone(),
            profile.weight_kg,
            config.speed_window_ms(),
        );

        info!(
            "Tracker[{}]: created ({} zones, auto_detection={})",
            profile.id,
            zones.len(),
            profile.auto_detection
        );

        Ok(Self {
            validator: FixValidator::new(&config),
            geofence: GeofenceEvaluator::new(),
            detector: AutoWalkDetector::new(),
            recent: RecentFixes::new(),
            status: TrackerStatus::unknown(0),
            history: WalkLog::new(),
            checkpoint_dirty: false,
            profile,
            config,
            zones,
            engine,
        })
    }

    // ── Fixes ─────────────────────────────────────────────────

    /// Validate and apply one position report.
    ///
    /// On rejection a `FixRejected` event is emitted and no other state
    /// changes.  On acceptance events are emitted in derivation order:
    /// zone crossings, then session changes, then the new status.
    pub fn submit_fix(&mut self, fix: GpsFix, sink: &mut impl EventSink) -> Result<Confidence> {
        let confidence = match self.validator.validate(self.recent.latest(), &fix) {
            Ok(c) => c,
            Err(reason) => {
                warn!(
                    "Tracker[{}]: fix at {} rejected: {}",
                    self.profile.id, fix.timestamp, reason
                );
                sink.emit(&TrackerEvent::FixRejected {
                    subject_id: self.profile.id.clone(),
                    reason,
                });
                return Err(reason.into());
            }
        };
        if confidence == Confidence::Degraded {
            debug!(
                "Tracker[{}]: accepting low-accuracy fix ({:.0} m)",
                self.profile.id, fix.accuracy_m
            );
        }

        // 1. Geofences (before the window push so a failure leaves no trace)
        let (membership, transitions) = self.geofence.evaluate(fix.position, &self.zones)?;
        self.recent.push(fix);
        self.emit_transitions(&transitions, sink);

        // 2. Auto detection
        self.detector.observe_home(membership.is_home(), fix.timestamp);
        let action = autowalk::decide(&DetectorInput {
            observation: Observation::Fix {
                timestamp: fix.timestamp,
                transitions: &transitions,
            },
            enabled: self.profile.auto_detection,
            session: self.session_key(),
            home_since: self.detector.home_since(),
            last_fix_at: Some(fix.timestamp),
            dwell_ms: self.config.auto_stop_dwell_ms(),
            staleness_ms: self.config.staleness_ms(),
        });

        // 3. Session
        match action {
            Some(AutoAction::Start) => {
                self.engine.start(StartTrigger::Auto, fix.timestamp)?;
                let session = self.engine.record_fix(&fix)?.clone();
                sink.emit(&TrackerEvent::SessionStarted(session));
            }
            Some(AutoAction::Stop(_)) | None => {
                if self.engine.state() == EngineState::Active {
                    let progress = self.engine.record_fix(&fix)?.progress();
                    sink.emit(&TrackerEvent::SessionProgress(progress));
                }
            }
        }
        if let Some(AutoAction::Stop(trigger)) = action {
            self.close_session(trigger, fix.timestamp, sink)?;
        }

        // 4. Status
        self.refresh_status(fix.timestamp, sink);
        self.checkpoint_dirty = true;
        Ok(confidence)
    }

    // ── Walk control ──────────────────────────────────────────

    /// Open a walk.  Fails with `AlreadyActive` if one is open.
    pub fn start_walk(
        &mut self,
        trigger: StartTrigger,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<&WalkSession> {
        if let Err(e) = self.engine.start(trigger, at) {
            warn!("Tracker[{}]: start refused: {}", self.profile.id, e);
            return Err(e);
        }
        if let Some(session) = self.engine.active() {
            sink.emit(&TrackerEvent::SessionStarted(session.clone()));
        }
        self.refresh_status(at, sink);
        self.checkpoint_dirty = true;
        self.engine
            .active()
            .ok_or(Error::Invariant("session vanished after start"))
    }

    /// Close the open walk.  Fails with `NoActiveSession` if none is open.
    pub fn end_walk(
        &mut self,
        trigger: EndTrigger,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<WalkSession> {
        if self.engine.state() == EngineState::Idle {
            warn!("Tracker[{}]: end refused: no active walk", self.profile.id);
            return Err(SessionError::NoActiveSession.into());
        }
        let closed = self.close_session(trigger, at, sink)?;
        self.refresh_status(at, sink);
        Ok(closed)
    }

    /// Close the open walk, if any, regardless of its start trigger.
    /// Used before teardown so the caller can archive the session.
    pub fn force_end(&mut self, at: Timestamp, sink: &mut impl EventSink) -> Option<WalkSession> {
        if self.engine.state() == EngineState::Idle {
            return None;
        }
        self.end_walk(EndTrigger::Manual, at, sink).ok()
    }

    // ── Timer ─────────────────────────────────────────────────

    /// Periodic timer input: auto-stop checks and status recomputation.
    pub fn tick(&mut self, now: Timestamp, sink: &mut impl EventSink) -> Result<()> {
        let action = autowalk::decide(&DetectorInput {
            observation: Observation::Tick { now },
            enabled: self.profile.auto_detection,
            session: self.session_key(),
            home_since: self.detector.home_since(),
            last_fix_at: self.recent.latest().map(|f| f.timestamp),
            dwell_ms: self.config.auto_stop_dwell_ms(),
            staleness_ms: self.config.staleness_ms(),
        });

        if let Some(AutoAction::Stop(trigger)) = action {
            self.close_session(trigger, now, sink)?;
        }
        self.refresh_status(now, sink);
        Ok(())
    }

    // ── Settings ──────────────────────────────────────────────

    /// Replace the zone list.
    ///
    /// Membership is re-based silently against the last accepted fix, so
    /// editing zones never produces Entered/Exited events by itself.
    pub fn set_zones(&mut self, zones: Vec<GeofenceZone>) -> Result<()> {
        let zones = ZoneSet::new(zones, &self.config)?;
        match self.recent.latest().copied() {
            Some(last) => {
                let m = geofence::membership(last.position, &zones)?;
                self.detector.observe_home(m.is_home(), last.timestamp);
                self.geofence = GeofenceEvaluator::restore(Some(m));
            }
            None => self.geofence = GeofenceEvaluator::new(),
        }
        info!("Tracker[{}]: {} zones installed", self.profile.id, zones.len());
        self.zones = zones;
        self.checkpoint_dirty = true;
        Ok(())
    }

    /// Toggle automatic walk detection.  An open auto walk still stops
    /// automatically after the flag is cleared.
    pub fn set_auto_detection(&mut self, enabled: bool) {
        if self.profile.auto_detection != enabled {
            info!(
                "Tracker[{}]: auto detection {}",
                self.profile.id,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.profile.auto_detection = enabled;
        self.checkpoint_dirty = true;
    }

    /// Hot-swap thresholds.  The current zones must satisfy the new
    /// radius bounds.
    pub fn update_config(&mut self, config: TrackerConfig) -> Result<()> {
        config.validate()?;
        let zones = ZoneSet::new(self.zones.to_vec(), &config)?;
        self.validator = FixValidator::new(&config);
        self.engine.set_speed_window(config.speed_window_ms());
        self.zones = zones;
        self.config = config;
        self.checkpoint_dirty = true;
        info!("Tracker[{}]: configuration updated", self.profile.id);
        Ok(())
    }

    /// Replace name, weight and auto-detection flag.  Session state is
    /// untouched; the new weight applies from the next metric update.
    pub fn update_profile(&mut self, profile: SubjectProfile) -> Result<()> {
        if profile.id != self.profile.id {
            return Err(ConfigError::ValidationFailed("profile belongs to another subject").into());
        }
        self.engine.set_weight(profile.weight_kg);
        self.profile = profile;
        self.checkpoint_dirty = true;
        Ok(())
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an inbound command (from the runtime worker, a host
    /// integration, a replay driver, etc.).
    pub fn handle_command(&mut self, cmd: TrackerCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            TrackerCommand::SubmitFix(fix) => self.submit_fix(fix, sink).map(|_| ()),
            TrackerCommand::StartWalk { trigger, at } => self.start_walk(trigger, at, sink).map(|_| ()),
            TrackerCommand::EndWalk { trigger, at } => self.end_walk(trigger, at, sink).map(|_| ()),
            TrackerCommand::ForceEnd { at } => {
                self.force_end(at, sink);
                Ok(())
            }
            TrackerCommand::SetZones(zones) => self.set_zones(zones),
            TrackerCommand::SetAutoDetection(enabled) => {
                self.set_auto_detection(enabled);
                Ok(())
            }
            TrackerCommand::Tick { now } => self.tick(now, sink),
            TrackerCommand::UpdateConfig(config) => self.update_config(config),
            TrackerCommand::UpdateProfile(profile) => self.update_profile(profile),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn subject_id(&self) -> &SubjectId {
        &self.profile.id
    }

    pub fn profile(&self) -> &SubjectProfile {
        &self.profile
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Last published status.
    pub fn status(&self) -> &TrackerStatus {
        &self.status
    }

    pub fn active_session(&self) -> Option<&WalkSession> {
        self.engine.active()
    }

    pub fn history(&self) -> &WalkLog {
        &self.history
    }

    /// Zones containing the last accepted fix.
    pub fn membership(&self) -> Option<&ZoneMembership> {
        self.geofence.current()
    }

    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.recent.latest()
    }

    // ── Checkpoints ───────────────────────────────────────────

    /// Snapshot everything needed to rebuild this tracker.
    pub fn checkpoint(&self) -> TrackerCheckpoint {
        TrackerCheckpoint {
            version: checkpoint::CHECKPOINT_VERSION,
            profile: self.profile.clone(),
            config: self.config.clone(),
            zones: self.zones.to_vec(),
            membership: self.geofence.current().cloned(),
            home_since: self.detector.home_since(),
            recent: self.recent.to_vec(),
            status: self.status.clone(),
            active: self.engine.snapshot(),
            history: self.history.to_vec(),
        }
    }

    /// Rebuild a tracker from a snapshot.
    pub fn restore(cp: TrackerCheckpoint) -> Result<Self> {
        if cp.version != checkpoint::CHECKPOINT_VERSION {
            return Err(StorageError::Corrupted.into());
        }
        let mut tracker = Self::new(cp.profile, cp.zones, cp.config)?;
        tracker.geofence = GeofenceEvaluator::restore(cp.membership);
        tracker.detector = AutoWalkDetector::restore(cp.home_since);
        tracker.recent = RecentFixes::from_slice(&cp.recent);
        tracker.status = cp.status;
        tracker.engine.restore(cp.active)?;
        tracker.history = WalkLog::from_summaries(cp.history);
        info!(
            "Tracker[{}]: restored (walk open: {})",
            tracker.profile.id,
            tracker.engine.state() == EngineState::Active
        );
        Ok(tracker)
    }

    /// Persist a checkpoint if anything changed since the last save.
    /// Returns `true` if a checkpoint was written.
    pub fn save_checkpoint_if_dirty(&mut self, storage: &mut impl StoragePort) -> bool {
        if !self.checkpoint_dirty {
            return false;
        }
        match checkpoint::save(storage, &self.checkpoint()) {
            Ok(()) => {
                self.checkpoint_dirty = false;
                debug!("Tracker[{}]: checkpoint saved", self.profile.id);
                true
            }
            Err(e) => {
                warn!("Tracker[{}]: checkpoint save failed: {}", self.profile.id, e);
                false
            }
        }
    }

    /// Whether state changed since the last saved checkpoint.
    pub fn is_checkpoint_dirty(&self) -> bool {
        self.checkpoint_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn session_key(&self) -> Option<(StartTrigger, Timestamp)> {
        self.engine.active().map(|s| (s.start_trigger, s.start_time))
    }

    fn emit_transitions(&self, transitions: &[ZoneTransition], sink: &mut impl EventSink) {
        for t in transitions {
            let subject_id = self.profile.id.clone();
            let event = match t {
                ZoneTransition::Entered(zone) => TrackerEvent::ZoneEntered {
                    subject_id,
                    zone: zone.clone(),
                },
                ZoneTransition::Exited(zone) => TrackerEvent::ZoneExited {
                    subject_id,
                    zone: zone.clone(),
                },
            };
            sink.emit(&event);
        }
    }

    fn close_session(
        &mut self,
        trigger: EndTrigger,
        at: Timestamp,
        sink: &mut impl EventSink,
    ) -> Result<WalkSession> {
        let closed = self.engine.end(trigger, at)?;
        if let Some(summary) = WalkSummary::from_session(&closed) {
            self.history.record(summary);
        }
        sink.emit(&TrackerEvent::SessionEnded(closed.clone()));
        self.checkpoint_dirty = true;
        Ok(closed)
    }

    fn refresh_status(&mut self, now: Timestamp, sink: &mut impl EventSink) {
        self.status = status::aggregate(&StatusInput {
            recent: &self.recent,
            session_speed_kmh: self.engine.active().map(|s| s.current_speed_kmh),
            home: self.zones.home(),
            now,
            config: &self.config,
        });
        sink.emit(&TrackerEvent::StatusUpdated {
            subject_id: self.profile.id.clone(),
            status: self.status.clone(),
        });
    }
}
