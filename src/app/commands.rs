//! Inbound commands to a subject tracker.
//!
//! These represent the function-call boundary the host platform drives
//! (location updates, walk buttons, zone edits, the periodic timer).
//! [`SubjectTracker::handle_command`](super::service::SubjectTracker::handle_command)
//! interprets them; the runtime worker receives them over its channel.

use crate::config::TrackerConfig;
use crate::fix::{GpsFix, Timestamp};
use crate::geofence::GeofenceZone;
use crate::session::{EndTrigger, StartTrigger};

use super::service::SubjectProfile;

/// Commands that external adapters can send into the tracking core.
#[derive(Debug, Clone)]
pub enum TrackerCommand {
    /// A new position report.
    SubmitFix(GpsFix),

    /// Open a walk (walk button, or an external detector).
    StartWalk { trigger: StartTrigger, at: Timestamp },

    /// Close the open walk.
    EndWalk { trigger: EndTrigger, at: Timestamp },

    /// Close the open walk regardless of how it was started.
    ForceEnd { at: Timestamp },

    /// Replace the subject's zone list (must contain "home").
    SetZones(Vec<GeofenceZone>),

    /// Toggle automatic walk detection.
    SetAutoDetection(bool),

    /// Periodic timer input.
    Tick { now: Timestamp },

    /// Hot-reload thresholds.
    UpdateConfig(TrackerConfig),

    /// Replace name / weight from the subject registry.
    UpdateProfile(SubjectProfile),
}
