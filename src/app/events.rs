//! Outbound tracker events.
//!
//! The [`SubjectTracker`](super::service::SubjectTracker) emits these
//! through the [`EventSink`](super::ports::EventSink) port, in the order
//! they are derived.  Adapters on the other side decide what to do with
//! them: update sensors, move a device tracker, notify a phone, etc.

use crate::SubjectId;
use crate::error::FixRejection;
use crate::session::{WalkProgress, WalkSession};
use crate::status::TrackerStatus;

/// Structured events emitted by the tracking core.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A walk was opened.
    SessionStarted(WalkSession),

    /// An open walk accepted a fix; carries the updated metrics.
    SessionProgress(WalkProgress),

    /// A walk was closed; the session is final and ready for archival.
    SessionEnded(WalkSession),

    ZoneEntered { subject_id: SubjectId, zone: String },

    ZoneExited { subject_id: SubjectId, zone: String },

    /// Status was recomputed after a fix or tick.
    StatusUpdated { subject_id: SubjectId, status: TrackerStatus },

    /// A fix was dropped by the validator.  Nothing else changed.
    FixRejected { subject_id: SubjectId, reason: FixRejection },
}

impl TrackerEvent {
    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted(_) => "session_started",
            Self::SessionProgress(_) => "session_progress",
            Self::SessionEnded(_) => "session_ended",
            Self::ZoneEntered { .. } => "zone_entered",
            Self::ZoneExited { .. } => "zone_exited",
            Self::StatusUpdated { .. } => "status_updated",
            Self::FixRejected { .. } => "fix_rejected",
        }
    }
}
