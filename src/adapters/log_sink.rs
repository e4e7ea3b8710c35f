//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering every tracker event as a single
//! structured log line.  A host integration (entity updates, push
//! notifications) would implement the same trait.

use log::{info, warn};

use crate::app::events::TrackerEvent;
use crate::app::ports::EventSink;
use crate::geo;

/// Adapter that logs every [`TrackerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &TrackerEvent) {
        match event {
            TrackerEvent::SessionStarted(s) => {
                info!(
                    "WALK  | {} | started ({:?}) id={}",
                    s.subject_id, s.start_trigger, s.id
                );
            }
            TrackerEvent::SessionProgress(s) => {
                info!(
                    "WALK  | {} | {} in {} | {:.1} km/h | {:.1} kcal | {} pts",
                    s.subject_id,
                    geo::format_distance(s.distance_m),
                    geo::format_duration((s.duration_s / 60.0) as u64),
                    s.current_speed_kmh,
                    s.calories_kcal,
                    s.points,
                );
            }
            TrackerEvent::SessionEnded(s) => {
                info!(
                    "WALK  | {} | ended ({:?}) id={} | {} in {} | {:.1} kcal",
                    s.subject_id,
                    s.end_trigger,
                    s.id,
                    geo::format_distance(s.distance_m),
                    geo::format_duration((s.duration_s / 60.0) as u64),
                    s.calories_kcal,
                );
            }
            TrackerEvent::ZoneEntered { subject_id, zone } => {
                info!("ZONE  | {} | entered '{}'", subject_id, zone);
            }
            TrackerEvent::ZoneExited { subject_id, zone } => {
                info!("ZONE  | {} | exited '{}'", subject_id, zone);
            }
            TrackerEvent::StatusUpdated { subject_id, status } => {
                info!(
                    "STATE | {} | {:?} | home={} | signal={}% | moving={} | available={}",
                    subject_id,
                    status.location,
                    status
                        .distance_from_home_m
                        .map_or_else(|| "?".to_string(), geo::format_distance),
                    status.signal_quality,
                    status.is_moving,
                    status.is_available,
                );
            }
            TrackerEvent::FixRejected { subject_id, reason } => {
                warn!("FIX   | {} | rejected: {}", subject_id, reason);
            }
        }
    }
}
