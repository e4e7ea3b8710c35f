//! Integration tests for the multi-subject registry and its tick timer.

use super::mock_ports::RecordingSink;

use pawtrack::Error;
use pawtrack::app::events::TrackerEvent;
use pawtrack::app::registry::TrackerRegistry;
use pawtrack::app::service::SubjectProfile;
use pawtrack::config::TrackerConfig;
use pawtrack::fix::{FixSource, GpsFix, Timestamp};
use pawtrack::geo::GeoPoint;
use pawtrack::geofence::GeofenceZone;
use pawtrack::session::{EndTrigger, StartTrigger};

const MINUTE: Timestamp = 60_000;

fn zones() -> Vec<GeofenceZone> {
    vec![GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap()]
}

fn registry_with(ids: &[&str]) -> TrackerRegistry {
    let mut reg = TrackerRegistry::new();
    for id in ids {
        reg.add_subject(
            SubjectProfile::new(*id, *id, 15.0).with_auto_detection(true),
            zones(),
            TrackerConfig::default(),
            0,
        )
        .unwrap();
    }
    reg
}

fn fix(lat: f64, ts: Timestamp) -> GpsFix {
    GpsFix::new(lat, 8.0, 8.0, ts, FixSource::DeviceTracker)
}

// ── Isolation ─────────────────────────────────────────────────

#[test]
fn subjects_do_not_share_state() {
    let mut reg = registry_with(&["rex", "bella"]);
    let mut sink = RecordingSink::new();

    reg.submit_fix("rex", fix(52.0, 0), &mut sink).unwrap();
    reg.submit_fix("rex", fix(52.001, MINUTE), &mut sink).unwrap();
    assert!(reg.active_session("rex").unwrap().is_some());
    assert!(reg.active_session("bella").unwrap().is_none());

    // Bella's clock is independent: an "older" fix is fine for her.
    reg.submit_fix("bella", fix(52.0, 1_000), &mut sink).unwrap();
    assert_eq!(
        reg.status("bella").unwrap().last_fix.unwrap().timestamp,
        1_000
    );
    assert!(sink.events.iter().all(|e| match e {
        TrackerEvent::SessionStarted(s) => s.subject_id == "rex",
        _ => true,
    }));
}

#[test]
fn unknown_subject_is_reported_for_every_operation() {
    let mut reg = registry_with(&["rex"]);
    let mut sink = RecordingSink::new();

    assert_eq!(
        reg.submit_fix("ghost", fix(52.0, 0), &mut sink).unwrap_err(),
        Error::UnknownSubject
    );
    assert_eq!(
        reg.start_walk("ghost", StartTrigger::Manual, 0, &mut sink)
            .unwrap_err(),
        Error::UnknownSubject
    );
    assert_eq!(
        reg.end_walk("ghost", EndTrigger::Manual, 0, &mut sink)
            .unwrap_err(),
        Error::UnknownSubject
    );
    assert_eq!(reg.set_zones("ghost", zones()).unwrap_err(), Error::UnknownSubject);
    assert_eq!(reg.tick("ghost", 0, &mut sink).unwrap_err(), Error::UnknownSubject);
    assert!(sink.events.is_empty());
}

// ── Timer ─────────────────────────────────────────────────────

#[test]
fn advance_times_out_silent_auto_walk() {
    let mut reg = registry_with(&["rex"]);
    let mut sink = RecordingSink::new();
    reg.submit_fix("rex", fix(52.0, 0), &mut sink).unwrap();
    reg.submit_fix("rex", fix(52.001, MINUTE), &mut sink).unwrap();
    sink.clear();

    // Staleness is 30 min; exactly 30 min of silence is not yet stale.
    let fired = reg.advance(MINUTE + 1_800_000, &mut sink);
    assert_eq!(fired, 1);
    assert!(reg.active_session("rex").unwrap().is_some());

    reg.advance(MINUTE + 1_800_000 + MINUTE, &mut sink);
    let ended = sink
        .events
        .iter()
        .find_map(|e| match e {
            TrackerEvent::SessionEnded(s) => Some(s.clone()),
            _ => None,
        })
        .expect("timeout should close the walk");
    assert_eq!(ended.end_trigger, Some(EndTrigger::AutoTimeout));
    assert_eq!(ended.end_time, Some(MINUTE));
    assert!(!reg.status("rex").unwrap().is_available);
    assert_eq!(reg.get("rex").unwrap().history().len(), 1);
}

#[test]
fn removed_subject_stops_ticking() {
    let mut reg = registry_with(&["rex", "bella"]);
    let mut sink = RecordingSink::new();
    reg.start_walk("rex", StartTrigger::Manual, 0, &mut sink).unwrap();

    let abandoned = reg.remove_subject("rex").unwrap();
    assert!(abandoned.is_some_and(|s| s.is_active()));
    assert_eq!(reg.subjects(), vec!["bella"]);

    sink.clear();
    reg.advance(10 * MINUTE, &mut sink);
    assert!(sink.events.iter().all(|e| match e {
        TrackerEvent::StatusUpdated { subject_id, .. } => subject_id == "bella",
        _ => false,
    }));
}

#[test]
fn force_end_before_removal_archives_walk() {
    let mut reg = registry_with(&["rex"]);
    let mut sink = RecordingSink::new();
    reg.start_walk("rex", StartTrigger::Manual, 0, &mut sink).unwrap();

    let closed = reg.force_end("rex", 5 * MINUTE, &mut sink).unwrap().unwrap();
    assert_eq!(closed.end_time, Some(5 * MINUTE));
    assert_eq!(reg.remove_subject("rex").unwrap(), None);
}
