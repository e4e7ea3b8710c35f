//! Integration tests for checkpoint persistence through a StoragePort.

use super::mock_ports::RecordingSink;

use pawtrack::adapters::memory::MemoryStorage;
use pawtrack::app::registry::TrackerRegistry;
use pawtrack::app::service::{SubjectProfile, SubjectTracker};
use pawtrack::checkpoint;
use pawtrack::config::TrackerConfig;
use pawtrack::fix::{FixSource, GpsFix, Timestamp};
use pawtrack::geo::GeoPoint;
use pawtrack::geofence::GeofenceZone;
use pawtrack::session::{EndTrigger, StartTrigger};

fn fix(lat: f64, ts: Timestamp) -> GpsFix {
    GpsFix::new(lat, 8.0, 5.0, ts, FixSource::Webhook)
}

#[test]
fn walk_survives_restart_through_storage() {
    let mut sink = RecordingSink::new();
    let mut storage = MemoryStorage::new();

    let mut tracker = SubjectTracker::new(
        SubjectProfile::new("rex", "Rex", 20.0),
        vec![
            GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap(),
            GeofenceZone::new("park", GeoPoint::new(52.01, 8.0), 300.0).unwrap(),
        ],
        TrackerConfig::default(),
    )
    .unwrap();
    tracker.start_walk(StartTrigger::Manual, 0, &mut sink).unwrap();
    tracker.submit_fix(fix(52.0, 0), &mut sink).unwrap();
    tracker.submit_fix(fix(52.002, 60_000), &mut sink).unwrap();
    let walk_id = tracker.active_session().unwrap().id;
    assert!(tracker.save_checkpoint_if_dirty(&mut storage));
    drop(tracker);

    // "Restart": rebuild from storage and hand to a registry.
    let cp = checkpoint::load(&storage, "rex").unwrap().unwrap();
    let mut reg = TrackerRegistry::new();
    reg.add_tracker(SubjectTracker::restore(cp).unwrap(), 120_000)
        .unwrap();

    reg.submit_fix("rex", fix(52.004, 120_000), &mut sink).unwrap();
    let closed = reg
        .end_walk("rex", EndTrigger::Manual, 150_000, &mut sink)
        .unwrap();
    assert_eq!(closed.id, walk_id);
    assert_eq!(closed.path.len(), 3);
    assert!((closed.distance_m - 444.8).abs() < 2.0, "{}", closed.distance_m);
    assert_eq!(closed.duration_s, 150.0);

    let history = reg.get("rex").unwrap().history();
    assert_eq!(history.last_walk().unwrap().id, walk_id);
}

#[test]
fn long_walk_checkpoint_stays_bounded() {
    let mut sink = RecordingSink::new();
    let mut storage = MemoryStorage::new();

    let mut tracker = SubjectTracker::new(
        SubjectProfile::new("rex", "Rex", 20.0),
        vec![GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap()],
        TrackerConfig::default(),
    )
    .unwrap();
    tracker.start_walk(StartTrigger::Manual, 0, &mut sink).unwrap();

    // Just under three hours of 1 Hz fixes, ~1.1 m apart.
    for i in 0..10_000u64 {
        tracker
            .submit_fix(fix(52.0 + i as f64 * 0.00001, i * 1_000), &mut sink)
            .unwrap();
    }
    let before = tracker.active_session().unwrap().clone();
    assert_eq!(before.path.len(), 10_000);

    let blob = tracker.checkpoint().encode().unwrap();
    assert!(blob.len() < checkpoint::MAX_CHECKPOINT_BYTES, "{} bytes", blob.len());
    assert!(tracker.save_checkpoint_if_dirty(&mut storage));
    assert!(!tracker.is_checkpoint_dirty());
    drop(tracker);

    let cp = checkpoint::load(&storage, "rex").unwrap().unwrap();
    let mut restored = SubjectTracker::restore(cp).unwrap();
    let resumed = restored.active_session().unwrap();
    assert_eq!(resumed.id, before.id);
    assert_eq!(resumed.distance_m, before.distance_m);
    assert_eq!(resumed.path.len(), 61);

    restored
        .submit_fix(fix(52.1, 10_000_000), &mut sink)
        .unwrap();
    let closed = restored
        .end_walk(EndTrigger::Manual, 10_000_000, &mut sink)
        .unwrap();
    assert!(closed.distance_m > before.distance_m);
    assert!(
        (closed.distance_m - before.distance_m - 1.11).abs() < 0.05,
        "{}",
        closed.distance_m - before.distance_m
    );
    assert_eq!(closed.duration_s, 10_000.0);
}
