//! Integration tests for the per-subject worker thread.

use std::time::Duration;

use super::mock_ports::{ManualClock, SharedSink};

use pawtrack::app::commands::TrackerCommand;
use pawtrack::app::service::{SubjectProfile, SubjectTracker};
use pawtrack::config::TrackerConfig;
use pawtrack::fix::{FixSource, GpsFix};
use pawtrack::geo::GeoPoint;
use pawtrack::geofence::GeofenceZone;
use pawtrack::runtime::spawn_worker;
use pawtrack::session::{StartTrigger, WalkSession};

fn tracker(config: TrackerConfig) -> SubjectTracker {
    SubjectTracker::new(
        SubjectProfile::new("rex", "Rex", 20.0).with_auto_detection(true),
        vec![GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap()],
        config,
    )
    .unwrap()
}

#[test]
fn queued_commands_are_applied_before_shutdown() {
    let sink = SharedSink::new();
    let worker = spawn_worker(
        tracker(TrackerConfig::default()),
        sink.clone(),
        ManualClock::at(0),
    )
    .unwrap();

    worker
        .send(TrackerCommand::SubmitFix(GpsFix::new(52.0, 8.0, 5.0, 0, FixSource::Mqtt)))
        .unwrap();
    worker
        .send(TrackerCommand::SubmitFix(GpsFix::new(
            52.001,
            8.0,
            5.0,
            60_000,
            FixSource::Mqtt,
        )))
        .unwrap();

    let abandoned: Option<WalkSession> = worker.shutdown().unwrap();
    let session = abandoned.expect("auto walk should still be open");
    assert_eq!(session.start_trigger, StartTrigger::Auto);

    let kinds = sink.kinds();
    assert_eq!(
        kinds,
        [
            "status_updated",
            "zone_exited",
            "session_started",
            "status_updated"
        ]
    );
}

#[test]
fn rejected_commands_do_not_stop_the_worker() {
    let sink = SharedSink::new();
    let worker = spawn_worker(
        tracker(TrackerConfig::default()),
        sink.clone(),
        ManualClock::at(0),
    )
    .unwrap();

    // End without a walk, then an invalid fix: both refused, worker lives on.
    worker
        .send(TrackerCommand::EndWalk {
            trigger: pawtrack::session::EndTrigger::Manual,
            at: 0,
        })
        .unwrap();
    worker
        .send(TrackerCommand::SubmitFix(GpsFix::new(95.0, 8.0, 5.0, 0, FixSource::Mqtt)))
        .unwrap();
    worker
        .send(TrackerCommand::StartWalk {
            trigger: StartTrigger::Manual,
            at: 1_000,
        })
        .unwrap();

    let abandoned = worker.shutdown().unwrap();
    assert!(abandoned.is_some_and(|s| s.start_trigger == StartTrigger::Manual));
    assert!(sink.kinds().contains(&"fix_rejected"));
}

#[test]
fn periodic_tick_fires_on_worker_timer() {
    let sink = SharedSink::new();
    let config = TrackerConfig {
        tick_interval_secs: 1,
        ..TrackerConfig::default()
    };
    let worker = spawn_worker(tracker(config), sink.clone(), ManualClock::at(42_000)).unwrap();

    std::thread::sleep(Duration::from_millis(1_500));
    let tracker = worker.into_tracker().unwrap();

    assert!(sink.kinds().contains(&"status_updated"));
    assert_eq!(tracker.status().updated_at, 42_000);
}
