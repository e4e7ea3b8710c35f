//! Caller-driven snapshot and restore of per-subject tracker state.
//!
//! The tracker itself holds no durable state.  A caller that wants an
//! open walk to survive a restart takes a [`TrackerCheckpoint`] and
//! persists it through a [`StoragePort`]; blobs are postcard-encoded.
//!
//! An open walk is stored with its full metrics but only the path tail
//! inside the speed window (see `WalkSessionEngine::snapshot`), so the
//! blob size does not depend on how long the walk has run.
//!
//! ```text
//!  SubjectTracker::checkpoint() ──▶ postcard ──▶ StoragePort("pawtrack", subject)
//!  SubjectTracker::restore()    ◀── postcard ◀──┘
//! ```

use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::app::service::SubjectProfile;
use crate::config::TrackerConfig;
use crate::fix::{GpsFix, Timestamp};
use crate::geofence::{GeofenceZone, ZoneMembership};
use crate::history::WalkSummary;
use crate::session::WalkSession;
use crate::status::TrackerStatus;

/// Storage namespace for checkpoints; the key is the subject id.
pub const CHECKPOINT_NAMESPACE: &str = "pawtrack";

/// Bumped whenever the checkpoint layout changes.
pub const CHECKPOINT_VERSION: u8 = 1;

/// Largest blob [`load`] will read.
pub const MAX_CHECKPOINT_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerCheckpoint {
    pub version: u8,
    pub profile: SubjectProfile,
    pub config: TrackerConfig,
    pub zones: Vec<GeofenceZone>,
    pub membership: Option<ZoneMembership>,
    pub home_since: Option<Timestamp>,
    /// Recent-fix window, oldest first.
    pub recent: Vec<GpsFix>,
    pub status: TrackerStatus,
    /// Open walk, path cut to its trailing window.
    pub active: Option<WalkSession>,
    pub history: Vec<WalkSummary>,
}

impl TrackerCheckpoint {
    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        postcard::to_allocvec(self).map_err(|_| StorageError::IoError)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        postcard::from_bytes(bytes).map_err(|_| StorageError::Corrupted)
    }
}

/// Encode and write a checkpoint under its subject id.
pub fn save(storage: &mut impl StoragePort, cp: &TrackerCheckpoint) -> Result<(), StorageError> {
    let bytes = cp.encode()?;
    if bytes.len() > MAX_CHECKPOINT_BYTES {
        return Err(StorageError::Full);
    }
    storage.write(CHECKPOINT_NAMESPACE, &cp.profile.id, &bytes)
}

/// Read a checkpoint.  `Ok(None)` if none is stored for `subject`.
pub fn load(storage: &impl StoragePort, subject: &str) -> Result<Option<TrackerCheckpoint>, StorageError> {
    if !storage.exists(CHECKPOINT_NAMESPACE, subject) {
        return Ok(None);
    }
    let mut buf = vec![0u8; MAX_CHECKPOINT_BYTES];
    let n = match storage.read(CHECKPOINT_NAMESPACE, subject, &mut buf) {
        Ok(n) => n,
        Err(StorageError::NotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    TrackerCheckpoint::decode(&buf[..n]).map(Some)
}

/// Remove a stored checkpoint (e.g. when a subject is deleted).
pub fn delete(storage: &mut impl StoragePort, subject: &str) -> Result<(), StorageError> {
    storage.delete(CHECKPOINT_NAMESPACE, subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStorage;
    use crate::app::events::TrackerEvent;
    use crate::app::ports::EventSink;
    use crate::app::service::SubjectTracker;
    use crate::fix::FixSource;
    use crate::geo::GeoPoint;
    use crate::session::StartTrigger;

    struct Discard;

    impl EventSink for Discard {
        fn emit(&mut self, _event: &TrackerEvent) {}
    }

    fn tracker() -> SubjectTracker {
        SubjectTracker::new(
            SubjectProfile::new("rex", "Rex", 20.0).with_auto_detection(true),
            vec![GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap()],
            TrackerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn save_load_resumes_open_walk() {
        let mut t = tracker();
        let mut sink = Discard;
        t.submit_fix(GpsFix::new(52.0, 8.0, 5.0, 0, FixSource::Mqtt), &mut sink)
            .unwrap();
        t.submit_fix(GpsFix::new(52.001, 8.0, 5.0, 60_000, FixSource::Mqtt), &mut sink)
            .unwrap();
        let id = t.active_session().unwrap().id;

        let mut storage = MemoryStorage::new();
        assert!(t.save_checkpoint_if_dirty(&mut storage));
        assert!(!t.save_checkpoint_if_dirty(&mut storage));

        let cp = load(&storage, "rex").unwrap().unwrap();
        let mut restored = SubjectTracker::restore(cp).unwrap();
        assert_eq!(restored.active_session().unwrap().id, id);
        assert!(!restored.membership().unwrap().is_home());

        // Resumed walk keeps accumulating distance.
        restored
            .submit_fix(GpsFix::new(52.002, 8.0, 5.0, 120_000, FixSource::Mqtt), &mut sink)
            .unwrap();
        let s = restored.active_session().unwrap();
        assert_eq!(s.path.len(), 2);
        assert!(s.distance_m > 100.0);

        // And a duplicate of the last fix is still rejected after restore.
        assert!(
            restored
                .submit_fix(GpsFix::new(52.002, 8.0, 5.0, 120_000, FixSource::Mqtt), &mut sink)
                .is_err()
        );
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let storage = MemoryStorage::new();
        assert_eq!(load(&storage, "nobody").unwrap(), None);
    }

    #[test]
    fn corrupted_blob_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.write(CHECKPOINT_NAMESPACE, "rex", &[0xff, 0xff, 0xff]).unwrap();
        assert_eq!(load(&storage, "rex"), Err(StorageError::Corrupted));
    }

    #[test]
    fn version_mismatch_refused() {
        let mut t = tracker();
        t.start_walk(StartTrigger::Manual, 0, &mut Discard).unwrap();
        let mut cp = t.checkpoint();
        cp.version += 1;
        assert!(SubjectTracker::restore(cp).is_err());
    }

    #[test]
    fn delete_removes_blob() {
        let mut storage = MemoryStorage::new();
        let mut t = tracker();
        t.set_auto_detection(false);
        assert!(t.save_checkpoint_if_dirty(&mut storage));
        delete(&mut storage, "rex").unwrap();
        assert_eq!(load(&storage, "rex").unwrap(), None);
    }
}
