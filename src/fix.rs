//! GPS fixes and the validator that guards every downstream component.
//!
//! ```text
//!  inbound fix ──▶ FixValidator ──▶ Ok(Confidence)  ──▶ geofence / session / status
//!                        │
//!                        └──▶ Err(FixRejection) ──▶ dropped (state untouched)
//! ```
//!
//! This is the only filter for bad input.  Everything after it trusts
//! that coordinates are in range and timestamps strictly increase.

use heapless::Deque;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::FixRejection;
use crate::geo::{self, GeoPoint};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Seconds from `earlier` to `later`; negative if the order is reversed.
pub fn secs_between(earlier: Timestamp, later: Timestamp) -> f64 {
    (later as f64 - earlier as f64) / 1000.0
}

/// Where a position report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixSource {
    Manual,
    DeviceTracker,
    PersonEntity,
    Webhook,
    Mqtt,
}

/// One reported position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub position: GeoPoint,
    /// Horizontal accuracy radius in meters.
    pub accuracy_m: f64,
    pub timestamp: Timestamp,
    pub source: FixSource,
}

impl GpsFix {
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: f64,
        timestamp: Timestamp,
        source: FixSource,
    ) -> Self {
        Self {
            position: GeoPoint::new(latitude, longitude),
            accuracy_m,
            timestamp,
            source,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Validator
// ═══════════════════════════════════════════════════════════════

/// How much a caller should trust an accepted fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Nominal,
    /// Accuracy exceeded the ceiling but soft-accept is enabled.
    Degraded,
}

/// Stateless fix validator; thresholds come from [`TrackerConfig`].
#[derive(Debug, Clone)]
pub struct FixValidator {
    max_accuracy_m: f64,
    max_speed_kmh: f64,
    soft_accept: bool,
}

impl FixValidator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            max_accuracy_m: config.max_accuracy_m,
            max_speed_kmh: config.max_speed_kmh,
            soft_accept: config.soft_accept_low_accuracy,
        }
    }

    /// Check `candidate` against the previously accepted fix.
    ///
    /// Checks run cheapest first: range, ordering, accuracy, then the
    /// implied-speed jump test (which needs a distance computation).
    pub fn validate(
        &self,
        previous: Option<&GpsFix>,
        candidate: &GpsFix,
    ) -> Result<Confidence, FixRejection> {
        if !candidate.position.is_valid()
            || !candidate.accuracy_m.is_finite()
            || candidate.accuracy_m < 0.0
        {
            return Err(FixRejection::OutOfRange);
        }

        if let Some(prev) = previous {
            if candidate.timestamp <= prev.timestamp {
                return Err(FixRejection::NonMonotonicTime);
            }
        }

        let mut confidence = Confidence::Nominal;
        if candidate.accuracy_m > self.max_accuracy_m {
            if !self.soft_accept {
                return Err(FixRejection::AccuracyTooLow);
            }
            confidence = Confidence::Degraded;
        }

        if let Some(prev) = previous {
            // Both points are in range here, so distance cannot fail.
            let meters = geo::distance(prev.position, candidate.position)
                .map_err(|_| FixRejection::OutOfRange)?;
            let secs = secs_between(prev.timestamp, candidate.timestamp);
            if geo::speed_kmh(meters, secs) > self.max_speed_kmh {
                return Err(FixRejection::ImplausibleJump);
            }
        }

        Ok(confidence)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Bounded recent window
// ═══════════════════════════════════════════════════════════════

/// Number of accepted fixes retained per subject.
pub const RECENT_FIX_CAPACITY: usize = 32;

/// Ring of the most recently accepted fixes; the oldest is evicted when full.
#[derive(Debug, Clone, Default)]
pub struct RecentFixes {
    fixes: Deque<GpsFix, RECENT_FIX_CAPACITY>,
}

impl RecentFixes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fix: GpsFix) {
        if self.fixes.is_full() {
            self.fixes.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.fixes.push_back(fix);
    }

    pub fn latest(&self) -> Option<&GpsFix> {
        self.fixes.back()
    }

    /// The two most recent fixes as `(older, newer)`.
    pub fn last_two(&self) -> Option<(&GpsFix, &GpsFix)> {
        let len = self.fixes.len();
        if len < 2 {
            return None;
        }
        let mut iter = self.fixes.iter().skip(len - 2);
        Some((iter.next()?, iter.next()?))
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Oldest-first copy, used for checkpoints.
    pub fn to_vec(&self) -> Vec<GpsFix> {
        self.fixes.iter().copied().collect()
    }

    pub fn from_slice(fixes: &[GpsFix]) -> Self {
        let mut out = Self::new();
        for fix in fixes {
            out.push(*fix);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64, acc: f64, ts: Timestamp) -> GpsFix {
        GpsFix::new(lat, lon, acc, ts, FixSource::DeviceTracker)
    }

    fn validator() -> FixValidator {
        FixValidator::new(&TrackerConfig::default())
    }

    #[test]
    fn first_fix_accepted_without_previous() {
        assert_eq!(
            validator().validate(None, &fix(52.0, 8.0, 10.0, 1_000)),
            Ok(Confidence::Nominal)
        );
    }

    #[test]
    fn out_of_range_rejected() {
        let v = validator();
        assert_eq!(
            v.validate(None, &fix(91.0, 8.0, 10.0, 1_000)),
            Err(FixRejection::OutOfRange)
        );
        assert_eq!(
            v.validate(None, &fix(52.0, 181.0, 10.0, 1_000)),
            Err(FixRejection::OutOfRange)
        );
        assert_eq!(
            v.validate(None, &fix(52.0, 8.0, -1.0, 1_000)),
            Err(FixRejection::OutOfRange)
        );
    }

    #[test]
    fn equal_timestamp_is_non_monotonic() {
        let prev = fix(52.0, 8.0, 10.0, 60_000);
        assert_eq!(
            validator().validate(Some(&prev), &fix(52.0, 8.0, 10.0, 60_000)),
            Err(FixRejection::NonMonotonicTime)
        );
        assert_eq!(
            validator().validate(Some(&prev), &fix(52.0, 8.0, 10.0, 59_999)),
            Err(FixRejection::NonMonotonicTime)
        );
    }

    #[test]
    fn poor_accuracy_rejected_unless_soft_accept() {
        let bad = fix(52.0, 8.0, 500.0, 1_000);
        assert_eq!(
            validator().validate(None, &bad),
            Err(FixRejection::AccuracyTooLow)
        );

        let mut config = TrackerConfig::default();
        config.soft_accept_low_accuracy = true;
        assert_eq!(
            FixValidator::new(&config).validate(None, &bad),
            Ok(Confidence::Degraded)
        );
    }

    #[test]
    fn implausible_jump_rejected() {
        let prev = fix(52.0, 8.0, 10.0, 0);
        // ~11 km in 60 s is ~667 km/h.
        assert_eq!(
            validator().validate(Some(&prev), &fix(52.1, 8.0, 10.0, 60_000)),
            Err(FixRejection::ImplausibleJump)
        );
        // ~111 m in 60 s is ~6.7 km/h.
        assert_eq!(
            validator().validate(Some(&prev), &fix(52.001, 8.0, 10.0, 60_000)),
            Ok(Confidence::Nominal)
        );
    }

    #[test]
    fn recent_window_evicts_oldest() {
        let mut recent = RecentFixes::new();
        for i in 0..(RECENT_FIX_CAPACITY as u64 + 5) {
            recent.push(fix(52.0, 8.0, 5.0, i * 1000));
        }
        assert_eq!(recent.len(), RECENT_FIX_CAPACITY);
        assert_eq!(recent.to_vec()[0].timestamp, 5_000);
        let (older, newer) = recent.last_two().unwrap();
        assert!(older.timestamp < newer.timestamp);
        assert_eq!(recent.latest().unwrap().timestamp, newer.timestamp);
    }
}
