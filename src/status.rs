//! Publishable tracker status, recomputed on every accepted fix and tick.

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::fix::{GpsFix, RecentFixes, Timestamp, secs_between};
use crate::geo;
use crate::geofence::GeofenceZone;

/// Distance from home (meters) still labelled [`LocationLabel::Home`].
pub const HOME_LABEL_RADIUS_M: f64 = 100.0;
/// Distance from home (meters) still labelled [`LocationLabel::NearHome`].
pub const NEAR_HOME_RADIUS_M: f64 = 500.0;

/// Coarse accuracy grade for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl AccuracyLevel {
    pub fn from_accuracy(accuracy_m: f64) -> Self {
        if accuracy_m <= 5.0 {
            Self::Excellent
        } else if accuracy_m <= 15.0 {
            Self::Good
        } else if accuracy_m <= 50.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

/// Where the subject is, in words a device tracker would show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationLabel {
    Home,
    NearHome,
    OnWalk,
    Away,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub last_fix: Option<GpsFix>,
    /// 0–100; 0 when no fix has been accepted yet.
    pub signal_quality: u8,
    pub accuracy_level: Option<AccuracyLevel>,
    pub is_moving: bool,
    pub is_available: bool,
    pub distance_from_home_m: Option<f64>,
    pub location: LocationLabel,
    pub updated_at: Timestamp,
}

impl TrackerStatus {
    /// Status before any fix has been seen.
    pub fn unknown(now: Timestamp) -> Self {
        Self {
            last_fix: None,
            signal_quality: 0,
            accuracy_level: None,
            is_moving: false,
            is_available: false,
            distance_from_home_m: None,
            location: LocationLabel::Unknown,
            updated_at: now,
        }
    }
}

/// `clamp(100 - accuracy_m, 0, 100)`.
pub fn signal_quality(accuracy_m: f64) -> u8 {
    (100.0 - accuracy_m).clamp(0.0, 100.0).round() as u8
}

/// Everything the aggregator reads.
pub struct StatusInput<'a> {
    pub recent: &'a RecentFixes,
    /// Current speed of the open session, if any.
    pub session_speed_kmh: Option<f64>,
    pub home: &'a GeofenceZone,
    pub now: Timestamp,
    pub config: &'a TrackerConfig,
}

/// Derive a fresh [`TrackerStatus`].
pub fn aggregate(input: &StatusInput<'_>) -> TrackerStatus {
    let Some(last) = input.recent.latest().copied() else {
        return TrackerStatus::unknown(input.now);
    };

    let speed = input
        .session_speed_kmh
        .unwrap_or_else(|| last_two_speed(input.recent));
    let is_available = input.now.saturating_sub(last.timestamp) <= input.config.staleness_ms();
    let distance_from_home_m = geo::distance(last.position, input.home.center).ok();

    let location = match distance_from_home_m {
        Some(d) if d <= HOME_LABEL_RADIUS_M => LocationLabel::Home,
        Some(d) if d <= NEAR_HOME_RADIUS_M => LocationLabel::NearHome,
        Some(_) if input.session_speed_kmh.is_some() => LocationLabel::OnWalk,
        Some(_) => LocationLabel::Away,
        None => LocationLabel::Unknown,
    };

    TrackerStatus {
        last_fix: Some(last),
        signal_quality: signal_quality(last.accuracy_m),
        accuracy_level: Some(AccuracyLevel::from_accuracy(last.accuracy_m)),
        is_moving: speed > input.config.moving_threshold_kmh,
        is_available,
        distance_from_home_m,
        location,
        updated_at: input.now,
    }
}

fn last_two_speed(recent: &RecentFixes) -> f64 {
    recent.last_two().map_or(0.0, |(a, b)| {
        geo::distance(a.position, b.position)
            .map_or(0.0, |m| geo::speed_kmh(m, secs_between(a.timestamp, b.timestamp)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::FixSource;
    use crate::geo::GeoPoint;

    fn home() -> GeofenceZone {
        GeofenceZone::home(GeoPoint::new(52.0, 8.0), 50.0).unwrap()
    }

    fn recent(fixes: &[(f64, f64, Timestamp)]) -> RecentFixes {
        let mut r = RecentFixes::new();
        for &(lat, acc, ts) in fixes {
            r.push(GpsFix::new(lat, 8.0, acc, ts, FixSource::Webhook));
        }
        r
    }

    fn run(r: &RecentFixes, session: Option<f64>, now: Timestamp) -> TrackerStatus {
        let config = TrackerConfig::default();
        let home = home();
        aggregate(&StatusInput {
            recent: r,
            session_speed_kmh: session,
            home: &home,
            now,
            config: &config,
        })
    }

    #[test]
    fn no_fix_is_unavailable() {
        let s = run(&RecentFixes::new(), None, 0);
        assert!(!s.is_available);
        assert_eq!(s.signal_quality, 0);
        assert_eq!(s.location, LocationLabel::Unknown);
    }

    #[test]
    fn signal_quality_clamped() {
        assert_eq!(signal_quality(0.0), 100);
        assert_eq!(signal_quality(30.0), 70);
        assert_eq!(signal_quality(250.0), 0);
    }

    #[test]
    fn moving_from_last_two_fixes_without_session() {
        let r = recent(&[(52.0, 5.0, 0), (52.001, 5.0, 60_000)]);
        let s = run(&r, None, 60_000);
        assert!(s.is_moving);
        assert_eq!(s.location, LocationLabel::NearHome);
        assert!((s.distance_from_home_m.unwrap() - 111.2).abs() < 0.5);
    }

    #[test]
    fn session_speed_takes_precedence() {
        let r = recent(&[(52.0, 5.0, 0), (52.001, 5.0, 60_000)]);
        let s = run(&r, Some(0.5), 60_000);
        assert!(!s.is_moving);
    }

    #[test]
    fn availability_follows_staleness() {
        let r = recent(&[(52.0, 12.0, 0)]);
        assert!(run(&r, None, 1_800_000).is_available);
        assert!(!run(&r, None, 1_800_001).is_available);
        let s = run(&r, None, 0);
        assert_eq!(s.accuracy_level, Some(AccuracyLevel::Good));
        assert_eq!(s.location, LocationLabel::Home);
    }

    #[test]
    fn far_away_labels() {
        let r = recent(&[(52.1, 5.0, 0)]);
        assert_eq!(run(&r, None, 0).location, LocationLabel::Away);
        assert_eq!(run(&r, Some(4.0), 0).location, LocationLabel::OnWalk);
    }

    #[test]
    fn accuracy_levels() {
        assert_eq!(AccuracyLevel::from_accuracy(5.0), AccuracyLevel::Excellent);
        assert_eq!(AccuracyLevel::from_accuracy(40.0), AccuracyLevel::Acceptable);
        assert_eq!(AccuracyLevel::from_accuracy(80.0), AccuracyLevel::Poor);
    }
}
