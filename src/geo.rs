//! Coordinate math: great-circle distance, zone containment, calorie
//! estimation, and presentation-boundary unit helpers.
//!
//! Everything here is a pure function.  Distances are meters; the only
//! conversions to kilometres happen in [`meters_to_km`] and
//! [`format_distance`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geofence::GeofenceZone;

/// Mean Earth radius used by the Haversine formula (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `true` if both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

/// Haversine distance between two points, in meters.
pub fn distance(a: GeoPoint, b: GeoPoint) -> Result<f64> {
    if !a.is_valid() || !b.is_valid() {
        return Err(Error::InvalidCoordinates);
    }

    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `h` just past 1 for antipodal points.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Ok(EARTH_RADIUS_M * c)
}

/// `true` if `point` lies on or inside the zone's radius.
pub fn is_within_zone(point: GeoPoint, zone: &GeofenceZone) -> Result<bool> {
    Ok(distance(point, zone.center)? <= zone.radius_m)
}

/// Average speed in km/h over `distance_m` covered in `elapsed_secs`.
/// Zero when no time has elapsed.
pub fn speed_kmh(distance_m: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    distance_m / elapsed_secs * 3.6
}

// ---------------------------------------------------------------------------
// Calories
// ---------------------------------------------------------------------------

/// Kind of activity a calorie estimate is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    Walking,
    Running,
    Playing,
    Swimming,
    /// Anything unrecognised; scored like walking.
    Other,
}

impl ActivityType {
    /// Per-activity intensity multiplier.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Walking | Self::Other => 3.0,
            Self::Running => 5.0,
            Self::Playing => 4.0,
            Self::Swimming => 6.0,
        }
    }

    /// Parse a free-form activity name; unknown names map to [`Other`](Self::Other).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "walking" | "walk" => Self::Walking,
            "running" | "run" => Self::Running,
            "playing" | "play" => Self::Playing,
            "swimming" | "swim" => Self::Swimming,
            _ => Self::Other,
        }
    }
}

/// Estimated energy expenditure in kcal, rounded to one decimal.
///
/// Returns `0.0` for non-positive weight, negative distance, or
/// non-positive duration.  Never fails.
pub fn estimate_calories(
    weight_kg: f64,
    distance_km: f64,
    duration_min: f64,
    activity: ActivityType,
) -> f64 {
    // NaN fails every comparison, so it lands in the zero branch too.
    if !(weight_kg > 0.0 && distance_km >= 0.0 && duration_min > 0.0) {
        return 0.0;
    }
    let kcal = weight_kg * 2.0 * activity.multiplier() * (duration_min / 60.0)
        + weight_kg * distance_km * 0.5;
    (kcal * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Presentation helpers
// ---------------------------------------------------------------------------

pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

/// "850m" below one kilometre, "1.2km" above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.max(0.0) as u64)
    } else {
        format!("{:.1}km", meters_to_km(meters))
    }
}

/// "45 min", "1h", or "1h 5min".
pub fn format_duration(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}min")
    }
}
