//! Named circular geofences and per-subject membership tracking.
//!
//! Membership is a set: a point may sit in zero, one, or several
//! overlapping zones.  The evaluator keeps the previous set and diffs it
//! against the new one, so each crossing yields exactly one
//! [`ZoneTransition`] and a stationary subject yields none.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::geo::{self, GeoPoint};

/// Name of the zone every subject must have.
pub const HOME_ZONE: &str = "home";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceZone {
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl GeofenceZone {
    pub fn new(
        name: impl Into<String>,
        center: GeoPoint,
        radius_m: f64,
    ) -> core::result::Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::ValidationFailed("zone name must not be empty"));
        }
        if !center.is_valid() {
            return Err(ConfigError::ValidationFailed("zone center out of range"));
        }
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Err(ConfigError::ValidationFailed("zone radius must be > 0"));
        }
        Ok(Self {
            name,
            center,
            radius_m,
        })
    }

    pub fn home(center: GeoPoint, radius_m: f64) -> core::result::Result<Self, ConfigError> {
        Self::new(HOME_ZONE, center, radius_m)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Zone snapshot
// ═══════════════════════════════════════════════════════════════

/// Immutable, cheaply clonable zone list.
///
/// Replacing zones swaps the whole snapshot; an evaluation in progress
/// keeps the snapshot it started with.
#[derive(Debug, Clone)]
pub struct ZoneSet {
    zones: Arc<[GeofenceZone]>,
    home: usize,
}

impl ZoneSet {
    /// Build a snapshot.  Requires exactly one zone named [`HOME_ZONE`],
    /// unique names, and radii within the configured bounds.
    pub fn new(
        zones: Vec<GeofenceZone>,
        config: &TrackerConfig,
    ) -> core::result::Result<Self, ConfigError> {
        let mut names = BTreeSet::new();
        for zone in &zones {
            if !names.insert(zone.name.as_str()) {
                return Err(ConfigError::ValidationFailed("duplicate zone name"));
            }
            if zone.radius_m < config.min_zone_radius_m || zone.radius_m > config.max_zone_radius_m {
                return Err(ConfigError::ValidationFailed("zone radius out of bounds"));
            }
        }
        let home = zones
            .iter()
            .position(|z| z.name == HOME_ZONE)
            .ok_or(ConfigError::ValidationFailed("a \"home\" zone is required"))?;

        Ok(Self {
            zones: zones.into(),
            home,
        })
    }

    pub fn home(&self) -> &GeofenceZone {
        &self.zones[self.home]
    }

    pub fn get(&self, name: &str) -> Option<&GeofenceZone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeofenceZone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn to_vec(&self) -> Vec<GeofenceZone> {
        self.zones.to_vec()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Membership
// ═══════════════════════════════════════════════════════════════

/// Names of every zone containing a point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMembership(BTreeSet<String>);

impl ZoneMembership {
    pub fn contains(&self, zone: &str) -> bool {
        self.0.contains(zone)
    }

    pub fn is_home(&self) -> bool {
        self.contains(HOME_ZONE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The most specific containing zone: smallest radius, ties by name.
    pub fn smallest<'z>(&self, zones: &'z ZoneSet) -> Option<&'z GeofenceZone> {
        zones
            .iter()
            .filter(|z| self.contains(&z.name))
            .min_by(|a, b| {
                a.radius_m
                    .total_cmp(&b.radius_m)
                    .then_with(|| a.name.cmp(&b.name))
            })
    }
}

impl FromIterator<String> for ZoneMembership {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneTransition {
    Entered(String),
    Exited(String),
}

/// Compute membership for one point against a snapshot.
pub fn membership(point: GeoPoint, zones: &ZoneSet) -> Result<ZoneMembership> {
    let mut inside = BTreeSet::new();
    for zone in zones.iter() {
        if geo::is_within_zone(point, zone)? {
            inside.insert(zone.name.clone());
        }
    }
    Ok(ZoneMembership(inside))
}

// ═══════════════════════════════════════════════════════════════
//  Evaluator
// ═══════════════════════════════════════════════════════════════

/// Per-subject membership tracker.
#[derive(Debug, Clone, Default)]
pub struct GeofenceEvaluator {
    /// `None` until the first evaluation establishes a baseline.
    previous: Option<ZoneMembership>,
}

impl GeofenceEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(previous: Option<ZoneMembership>) -> Self {
        Self { previous }
    }

    /// Evaluate `point`, update the stored membership, and return the
    /// crossings since the previous evaluation.
    ///
    /// The first evaluation only records a baseline and returns no
    /// transitions.  Exits are listed before entries, each in name order.
    pub fn evaluate(
        &mut self,
        point: GeoPoint,
        zones: &ZoneSet,
    ) -> Result<(ZoneMembership, Vec<ZoneTransition>)> {
        let current = membership(point, zones)?;

        let mut transitions = Vec::new();
        if let Some(prev) = &self.previous {
            for name in prev.0.difference(&current.0) {
                info!("Geofence: exited '{}'", name);
                transitions.push(ZoneTransition::Exited(name.clone()));
            }
            for name in current.0.difference(&prev.0) {
                info!("Geofence: entered '{}'", name);
                transitions.push(ZoneTransition::Entered(name.clone()));
            }
        }

        self.previous = Some(current.clone());
        Ok((current, transitions))
    }

    /// Membership as of the last evaluation.
    pub fn current(&self) -> Option<&ZoneMembership> {
        self.previous.as_ref()
    }
}
