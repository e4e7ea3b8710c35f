//! PawTrack: GPS walk tracking and geofencing for pets.
//!
//! Turns a stream of raw position reports for each tracked animal into
//! validated fixes, zone crossings, walk sessions with distance / speed /
//! calorie metrics, automatic walk start and stop, and a publishable
//! tracker status.  The core performs no I/O; the host drives it through
//! [`app::service::SubjectTracker`] (one subject),
//! [`app::registry::TrackerRegistry`] (many subjects) or
//! [`runtime::spawn_worker`] (one thread per subject).

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod autowalk;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fix;
pub mod geo;
pub mod geofence;
pub mod history;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod status;

pub use error::{Error, Result};

/// Caller-assigned identifier of a tracked animal.
pub type SubjectId = String;
