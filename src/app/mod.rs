//! Application core: pure domain logic, zero I/O.
//!
//! This module wires the tracking components into a per-subject service
//! ([`service::SubjectTracker`]) and a multi-subject registry
//! ([`registry::TrackerRegistry`]).  All interaction with the outside
//! world happens through the **port traits** in [`ports`], keeping this
//! layer fully testable without a host platform.

pub mod commands;
pub mod events;
pub mod ports;
pub mod registry;
pub mod service;
