//! Port traits: the hexagonal boundary between tracking logic and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SubjectTracker / TrackerRegistry
//! ```
//!
//! Driven adapters (event sinks, clocks, storage) implement these traits.
//! The service consumes them via generics, so the tracking core never
//! touches a platform API directly.

use crate::fix::Timestamp;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → sensors / notifications)
// ───────────────────────────────────────────────────────────────

/// The tracker emits structured [`TrackerEvent`](super::events::TrackerEvent)s
/// through this port.  Adapters decide where they go (log, entity
/// updates, push notifications, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::TrackerEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for the runtime worker.  The service itself never
/// reads a clock: every operation carries its own timestamp.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ persistent key-value store)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for tracker checkpoints.
///
/// - Keys are namespaced to prevent collisions between subjects.
/// - Write operations MUST be atomic: a reader sees the old value or the
///   new one, never a mix.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Tick delegate (decouples the tick scheduler from the registry)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the [`TickScheduler`](crate::scheduler::TickScheduler)
/// invokes when a subject's periodic tick is due.
pub trait TickDelegate {
    /// * `subject`: the subject whose tick fired.
    /// * `now`: the time the scheduler was advanced to.
    fn on_tick_due(&mut self, subject: &str, now: Timestamp);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Configuration or zone-list validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage is full, or the value does not fit the caller's buffer.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored blob failed deserialization.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}
