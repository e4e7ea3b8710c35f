//! Unified error types for the walk-tracking engine.
//!
//! A single `Error` enum that every component converts into, so callers
//! can log-and-continue uniformly.  Every variant except
//! [`Error::Invariant`] is an ordinary, locally recoverable condition.
//! All variants are `Copy`.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A coordinate pair was outside `|lat| <= 90`, `|lon| <= 180`.
    InvalidCoordinates,
    /// A fix was rejected by the validator and discarded.
    Fix(FixRejection),
    /// A walk start/end was attempted against the wrong session state.
    Session(SessionError),
    /// Configuration or zone data failed validation.
    Config(ConfigError),
    /// A checkpoint could not be written or read.
    Storage(StorageError),
    /// No tracker is registered for the subject id.
    UnknownSubject,
    /// A tracker is already registered for the subject id.
    DuplicateSubject,
    /// The subject's worker could not accept the command.
    Worker(WorkerError),
    /// Internal invariant violated.  Indicates a bug (e.g. a serialization
    /// breach in per-subject processing), never bad input.
    Invariant(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinates => write!(f, "invalid coordinates"),
            Self::Fix(e) => write!(f, "fix rejected: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::UnknownSubject => write!(f, "unknown subject"),
            Self::DuplicateSubject => write!(f, "subject already registered"),
            Self::Worker(e) => write!(f, "worker: {e}"),
            Self::Invariant(msg) => write!(f, "invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Fix rejections
// ---------------------------------------------------------------------------

/// Why the validator dropped a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FixRejection {
    /// Latitude/longitude out of range, or accuracy negative / not finite.
    OutOfRange,
    /// Timestamp not strictly after the previously accepted fix.
    NonMonotonicTime,
    /// Implied speed from the previous fix exceeds the configured ceiling.
    ImplausibleJump,
    /// Reported accuracy radius is above the configured ceiling.
    AccuracyTooLow,
}

impl fmt::Display for FixRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "coordinates out of range"),
            Self::NonMonotonicTime => write!(f, "non-monotonic timestamp"),
            Self::ImplausibleJump => write!(f, "implausible jump"),
            Self::AccuracyTooLow => write!(f, "accuracy too low"),
        }
    }
}

impl From<FixRejection> for Error {
    fn from(e: FixRejection) -> Self {
        Self::Fix(e)
    }
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// A walk is already in progress for the subject.
    AlreadyActive,
    /// No walk is in progress for the subject.
    NoActiveSession,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "walk already active"),
            Self::NoActiveSession => write!(f, "no active walk"),
        }
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Worker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// The command channel is full; the command was dropped.
    ChannelFull,
    /// The worker thread has exited.
    Stopped,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelFull => write!(f, "command channel full"),
            Self::Stopped => write!(f, "worker stopped"),
        }
    }
}

impl From<WorkerError> for Error {
    fn from(e: WorkerError) -> Self {
        Self::Worker(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
