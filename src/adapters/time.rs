//! Host clock adapter.
//!
//! Implements [`Clock`] with the system wall clock.  A clock set before
//! 1970 reads as 0.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;
use crate::fix::Timestamp;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as Timestamp)
    }
}
