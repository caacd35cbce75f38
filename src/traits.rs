//! Abstractions for time to enable testing.
//!
//! This module provides:
//! - `Clock`: Abstracting time access for deterministic testing
//! - `ReferenceZone`: The single timezone every calendar day is computed in

use std::{
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
///
/// This allows injecting mock clocks during testing to create
/// deterministic, reproducible tests for time-dependent logic.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get today's calendar day in the given reference zone.
    fn today_in(&self, zone: &ReferenceZone) -> NaiveDate {
        zone.day_of(self.now_utc())
    }
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a new mock clock set to the given UTC time.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(time)),
        }
    }

    /// Set the mock clock to a new time.
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.utc_time.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.utc_time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc_time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ==================== Reference Zone ====================

/// Zone used when no other zone is configured.
pub const DEFAULT_TIME_ZONE: &str = "America/Mexico_City";

/// The one timezone that "today" and every stored calendar day are
/// evaluated in, independent of where the caller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parse an IANA zone id such as `America/Mexico_City`.
    pub fn parse(name: &str) -> Result<Self, <Tz as FromStr>::Err> {
        Tz::from_str(name.trim()).map(Self)
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Calendar day an instant falls on in this zone.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self(chrono_tz::America::Mexico_City)
    }
}
