//! gauge-time - Timestamp type for GaugeCalc
//!
//! A telemetry instant expressed in millisecond ticks since the Unix epoch.
//! The calculation engine treats this type as an opaque, totally-ordered,
//! arithmetic value; calendar accessors (year/month/day/hour/weekday) exist
//! only for the periodic reset policies of the windowed function library.
//!
//! # Example
//!
//! ```rust
//! use gauge_time::Timestamp;
//!
//! let t0 = Timestamp::from_millis(1_700_000_000_000);
//! let t1 = t0 + 30_000; // 30 seconds later
//!
//! assert!(t1 > t0);
//! assert_eq!(t1 - t0, 30_000);
//! assert_eq!(Timestamp::latest_of(t0, t1), t1);
//! ```

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Ticks per second
pub const TICKS_PER_SECOND: i64 = 1_000;

/// Ticks per minute
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;

/// Ticks per hour
pub const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;

/// Ticks per day
pub const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;

/// An instant in time, stored as millisecond ticks since the Unix epoch
///
/// Ordering and equality are total. Tick arithmetic saturates instead of
/// wrapping, so offsetting never produces an ambiguous instant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp {
    ticks: i64,
}

impl Timestamp {
    /// Create a timestamp from raw millisecond ticks
    pub fn from_millis(ticks: i64) -> Self {
        Self { ticks }
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self {
            ticks: Utc::now().timestamp_millis(),
        }
    }

    /// Raw millisecond ticks since the Unix epoch
    pub fn millis(&self) -> i64 {
        self.ticks
    }

    /// The later of two timestamps
    pub fn latest_of(a: Timestamp, b: Timestamp) -> Timestamp {
        if a.ticks >= b.ticks {
            a
        } else {
            b
        }
    }

    /// Offset by a signed number of ticks (saturating)
    pub fn offset(&self, ticks: i64) -> Timestamp {
        Timestamp {
            ticks: self.ticks.saturating_add(ticks),
        }
    }

    /// Minute bucket key: floor(ticks / one minute)
    ///
    /// Used to align independently-updating series to a common sampling
    /// instant.
    pub fn minute_key(&self) -> i64 {
        self.ticks.div_euclid(TICKS_PER_MINUTE)
    }

    /// Calendar year (UTC)
    pub fn year(&self) -> i32 {
        self.datetime().year()
    }

    /// Calendar month, 1-12 (UTC)
    pub fn month(&self) -> u32 {
        self.datetime().month()
    }

    /// Day of month, 1-31 (UTC)
    pub fn day(&self) -> u32 {
        self.datetime().day()
    }

    /// Hour of day, 0-23 (UTC)
    pub fn hour(&self) -> u32 {
        self.datetime().hour()
    }

    /// Day of week, 0 = Sunday .. 6 = Saturday (UTC)
    pub fn weekday(&self) -> u32 {
        self.datetime().weekday().num_days_from_sunday()
    }

    fn datetime(&self) -> DateTime<Utc> {
        // Out-of-range ticks fall back to the epoch rather than panicking;
        // telemetry timestamps never approach the chrono range limits.
        DateTime::from_timestamp_millis(self.ticks).unwrap_or_default()
    }
}

impl Add<i64> for Timestamp {
    type Output = Timestamp;

    fn add(self, ticks: i64) -> Timestamp {
        self.offset(ticks)
    }
}

impl Sub<i64> for Timestamp {
    type Output = Timestamp;

    fn sub(self, ticks: i64) -> Timestamp {
        self.offset(-ticks)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = i64;

    /// Elapsed ticks between two instants (positive when `self` is later)
    fn sub(self, rhs: Timestamp) -> i64 {
        self.ticks.saturating_sub(rhs.ticks)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}
