// crates/pactum-core/src/core/time.rs
// ============================================================================
// Module: Pactum Time Model
// Description: Record timestamps and clock implementations.
// Purpose: Keep wall-clock access behind an explicit, replaceable clock.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Rendering needs the local calendar date and time for the `DATA_ATUAL` and
//! `HORA_ATUAL` tokens, and every durable record carries a creation instant.
//! Both are read through a [`Clock`](crate::interfaces::Clock) so tests can pin
//! time. The engine never calls `OffsetDateTime::now_*` directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::UtcOffset;

use crate::interfaces::Clock;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Record timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are produced from a [`Clock`] reading or loaded from storage.
/// - No monotonicity is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Converts a date-time into a timestamp, saturating on overflow.
    #[must_use]
    pub fn from_datetime(value: OffsetDateTime) -> Self {
        let millis = value.unix_timestamp_nanos() / 1_000_000;
        Self(i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Returns true when this timestamp is at or before `other`.
    #[must_use]
    pub const fn is_at_or_before(self, other: Self) -> bool {
        self.0 <= other.0
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Wall clock reporting local time.
///
/// The local offset is resolved per reading. When the platform cannot report
/// it (for example in multi-threaded processes on some Unix targets) the
/// configured fallback offset is used, which defaults to UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    /// Explicit offset that overrides local offset detection.
    offset: Option<UtcOffset>,
}

impl SystemClock {
    /// Creates a clock that detects the local offset on every reading.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offset: None,
        }
    }

    /// Creates a clock pinned to a fixed UTC offset.
    #[must_use]
    pub const fn with_offset(offset: UtcOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        match self.offset {
            Some(offset) => OffsetDateTime::now_utc().to_offset(offset),
            None => OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
        }
    }
}

/// Clock frozen at a single instant, for deterministic rendering.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// The instant every reading returns.
    instant: OffsetDateTime,
}

impl FixedClock {
    /// Creates a clock that always returns `instant`.
    #[must_use]
    pub const fn new(instant: OffsetDateTime) -> Self {
        Self {
            instant,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.instant
    }
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats the calendar date as `DD/MM/YYYY`.
#[must_use]
pub fn format_date(value: OffsetDateTime) -> String {
    format!("{:02}/{:02}/{:04}", value.day(), u8::from(value.month()), value.year())
}

/// Formats the wall time as `HH:MM:SS`.
#[must_use]
pub fn format_time(value: OffsetDateTime) -> String {
    format!("{:02}:{:02}:{:02}", value.hour(), value.minute(), value.second())
}
