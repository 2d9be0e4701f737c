//! Time-of-day clock reconstruction.
//!
//! The bot writes timestamps as `HH:MM:SS[.ffffff]` with no date. Over a long
//! session the raw clock appears to run backward whenever a 12-hour or
//! 24-hour boundary is crossed. [`TimeOfDayClock`] places every reading on a
//! fixed anchor date and keeps a cumulative offset that is bumped when a
//! backward jump looks like such a rollover.
//!
//! # Rollover heuristic
//!
//! With `delta` = current raw reading − previous raw reading (seconds):
//!
//! | Condition | Action |
//! |-----------|--------|
//! | `delta >= -36000` | none |
//! | `-46800 < delta < -39600` | offset += 12h (half-day rollover) |
//! | `delta < -80000` | offset += 24h (full-day rollover) |
//! | any other `delta < -36000` | none (regression accepted as noise) |
//!
//! The thresholds are empirical and must stay exactly as written: charts
//! produced from older logs depend on them. Deltas are always measured
//! between *raw* readings, never against the corrected timeline.
//!
//! # Example
//!
//! ```
//! use trade_log_reconstructor::reconstruct::clock::{RolloverKind, TimeOfDayClock};
//!
//! let mut clock = TimeOfDayClock::default();
//!
//! let first = clock.advance("23:59:58.250").unwrap();
//! assert!(first.rollover.is_none());
//!
//! // 11:59 PM -> 00:00 looks like a 24h wrap
//! let next = clock.advance("00:00:01").unwrap();
//! assert_eq!(next.rollover.map(|r| r.kind), Some(RolloverKind::FullDay));
//! assert!(next.timestamp > first.timestamp);
//! ```

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::types::Timestamp;

// ============================================================================
// Constants
// ============================================================================

/// Microseconds per second
const US_PER_SECOND: i64 = 1_000_000;

/// Digits of sub-second precision kept from the log
const FRACTION_DIGITS: usize = 6;

/// Backward jumps at or above this (seconds) are never considered rollovers
const REGRESSION_THRESHOLD_SECS: i64 = -36_000;

/// Open interval (seconds) recognized as a 12-hour clock rollover
const HALF_DAY_WINDOW_SECS: (i64, i64) = (-46_800, -39_600);

/// Backward jumps below this (seconds) are recognized as a 24-hour rollover
const FULL_DAY_THRESHOLD_SECS: i64 = -80_000;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for clock reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Date every time-of-day reading is placed on before offsets apply.
    ///
    /// Default: 2024-01-01
    pub anchor_date: NaiveDate,
}

impl ClockConfig {
    /// Create a configuration anchored on `anchor_date`.
    pub fn new(anchor_date: NaiveDate) -> Self {
        Self { anchor_date }
    }

    /// Set the anchor date.
    pub fn with_anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.anchor_date = anchor_date;
        self
    }

    /// Midnight of the anchor date.
    pub fn anchor(&self) -> Timestamp {
        self.anchor_date.and_time(NaiveTime::MIN)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            anchor_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

// ============================================================================
// Rollover Event
// ============================================================================

/// Classification of a large backward jump in the raw clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolloverKind {
    /// 12-hour clock wrap; offset grew by 12h
    HalfDay,
    /// 24-hour day wrap; offset grew by 24h
    FullDay,
    /// Regression past the threshold that matched neither window; no change
    Uncorrected,
}

/// Information about a detected backward jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rollover {
    pub kind: RolloverKind,

    /// Raw delta that triggered the classification.
    pub delta: Duration,

    /// Cumulative offset after this reading.
    pub offset_after: Duration,
}

impl Rollover {
    /// Raw delta in seconds (microsecond precision).
    pub fn delta_seconds(&self) -> f64 {
        duration_micros(self.delta) as f64 / US_PER_SECOND as f64
    }

    /// Whether the offset was changed.
    pub fn is_corrected(&self) -> bool {
        !matches!(self.kind, RolloverKind::Uncorrected)
    }
}

/// Result of feeding one time-of-day string to the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    /// Corrected absolute timestamp.
    pub timestamp: Timestamp,

    /// Reading placed on the anchor date, before offsets.
    pub raw: Timestamp,

    /// Set when the jump from the previous raw reading crossed the
    /// regression threshold.
    pub rollover: Option<Rollover>,
}

// ============================================================================
// Clock Statistics
// ============================================================================

/// Counters for clock reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockStats {
    /// Successfully parsed readings.
    pub readings: u64,

    /// Strings that failed to parse (state untouched).
    pub rejected: u64,

    /// 12-hour corrections applied.
    pub half_day_corrections: u64,

    /// 24-hour corrections applied.
    pub full_day_corrections: u64,

    /// Large regressions left uncorrected.
    pub uncorrected_regressions: u64,
}

impl ClockStats {
    /// Total corrections applied.
    pub fn corrections(&self) -> u64 {
        self.half_day_corrections + self.full_day_corrections
    }
}

// ============================================================================
// Time-of-day parsing
// ============================================================================

/// Parse `HH:MM:SS[.ffffff]` into a time of day.
///
/// The fraction is truncated to 6 characters and right-padded with zeros, so
/// `.5` is 500 000 µs and `.1234567` is 123 456 µs. Only the retained
/// fraction characters are validated.
///
/// ```
/// use trade_log_reconstructor::reconstruct::clock::parse_time_of_day;
/// use chrono::Timelike;
///
/// let t = parse_time_of_day("09:15:30.5").unwrap();
/// assert_eq!((t.hour(), t.minute(), t.second()), (9, 15, 30));
/// assert_eq!(t.nanosecond(), 500_000_000);
///
/// assert!(parse_time_of_day("24:00:00").is_err());
/// assert!(parse_time_of_day("9:15").is_err());
/// ```
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, RecordError> {
    let raw = raw.trim();
    let invalid = || RecordError::InvalidTimestamp(raw.to_string());

    let (hms, fraction) = match raw.split_once('.') {
        Some((hms, fraction)) => {
            if fraction.contains('.') {
                return Err(invalid());
            }
            (hms, Some(fraction))
        }
        None => (raw, None),
    };

    let mut parts = hms.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hour = parse_digits(h).ok_or_else(invalid)?;
    let minute = parse_digits(m).ok_or_else(invalid)?;
    let second = parse_digits(s).ok_or_else(invalid)?;

    let micros = match fraction {
        Some(fraction) => {
            let kept: String = fraction.chars().take(FRACTION_DIGITS).collect();
            if !kept.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            format!("{kept:0<width$}", width = FRACTION_DIGITS)
                .parse::<u32>()
                .map_err(|_| invalid())?
        }
        None => 0,
    };

    NaiveTime::from_hms_micro_opt(hour, minute, second, micros).ok_or_else(invalid)
}

/// Non-empty run of ASCII digits.
fn parse_digits(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

#[inline]
fn duration_micros(d: Duration) -> i64 {
    d.num_microseconds().unwrap_or(i64::MAX)
}

// ============================================================================
// Time-of-day Clock
// ============================================================================

/// Turns time-of-day strings into a monotonic-ish absolute timeline.
///
/// Owned by a single parse run; never shared.
#[derive(Debug, Clone)]
pub struct TimeOfDayClock {
    config: ClockConfig,

    /// Cumulative correction.
    offset: Duration,

    /// Last raw reading on the anchor date.
    last_raw: Option<NaiveDateTime>,

    /// Last corrected timestamp.
    last_adjusted: Option<Timestamp>,

    stats: ClockStats,
}

impl TimeOfDayClock {
    /// Create a new clock with the given configuration.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            offset: Duration::zero(),
            last_raw: None,
            last_adjusted: None,
            stats: ClockStats::default(),
        }
    }

    /// Parse and place one time-of-day string.
    ///
    /// On error the clock state is left untouched.
    pub fn advance(&mut self, raw: &str) -> Result<ClockReading, RecordError> {
        let time = match parse_time_of_day(raw) {
            Ok(time) => time,
            Err(err) => {
                self.stats.rejected += 1;
                return Err(err);
            }
        };

        Ok(self.advance_time(time))
    }

    /// Place an already-parsed time of day.
    pub fn advance_time(&mut self, time: NaiveTime) -> ClockReading {
        let current_raw = self.config.anchor_date.and_time(time);

        let rollover = self
            .last_raw
            .and_then(|last_raw| self.classify_jump(current_raw - last_raw));

        self.last_raw = Some(current_raw);
        let timestamp = current_raw + self.offset;
        self.last_adjusted = Some(timestamp);
        self.stats.readings += 1;

        ClockReading {
            timestamp,
            raw: current_raw,
            rollover,
        }
    }

    /// Apply the rollover heuristic to a raw delta, bumping the offset.
    fn classify_jump(&mut self, delta: Duration) -> Option<Rollover> {
        let delta_us = duration_micros(delta);
        if delta_us >= REGRESSION_THRESHOLD_SECS * US_PER_SECOND {
            return None;
        }

        let (window_low, window_high) = HALF_DAY_WINDOW_SECS;
        let kind = if delta_us > window_low * US_PER_SECOND
            && delta_us < window_high * US_PER_SECOND
        {
            self.offset = self.offset + Duration::hours(12);
            self.stats.half_day_corrections += 1;
            RolloverKind::HalfDay
        } else if delta_us < FULL_DAY_THRESHOLD_SECS * US_PER_SECOND {
            self.offset = self.offset + Duration::hours(24);
            self.stats.full_day_corrections += 1;
            RolloverKind::FullDay
        } else {
            self.stats.uncorrected_regressions += 1;
            RolloverKind::Uncorrected
        };

        Some(Rollover {
            kind,
            delta,
            offset_after: self.offset,
        })
    }

    /// Cumulative correction applied to raw readings.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Last raw reading, if any.
    pub fn last_raw(&self) -> Option<Timestamp> {
        self.last_raw
    }

    /// Last corrected timestamp, if any.
    pub fn last_adjusted(&self) -> Option<Timestamp> {
        self.last_adjusted
    }

    /// Midnight of the anchor date.
    pub fn anchor(&self) -> Timestamp {
        self.config.anchor()
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn stats(&self) -> &ClockStats {
        &self.stats
    }

    /// Reset the clock to its initial state.
    pub fn reset(&mut self) {
        self.offset = Duration::zero();
        self.last_raw = None;
        self.last_adjusted = None;
        self.stats = ClockStats::default();
    }
}

impl Default for TimeOfDayClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn at(h: u32, m: u32, s: u32, us: u32) -> Timestamp {
        ClockConfig::default()
            .anchor_date
            .and_hms_micro_opt(h, m, s, us)
            .unwrap()
    }

    #[test]
    fn test_config_default_anchor() {
        let config = ClockConfig::default();
        assert_eq!(
            config.anchor_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(config.anchor(), at(0, 0, 0, 0));
    }

    #[test]
    fn test_parse_full_precision() {
        let t = parse_time_of_day("12:34:56.123456").unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (12, 34, 56));
        assert_eq!(t.nanosecond() / 1_000, 123_456);
    }

    #[test]
    fn test_parse_fraction_padding_and_truncation() {
        assert_eq!(parse_time_of_day("00:00:01.5").unwrap().nanosecond(), 500_000_000);
        assert_eq!(parse_time_of_day("00:00:01.000042").unwrap().nanosecond(), 42_000);
        assert_eq!(
            parse_time_of_day("00:00:01.1234569").unwrap().nanosecond(),
            123_456_000
        );
        // Characters past the sixth are discarded unchecked
        assert_eq!(
            parse_time_of_day("00:00:01.123456xyz").unwrap().nanosecond(),
            123_456_000
        );
        assert_eq!(parse_time_of_day("00:00:01.").unwrap().nanosecond(), 0);
        assert_eq!(parse_time_of_day("00:00:01").unwrap().nanosecond(), 0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "",
            "12:00",
            "12:00:00:00",
            "aa:00:00",
            "12:-1:00",
            "12:00:60",
            "24:00:00",
            "12:00:00.12a",
            "12:00:00.1.2",
            "12: 00:00",
        ] {
            assert!(parse_time_of_day(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        assert!(parse_time_of_day("  08:00:00.000001 \r").is_ok());
    }

    #[test]
    fn test_forward_readings_have_no_offset() {
        let mut clock = TimeOfDayClock::default();
        let a = clock.advance("00:00:01.000000").unwrap();
        let b = clock.advance("00:00:02.500000").unwrap();

        assert_eq!(a.timestamp, at(0, 0, 1, 0));
        assert_eq!(b.timestamp, at(0, 0, 2, 500_000));
        assert!(b.rollover.is_none());
        assert_eq!(clock.offset(), Duration::zero());
    }

    #[test]
    fn test_half_day_rollover() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("12:00:00").unwrap();
        let reading = clock.advance("00:00:05").unwrap();

        let rollover = reading.rollover.unwrap();
        assert_eq!(rollover.kind, RolloverKind::HalfDay);
        assert_eq!(rollover.delta_seconds(), -43_195.0);
        assert_eq!(clock.offset(), Duration::hours(12));
        assert_eq!(reading.timestamp, at(12, 0, 5, 0));
        assert_eq!(clock.stats().half_day_corrections, 1);
    }

    #[test]
    fn test_half_day_window_is_open() {
        // Exactly -39600s is outside the window and above the 24h threshold
        let mut clock = TimeOfDayClock::default();
        clock.advance("11:00:00").unwrap();
        let reading = clock.advance("00:00:00").unwrap();
        assert_eq!(reading.rollover.unwrap().kind, RolloverKind::Uncorrected);
        assert_eq!(clock.offset(), Duration::zero());

        // Exactly -46800s is outside the window too
        let mut clock = TimeOfDayClock::default();
        clock.advance("13:00:00").unwrap();
        let reading = clock.advance("00:00:00").unwrap();
        assert_eq!(reading.rollover.unwrap().kind, RolloverKind::Uncorrected);

        // Just inside
        let mut clock = TimeOfDayClock::default();
        clock.advance("12:59:59.999999").unwrap();
        let reading = clock.advance("00:00:00").unwrap();
        assert_eq!(reading.rollover.unwrap().kind, RolloverKind::HalfDay);
    }

    #[test]
    fn test_full_day_rollover() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("23:59:59.900000").unwrap();
        let reading = clock.advance("00:00:00.100000").unwrap();

        assert_eq!(reading.rollover.unwrap().kind, RolloverKind::FullDay);
        assert_eq!(clock.offset(), Duration::hours(24));
        assert_eq!(
            reading.timestamp,
            at(0, 0, 0, 100_000) + Duration::hours(24)
        );
        assert_eq!(clock.stats().full_day_corrections, 1);
    }

    #[test]
    fn test_small_regression_is_ignored() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("10:00:00").unwrap();
        let reading = clock.advance("09:59:59").unwrap();
        assert!(reading.rollover.is_none());
        assert_eq!(reading.timestamp, at(9, 59, 59, 0));
    }

    #[test]
    fn test_uncorrected_regression_between_windows() {
        // -20h: below -36000 but neither a 12h nor a 24h wrap
        let mut clock = TimeOfDayClock::default();
        clock.advance("20:00:00").unwrap();
        let reading = clock.advance("00:00:00").unwrap();

        let rollover = reading.rollover.unwrap();
        assert_eq!(rollover.kind, RolloverKind::Uncorrected);
        assert!(!rollover.is_corrected());
        assert_eq!(clock.stats().uncorrected_regressions, 1);
        assert_eq!(clock.offset(), Duration::zero());
    }

    #[test]
    fn test_delta_measured_against_raw_reading() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("12:00:00").unwrap();
        clock.advance("00:00:01").unwrap(); // +12h
        clock.advance("11:59:00").unwrap(); // forward in raw terms
        let reading = clock.advance("00:00:02").unwrap(); // ~-43138s raw

        assert_eq!(reading.rollover.unwrap().kind, RolloverKind::HalfDay);
        assert_eq!(clock.offset(), Duration::hours(24));
        assert_eq!(reading.raw, at(0, 0, 2, 0));
    }

    #[test]
    fn test_rejected_reading_leaves_state() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("23:00:00").unwrap();
        assert!(clock.advance("garbage").is_err());

        assert_eq!(clock.last_raw(), Some(at(23, 0, 0, 0)));
        assert_eq!(clock.stats().rejected, 1);
        assert_eq!(clock.stats().readings, 1);
    }

    #[test]
    fn test_adjusted_timeline_is_monotonic_after_correction() {
        let mut clock = TimeOfDayClock::default();
        let readings: Vec<_> = ["11:58:00", "11:59:30", "00:00:10", "00:01:00", "00:05:00"]
            .iter()
            .map(|raw| clock.advance(raw).unwrap().timestamp)
            .collect();

        assert!(readings.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reset() {
        let mut clock = TimeOfDayClock::default();
        clock.advance("23:59:00").unwrap();
        clock.advance("00:00:01").unwrap();
        assert_eq!(clock.offset(), Duration::hours(24));

        clock.reset();
        assert_eq!(clock.offset(), Duration::zero());
        assert!(clock.last_raw().is_none());
        assert!(clock.last_adjusted().is_none());
        assert_eq!(clock.stats(), &ClockStats::default());
    }

    #[test]
    fn test_custom_anchor_date() {
        let anchor = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let mut clock = TimeOfDayClock::new(ClockConfig::default().with_anchor_date(anchor));
        let reading = clock.advance("01:02:03").unwrap();
        assert_eq!(reading.timestamp, anchor.and_hms_opt(1, 2, 3).unwrap());
    }
}
