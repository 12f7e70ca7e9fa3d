//! Time utilities for delivery windows
//!
//! Time-of-day parsing and ordering, half-open interval overlap, date
//! normalization against the reference time zone, and the default
//! delivery schedule.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::delivery_slot::TimeWindow;

/// First hour of the default delivery day
pub const DEFAULT_FIRST_HOUR: u16 = 9;
/// Hour at which the last default window ends
pub const DEFAULT_LAST_HOUR: u16 = 21;
/// Reason recorded when a window is blocked without one
pub const DEFAULT_BLOCK_REASON: &str = "Blocked";

static TIME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

/// Check a time string against the `HH:mm` 24-hour grammar (leading zero optional)
pub fn validate_time_format(time: &str) -> bool {
    TIME_FORMAT.is_match(time)
}

/// A time of day with minute precision, rendered as `HH:mm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self(hour * 60 + minute))
    }

    /// Minutes since midnight
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid time '{}'. Use HH:mm format", s);
        if !validate_time_format(s) {
            return Err(invalid());
        }
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// True when `start` is strictly earlier than `end`; false if either is malformed
pub fn before_end_time(start: &str, end: &str) -> bool {
    match (start.parse::<TimeOfDay>(), end.parse::<TimeOfDay>()) {
        (Ok(s), Ok(e)) => s < e,
        _ => false,
    }
}

/// Half-open intervals `[start_a, end_a)` and `[start_b, end_b)` share an instant.
/// Touching intervals do not overlap.
pub fn overlaps(start_a: TimeOfDay, end_a: TimeOfDay, start_b: TimeOfDay, end_b: TimeOfDay) -> bool {
    start_a < end_b && start_b < end_a
}

/// Whether any two intervals of the list overlap each other
pub fn has_pairwise_overlap(intervals: &[(TimeOfDay, TimeOfDay)]) -> bool {
    intervals.iter().enumerate().any(|(i, &(s1, e1))| {
        intervals[i + 1..]
            .iter()
            .any(|&(s2, e2)| overlaps(s1, e1, s2, e2))
    })
}

/// Calendar date of an instant in the reference time zone
pub fn normalize_date<Tz: TimeZone>(instant: &DateTime<Tz>, reference: &FixedOffset) -> NaiveDate {
    instant.with_timezone(reference).date_naive()
}

/// Parse a date input into its normalized calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (converted to the reference
/// zone first) and naive `YYYY-MM-DDTHH:MM:SS` timestamps read as
/// reference-local time.
pub fn parse_date(input: &str, reference: &FixedOffset) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(normalize_date(&instant, reference));
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.date())
}

/// A date strictly before today is past; today is never past
pub fn is_past(date: NaiveDate, clock: &dyn Clock) -> bool {
    date < clock.today()
}

pub fn valid_range(start: NaiveDate, end: NaiveDate) -> bool {
    start <= end
}

/// Twelve open one-hour windows from 09:00 to 21:00, ascending
pub fn default_schedule() -> Vec<TimeWindow> {
    (DEFAULT_FIRST_HOUR..DEFAULT_LAST_HOUR)
        .map(|hour| TimeWindow::open(TimeOfDay(hour * 60), TimeOfDay((hour + 1) * 60)))
        .collect()
}

/// Source of "today" for past-date checks
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock read in the reference time zone
#[derive(Debug, Clone)]
pub struct SystemClock {
    reference: FixedOffset,
}

impl SystemClock {
    pub fn new(reference: FixedOffset) -> Self {
        Self { reference }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        normalize_date(&Utc::now(), &self.reference)
    }
}

/// Clock pinned to a single day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
