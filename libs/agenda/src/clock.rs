use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AgendaError;

/// Granularity of the time an appointment blocks, in minutes.
pub const RESERVATION_STEP_MINUTES: u32 = 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A wall-clock time of day with minute precision (`HH:MM` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn from_naive(time: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    /// Half-open interval starting here and lasting `minutes`.
    /// The end may run past midnight.
    pub fn span(self, minutes: u32) -> Interval {
        Interval::new(self.minutes(), self.minutes() + minutes)
    }
}

impl FromStr for ClockTime {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AgendaError::InvalidTime(s.to_string());
        let (h, m) = split_hm(s).ok_or_else(invalid)?;
        Self::from_hm(h, m).ok_or_else(invalid)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse `H:MM` / `HH:MM` into (hours, minutes) without range checks on hours.
fn split_hm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let minutes: u32 = m.parse().ok()?;
    if minutes > 59 {
        return None;
    }
    Some((h.parse().ok()?, minutes))
}

/// Parse a service duration formatted `HH:MM` into minutes. Zero is rejected.
pub fn parse_duration(s: &str) -> Result<u32, AgendaError> {
    let (h, m) = split_hm(s).ok_or_else(|| AgendaError::InvalidDuration(s.to_string()))?;
    match h * 60 + m {
        0 => Err(AgendaError::InvalidDuration(s.to_string())),
        total => Ok(total),
    }
}

/// Minutes an appointment actually blocks for a service lasting `duration`:
/// rounded up to the next multiple of 30, never less than 30.
pub fn reservation_minutes(duration: u32) -> u32 {
    duration.div_ceil(RESERVATION_STEP_MINUTES).max(1) * RESERVATION_STEP_MINUTES
}

/// Render a minute count that may exceed one day as `HH:MM` on a 24h clock.
pub fn format_minutes_of_day(minutes: u32) -> String {
    let wrapped = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
}

/// Half-open `[start, end)` range in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}
