//! Work schedule and clock-time arithmetic.
//!
//! Clock times are minutes of day. Arithmetic that can leave the day
//! (departures before midnight, arrivals after it) wraps into `00:00..=23:59`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScheduleError;

pub const MINUTES_PER_DAY: i32 = 1440;

/// Time of day with minute resolution, displayed as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from hour and minute; `None` when out of range.
    pub fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then(|| Self(hour as u16 * 60 + minute as u16))
    }

    /// Wrap any signed minute count into the day.
    pub fn wrapping(minutes: i32) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Working hours and the safety margin added before arrival.
///
/// Supplied by the caller; read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkSchedule {
    start: ClockTime,
    end: ClockTime,
    buffer_minutes: i32,
}

impl WorkSchedule {
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidSchedule`] when `start` is not before
    /// `end` or the buffer is negative.
    pub fn new(start: ClockTime, end: ClockTime, buffer_minutes: i32) -> Result<Self, ScheduleError> {
        let reject = |reason: &str| ScheduleError::InvalidSchedule {
            start: start.to_string(),
            end: end.to_string(),
            buffer_minutes,
            reason: reason.to_string(),
        };
        if start >= end {
            return Err(reject("start must be before end"));
        }
        if buffer_minutes < 0 {
            return Err(reject("buffer must not be negative"));
        }
        Ok(Self {
            start,
            end,
            buffer_minutes,
        })
    }

    /// Parse `HH:MM` strings and validate.
    pub fn parse(start: &str, end: &str, buffer_minutes: i32) -> Result<Self, ScheduleError> {
        Self::new(start.parse()?, end.parse()?, buffer_minutes)
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    pub fn buffer_minutes(&self) -> i32 {
        self.buffer_minutes
    }
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self {
            start: ClockTime(9 * 60),
            end: ClockTime(18 * 60),
            buffer_minutes: 5,
        }
    }
}

#[derive(Deserialize)]
struct RawSchedule {
    start: ClockTime,
    end: ClockTime,
    buffer_minutes: i32,
}

impl<'de> Deserialize<'de> for WorkSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSchedule::deserialize(deserializer)?;
        WorkSchedule::new(raw.start, raw.end, raw.buffer_minutes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let t: ClockTime = "08:05".parse().unwrap();
        assert_eq!(t.minutes(), 485);
        assert_eq!(t.to_string(), "08:05");
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("9h".parse::<ClockTime>().is_err());
        assert!("09:60".parse::<ClockTime>().is_err());
    }

    #[test]
    fn wrapping_covers_both_directions() {
        assert_eq!(ClockTime::wrapping(-10).to_string(), "23:50");
        assert_eq!(ClockTime::wrapping(1440 + 75).to_string(), "01:15");
        assert_eq!(ClockTime::wrapping(0).to_string(), "00:00");
    }

    #[test]
    fn schedule_rejects_inverted_hours() {
        let err = WorkSchedule::parse("18:00", "09:00", 5).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidSchedule { .. }));
        assert!(WorkSchedule::parse("09:00", "09:00", 5).is_err());
    }

    #[test]
    fn schedule_rejects_negative_buffer() {
        assert!(WorkSchedule::parse("09:00", "18:00", -1).is_err());
        assert!(WorkSchedule::parse("09:00", "18:00", 0).is_ok());
    }

    #[test]
    fn schedule_deserialization_validates() {
        let ok: WorkSchedule =
            serde_json::from_str(r#"{"start":"09:00","end":"18:00","buffer_minutes":5}"#).unwrap();
        assert_eq!(ok.start().to_string(), "09:00");
        let bad = serde_json::from_str::<WorkSchedule>(
            r#"{"start":"19:00","end":"18:00","buffer_minutes":5}"#,
        );
        assert!(bad.is_err());
    }
}
