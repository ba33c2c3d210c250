//! Injectable clock.
//!
//! Every time-dependent formula in the engine takes a [`ClockReading`] rather
//! than consulting the wall clock, so callers can pin "now" in tests.

use std::cell::Cell;

use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Number of 15-minute buckets in a day.
pub const BUCKETS_PER_DAY: u8 = 96;

/// A point in time as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    pub date: NaiveDate,
    /// Hour of day (0-23)
    pub hour: u8,
    /// Minute of hour (0-59)
    pub minute: u8,
}

impl ClockReading {
    /// Build a reading, clamping hour and minute into range.
    pub fn new(date: NaiveDate, hour: u8, minute: u8) -> Self {
        Self {
            date,
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }

    /// Reading on the given weekday of a fixed reference week.
    ///
    /// Useful when only the day of week matters.
    pub fn on_weekday(day: Weekday, hour: u8, minute: u8) -> Self {
        // 2024-01-07 is a Sunday.
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap_or_default();
        let date = sunday + Duration::days(day.num_days_from_sunday() as i64);
        Self::new(date, hour, minute)
    }

    pub fn day_of_week(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.day_of_week(), Weekday::Sat | Weekday::Sun)
    }

    pub fn minutes_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// 15-minute slot of the day, `0..=95`.
    pub fn bucket(&self) -> u8 {
        time_bucket(self.hour, self.minute)
    }

    /// The reading, taken as local wall time, converted to UTC.
    ///
    /// A reading inside a DST gap has no local instant and is taken as UTC.
    pub fn timestamp(&self) -> chrono::DateTime<Utc> {
        let naive = self
            .date
            .and_hms_opt(self.hour as u32, self.minute as u32, 0)
            .unwrap_or_default();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }
}

/// Map an hour/minute pair to its 15-minute bucket.
pub fn time_bucket(hour: u8, minute: u8) -> u8 {
    (hour.min(23) * 4 + minute.min(59) / 15).min(BUCKETS_PER_DAY - 1)
}

/// Source of "now".
pub trait TimeClock {
    fn now(&self) -> ClockReading;
}

/// Wall clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeClock for SystemClock {
    fn now(&self) -> ClockReading {
        let now = Local::now();
        ClockReading::new(now.date_naive(), now.hour() as u8, now.minute() as u8)
    }
}

/// Clock pinned to a reading, advanced explicitly.
#[derive(Debug, Clone)]
pub struct FixedClock {
    reading: Cell<ClockReading>,
}

impl FixedClock {
    pub fn new(reading: ClockReading) -> Self {
        Self {
            reading: Cell::new(reading),
        }
    }

    pub fn set(&self, reading: ClockReading) {
        self.reading.set(reading);
    }

    /// Move the clock forward, rolling over into following days.
    pub fn advance_minutes(&self, minutes: u32) {
        let current = self.reading.get();
        let total = current.minutes_of_day() as u32 + minutes;
        let days = total / 1440;
        let rem = total % 1440;
        let date = current.date + Duration::days(days as i64);
        self.reading
            .set(ClockReading::new(date, (rem / 60) as u8, (rem % 60) as u8));
    }
}

impl TimeClock for FixedClock {
    fn now(&self) -> ClockReading {
        self.reading.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(time_bucket(0, 0), 0);
        assert_eq!(time_bucket(0, 14), 0);
        assert_eq!(time_bucket(0, 15), 1);
        assert_eq!(time_bucket(8, 0), 32);
        assert_eq!(time_bucket(23, 59), 95);
    }

    #[test]
    fn on_weekday_lands_on_requested_day() {
        for day in [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Wed,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            assert_eq!(ClockReading::on_weekday(day, 9, 0).day_of_week(), day);
        }
        assert!(ClockReading::on_weekday(Weekday::Sat, 9, 0).is_weekend());
        assert!(!ClockReading::on_weekday(Weekday::Mon, 9, 0).is_weekend());
    }

    #[test]
    fn fixed_clock_advances_across_midnight() {
        let clock = FixedClock::new(ClockReading::on_weekday(Weekday::Mon, 23, 50));
        clock.advance_minutes(20);
        let now = clock.now();
        assert_eq!(now.day_of_week(), Weekday::Tue);
        assert_eq!((now.hour, now.minute), (0, 10));
    }

    #[test]
    fn timestamp_reads_back_as_the_same_local_time() {
        let r = ClockReading::on_weekday(Weekday::Wed, 14, 30);
        let local = r.timestamp().with_timezone(&Local);
        assert_eq!(local.date_naive(), r.date);
        assert_eq!((local.hour(), local.minute()), (14, 30));
    }

    #[test]
    fn minutes_of_day() {
        let r = ClockReading::on_weekday(Weekday::Wed, 14, 30);
        assert_eq!(r.minutes_of_day(), 870);
    }
}
