//! Congestion model.
//!
//! Turns a base duration into a final duration by multiplying three factors:
//!
//! ```text
//! combined = peak(direction, time, weekday/weekend) * day_of_week * weather
//! duration = round(base * combined * jitter),  jitter in [0.95, 1.05]
//! ```
//!
//! The weekend peak windows replace the weekday ones, and the day-of-week
//! table is applied on top of them as on any other day.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::clock::ClockReading;
use crate::estimator::{BaseEstimate, RouteEstimator};
use crate::history::Trend;
use crate::jitter::JitterSource;
use crate::location::{Direction, RouteKey};
use crate::storage::KvStore;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 360;

const FLOWING_MAX: f64 = 1.2;
const SLOW_MAX: f64 = 1.5;
const HIGH_CONFIDENCE_MAX: f64 = 1.1;
const MEDIUM_CONFIDENCE_MAX: f64 = 1.5;
const ALTERNATIVE_ROUTE_MIN: f64 = 1.4;
const DURATION_JITTER: (f64, f64) = (0.95, 1.05);

/// Weather as it affects driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSeverity {
    #[default]
    Clear,
    Fog,
    LightPrecipitation,
    HeavyPrecipitation,
    Storm,
}

impl WeatherSeverity {
    pub fn multiplier(self) -> f64 {
        match self {
            WeatherSeverity::Clear => 1.0,
            WeatherSeverity::Fog => 1.10,
            WeatherSeverity::LightPrecipitation => 1.15,
            WeatherSeverity::HeavyPrecipitation | WeatherSeverity::Storm => 1.25,
        }
    }

    /// Classify a WMO weather interpretation code.
    pub fn from_wmo_code(code: u8) -> Self {
        match code {
            45 | 48 => WeatherSeverity::Fog,
            51..=67 => WeatherSeverity::LightPrecipitation,
            80..=94 => WeatherSeverity::HeavyPrecipitation,
            95..=99 => WeatherSeverity::Storm,
            _ => WeatherSeverity::Clear,
        }
    }

    pub fn is_precipitation(self) -> bool {
        !matches!(self, WeatherSeverity::Clear | WeatherSeverity::Fog)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Flowing,
    Slow,
    Congested,
}

impl Condition {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier <= FLOWING_MAX {
            Condition::Flowing
        } else if multiplier <= SLOW_MAX {
            Condition::Slow
        } else {
            Condition::Congested
        }
    }

    /// Ordinal severity, 0 = flowing.
    pub fn severity(self) -> u8 {
        match self {
            Condition::Flowing => 0,
            Condition::Slow => 1,
            Condition::Congested => 2,
        }
    }
}

/// Higher multipliers carry more uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier <= HIGH_CONFIDENCE_MAX {
            Confidence::High
        } else if multiplier <= MEDIUM_CONFIDENCE_MAX {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Rise-then-fall congestion curve, times in minutes of day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start: u16,
    pub peak: u16,
    pub end: u16,
    pub rise_exponent: f64,
    pub fall_exponent: f64,
    /// Multiplier above 1.0 reached at `peak`
    pub amplitude: f64,
}

impl PeakWindow {
    pub fn morning() -> Self {
        Self {
            start: 6 * 60 + 30,
            peak: 8 * 60,
            end: 9 * 60 + 30,
            rise_exponent: 1.5,
            fall_exponent: 0.7,
            amplitude: 1.2,
        }
    }

    pub fn evening() -> Self {
        Self {
            start: 16 * 60 + 30,
            peak: 18 * 60,
            end: 19 * 60 + 30,
            rise_exponent: 1.3,
            fall_exponent: 0.8,
            amplitude: 1.4,
        }
    }

    /// Multiplier at `minute`; 1.0 outside the window.
    pub fn multiplier(&self, minute: u16) -> f64 {
        if minute < self.start || minute > self.end {
            return 1.0;
        }
        if minute <= self.peak {
            let span = (self.peak - self.start).max(1) as f64;
            let progress = (minute - self.start) as f64 / span;
            1.0 + progress.powf(self.rise_exponent) * self.amplitude
        } else {
            let span = (self.end - self.peak).max(1) as f64;
            let progress = (minute - self.peak) as f64 / span;
            1.0 + self.amplitude - progress.powf(self.fall_exponent) * self.amplitude
        }
    }
}

/// Constant multiplier over an inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatWindow {
    pub start: u16,
    pub end: u16,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakProfile {
    pub outbound: PeakWindow,
    pub return_trip: PeakWindow,
    /// Replaces both weekday windows on Saturday and Sunday
    pub weekend: Vec<FlatWindow>,
}

impl Default for PeakProfile {
    fn default() -> Self {
        Self {
            outbound: PeakWindow::morning(),
            return_trip: PeakWindow::evening(),
            weekend: vec![
                FlatWindow {
                    start: 10 * 60,
                    end: 12 * 60,
                    multiplier: 1.2,
                },
                FlatWindow {
                    start: 19 * 60,
                    end: 21 * 60,
                    multiplier: 1.3,
                },
            ],
        }
    }
}

impl PeakProfile {
    pub fn peak_multiplier(&self, direction: Direction, at: &ClockReading) -> f64 {
        let minute = at.minutes_of_day();
        if at.is_weekend() {
            return self
                .weekend
                .iter()
                .find(|w| minute >= w.start && minute <= w.end)
                .map(|w| w.multiplier)
                .unwrap_or(1.0);
        }
        match direction {
            Direction::Outbound => self.outbound.multiplier(minute),
            Direction::Return => self.return_trip.multiplier(minute),
        }
    }
}

pub fn day_of_week_multiplier(day: Weekday) -> f64 {
    match day {
        Weekday::Mon => 1.05,
        Weekday::Tue | Weekday::Wed | Weekday::Thu => 1.0,
        Weekday::Fri => 1.08,
        Weekday::Sat => 0.7,
        Weekday::Sun => 0.6,
    }
}

/// Suggested detour for a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHint {
    pub label: String,
    pub extra_minutes: u32,
}

impl std::fmt::Display for RouteHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (+{} min)", self.label, self.extra_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionReading {
    pub route: RouteKey,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub base_minutes: u32,
    pub duration_minutes: u32,
    pub distance_km: f64,
    pub multiplier: f64,
    pub condition: Condition,
    pub confidence: Confidence,
    pub trend: Trend,
    pub alternative_route: Option<RouteHint>,
}

/// Inputs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub route: &'a RouteKey,
    pub base: BaseEstimate,
    pub at: ClockReading,
    pub weather: WeatherSeverity,
}

#[derive(Debug, Clone, Default)]
pub struct CongestionModel {
    profile: PeakProfile,
    outbound_hint: Option<RouteHint>,
    return_hint: Option<RouteHint>,
}

impl CongestionModel {
    pub fn new(profile: PeakProfile) -> Self {
        Self {
            profile,
            outbound_hint: None,
            return_hint: None,
        }
    }

    pub fn with_hints(mut self, outbound: Option<RouteHint>, return_trip: Option<RouteHint>) -> Self {
        self.outbound_hint = outbound;
        self.return_hint = return_trip;
        self
    }

    pub fn profile(&self) -> &PeakProfile {
        &self.profile
    }

    pub fn combined_multiplier(
        &self,
        direction: Direction,
        at: &ClockReading,
        weather: WeatherSeverity,
    ) -> f64 {
        self.profile.peak_multiplier(direction, at)
            * day_of_week_multiplier(at.day_of_week())
            * weather.multiplier()
    }

    /// Evaluate a route, record the resulting duration in history and
    /// derive the trend from the updated bucket.
    ///
    /// History holds base durations, so the recorded sample is the final
    /// duration with the combined multiplier divided back out (the duration
    /// jitter stays in). Repeated estimates in one bucket therefore keep the
    /// same base instead of compounding the multiplier.
    pub fn evaluate(
        &self,
        estimator: &mut RouteEstimator,
        store: &dyn KvStore,
        jitter: &mut dyn JitterSource,
        input: Evaluation<'_>,
    ) -> CongestionReading {
        let direction = input.route.direction;
        let multiplier = self.combined_multiplier(direction, &input.at, input.weather);
        let factor = jitter.uniform(DURATION_JITTER.0, DURATION_JITTER.1);
        let duration = final_duration(input.base.minutes, multiplier, factor);

        let bucket = input.at.bucket();
        let sample = base_sample(duration, multiplier);
        estimator.record_sample(store, input.route, bucket, sample, input.at.timestamp());
        let trend = estimator.history().trend(input.route, bucket);

        let hint = match direction {
            Direction::Outbound => self.outbound_hint.as_ref(),
            Direction::Return => self.return_hint.as_ref(),
        };

        tracing::debug!(
            route = %input.route.storage_key(),
            base = input.base.minutes,
            multiplier,
            duration,
            "evaluated congestion"
        );

        CongestionReading {
            route: input.route.clone(),
            direction,
            timestamp: input.at.timestamp(),
            base_minutes: input.base.minutes,
            duration_minutes: duration,
            distance_km: input.base.distance_km,
            multiplier,
            condition: Condition::from_multiplier(multiplier),
            confidence: Confidence::from_multiplier(multiplier),
            trend,
            alternative_route: hint.filter(|_| multiplier > ALTERNATIVE_ROUTE_MIN).cloned(),
        }
    }
}

/// `round(base * multiplier * jitter)` clamped to the documented range.
pub fn final_duration(base_minutes: u32, multiplier: f64, jitter: f64) -> u32 {
    let raw = (base_minutes as f64 * multiplier * jitter).round();
    if raw.is_nan() {
        return MIN_DURATION_MINUTES;
    }
    (raw as i64).clamp(MIN_DURATION_MINUTES as i64, MAX_DURATION_MINUTES as i64) as u32
}

/// Undo `multiplier` on a final duration, clamped like a final duration.
pub fn base_sample(duration_minutes: u32, multiplier: f64) -> u32 {
    if multiplier <= 0.0 || !multiplier.is_finite() {
        return duration_minutes;
    }
    final_duration(duration_minutes, 1.0 / multiplier, 1.0)
}
