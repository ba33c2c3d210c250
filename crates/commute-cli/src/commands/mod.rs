pub mod config;
pub mod estimate;
pub mod history;
pub mod observe;
pub mod report;
pub mod watch;

use chrono::{Datelike, Duration, Weekday};
use clap::ValueEnum;
use commute_core::{ClockReading, ClockTime, Direction, WeatherSeverity};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WeatherArg {
    Clear,
    Fog,
    Rain,
    HeavyRain,
    Storm,
}

impl From<WeatherArg> for WeatherSeverity {
    fn from(arg: WeatherArg) -> Self {
        match arg {
            WeatherArg::Clear => WeatherSeverity::Clear,
            WeatherArg::Fog => WeatherSeverity::Fog,
            WeatherArg::Rain => WeatherSeverity::LightPrecipitation,
            WeatherArg::HeavyRain => WeatherSeverity::HeavyPrecipitation,
            WeatherArg::Storm => WeatherSeverity::Storm,
        }
    }
}

/// A WMO code wins over the named weather.
pub fn weather_for(arg: WeatherArg, wmo_code: Option<u8>) -> WeatherSeverity {
    match wmo_code {
        Some(code) => WeatherSeverity::from_wmo_code(code),
        None => arg.into(),
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Outbound,
    Return,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Outbound => Direction::Outbound,
            DirectionArg::Return => Direction::Return,
        }
    }
}

pub fn parse_clock_time(s: &str) -> Result<ClockTime, String> {
    s.parse::<ClockTime>().map_err(|e| e.to_string())
}

pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.parse::<Weekday>()
        .map_err(|_| format!("invalid day '{s}': expected mon, tue, ... sun"))
}

/// Move `now` to another time and/or weekday of the same Sunday-based week.
pub fn resolve_reading(now: ClockReading, at: Option<ClockTime>, day: Option<Weekday>) -> ClockReading {
    let date = match day {
        Some(day) => {
            let offset = day.num_days_from_sunday() as i64
                - now.date.weekday().num_days_from_sunday() as i64;
            now.date + Duration::days(offset)
        }
        None => now.date,
    };
    let (hour, minute) = at
        .map(|t| (t.hour(), t.minute()))
        .unwrap_or((now.hour, now.minute));
    ClockReading::new(date, hour, minute)
}
