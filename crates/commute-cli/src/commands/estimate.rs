use chrono::Weekday;
use clap::Args;
use commute_core::error::Result;
use commute_core::{ClockTime, CommuteEngine, Config, Direction, EstimateRequest};
use serde_json::json;

use super::{parse_clock_time, parse_weekday, resolve_reading, weather_for, WeatherArg};

#[derive(Args)]
pub struct EstimateArgs {
    /// Time of day to estimate for (HH:MM), defaults to now
    #[arg(long, value_parser = parse_clock_time)]
    pub at: Option<ClockTime>,
    /// Day of week (mon..sun) in the current week
    #[arg(long, value_parser = parse_weekday)]
    pub day: Option<Weekday>,
    /// Current weather
    #[arg(long, value_enum, default_value = "clear")]
    pub weather: WeatherArg,
    /// Current weather as a WMO weather code, overrides --weather
    #[arg(long, conflicts_with = "weather")]
    pub weather_code: Option<u8>,
    /// Print the full report instead of the summary
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: EstimateArgs) -> Result<()> {
    let config = Config::load()?;
    let schedule = config.work_schedule()?;
    let route = config.route();
    let mut engine = CommuteEngine::open(&config)?;

    let at = resolve_reading(engine.now(), args.at, args.day);
    let report = engine.estimate(
        EstimateRequest::new(route.clone(), schedule)
            .at(at)
            .weather(weather_for(args.weather, args.weather_code)),
    );
    tracing::info!(
        outbound = report.outbound.duration_minutes,
        return_leg = report.return_leg.duration_minutes,
        "estimated commute"
    );

    if args.all {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = json!({
        "at": format!("{} {:02}:{:02}", at.date, at.hour, at.minute),
        "outbound": {
            "route": route.name(Direction::Outbound),
            "minutes": report.outbound.duration_minutes,
            "distance_km": report.outbound.distance_km,
            "condition": report.outbound.condition,
            "trend": report.outbound.trend,
            "alternative_route": report.outbound.alternative_route.as_ref().map(|h| h.to_string()),
        },
        "return": {
            "route": route.name(Direction::Return),
            "minutes": report.return_leg.duration_minutes,
            "distance_km": report.return_leg.distance_km,
            "condition": report.return_leg.condition,
            "trend": report.return_leg.trend,
            "alternative_route": report.return_leg.alternative_route.as_ref().map(|h| h.to_string()),
        },
        "departure": report.departure,
        "arrival": report.arrival,
        "recommendations": report.banners(),
        "productivity_score": report.productivity.score,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
