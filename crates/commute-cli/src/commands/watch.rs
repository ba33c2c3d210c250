use chrono::{Duration, Utc};
use clap::Args;
use commute_core::error::Result;
use commute_core::{CommuteEngine, Config, RepeatingTask};
use serde_json::json;

use super::{weather_for, WeatherArg};

#[derive(Args)]
pub struct WatchArgs {
    /// Minutes between estimates, defaults to refresh.interval_minutes
    #[arg(long)]
    pub interval_min: Option<u32>,
    /// Stop after this many estimates
    #[arg(long)]
    pub ticks: Option<u64>,
    /// Current weather
    #[arg(long, value_enum, default_value = "clear")]
    pub weather: WeatherArg,
    /// Current weather as a WMO weather code, overrides --weather
    #[arg(long, conflicts_with = "weather")]
    pub weather_code: Option<u8>,
}

pub fn run(args: WatchArgs) -> Result<()> {
    let config = Config::load()?;
    let schedule = config.work_schedule()?;
    let route = config.route();
    let mut engine = CommuteEngine::open(&config)?;

    let weather = weather_for(args.weather, args.weather_code);
    let interval = args.interval_min.unwrap_or(config.refresh.interval_minutes).max(1);
    let mut task = RepeatingTask::new(Duration::minutes(interval as i64), Utc::now());
    tracing::info!(interval_min = interval, "watching commute");

    loop {
        if task.poll(Utc::now()) {
            let report = engine.estimate_now(&route, weather, &schedule);
            let line = json!({
                "at": format!("{:02}:{:02}", report.at.hour, report.at.minute),
                "outbound": report.outbound.duration_minutes,
                "outbound_condition": report.outbound.condition,
                "return": report.return_leg.duration_minutes,
                "return_condition": report.return_leg.condition,
                "departure": report.departure,
                "banners": report.banners(),
            });
            println!("{line}");

            if args.ticks.is_some_and(|n| task.runs() >= n) {
                task.cancel();
            }
        }
        if task.is_cancelled() {
            break;
        }
        let wait = task.remaining(Utc::now()).min(Duration::seconds(1));
        std::thread::sleep(wait.to_std().unwrap_or(std::time::Duration::from_millis(200)));
    }
    Ok(())
}
