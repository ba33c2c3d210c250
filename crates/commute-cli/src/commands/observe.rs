use clap::Args;
use commute_core::clock::time_bucket;
use commute_core::error::Result;
use commute_core::{ClockTime, CommuteEngine, Config, Direction};

use super::{parse_clock_time, DirectionArg};

#[derive(Args)]
pub struct ObserveArgs {
    /// Leg of the commute that was timed
    #[arg(long, value_enum)]
    pub direction: DirectionArg,
    /// Departure time of the trip (HH:MM)
    #[arg(long, value_parser = parse_clock_time)]
    pub at: ClockTime,
    /// Observed door-to-door minutes
    #[arg(long)]
    pub minutes: u32,
}

pub fn run(args: ObserveArgs) -> Result<()> {
    let config = Config::load()?;
    let mut engine = CommuteEngine::open(&config)?;

    let direction: Direction = args.direction.into();
    let key = config.route().key(direction);
    let bucket = time_bucket(args.at.hour(), args.at.minute());
    engine.record_observation(&key, bucket, args.minutes)?;

    let samples = engine.history().sample_count(&key, bucket);
    let mean = engine.history().mean_minutes(&key, bucket);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "route": key.storage_key(),
            "direction": direction,
            "bucket": bucket,
            "samples": samples,
            "mean_minutes": mean,
        }))?
    );
    Ok(())
}
