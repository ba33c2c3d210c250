use clap::Args;
use commute_core::error::Result;
use commute_core::{ClockTime, CommuteEngine, Config, Direction};
use serde::Serialize;

use super::DirectionArg;

#[derive(Args)]
pub struct HistoryArgs {
    /// Only show one leg
    #[arg(long, value_enum)]
    pub direction: Option<DirectionArg>,
}

#[derive(Serialize)]
struct BucketRow {
    direction: Direction,
    /// Start of the 15-minute slot
    slot: String,
    samples: usize,
    mean_minutes: Option<u32>,
    trend: commute_core::Trend,
}

pub fn run(args: HistoryArgs) -> Result<()> {
    let config = Config::load()?;
    let engine = CommuteEngine::open(&config)?;
    let route = config.route();

    let directions = match args.direction {
        Some(d) => vec![d.into()],
        None => vec![Direction::Outbound, Direction::Return],
    };

    let mut rows = Vec::new();
    for direction in directions {
        let key = route.key(direction);
        let storage_key = key.storage_key();
        for (_, bucket, samples) in engine
            .history()
            .summary()
            .into_iter()
            .filter(|(route, _, _)| *route == storage_key)
        {
            rows.push(BucketRow {
                direction,
                slot: ClockTime::wrapping(bucket as i32 * 15).to_string(),
                samples,
                mean_minutes: engine.history().mean_minutes(&key, bucket),
                trend: engine.history().trend(&key, bucket),
            });
        }
    }

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
