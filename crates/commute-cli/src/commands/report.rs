use clap::Subcommand;
use commute_core::error::Result;
use commute_core::{CommuteEngine, Config};
use serde_json::json;

#[derive(Subcommand)]
pub enum ReportAction {
    /// Report for the current week (Sunday to Saturday)
    Weekly,
    /// Today's commute stats and productivity impact
    Today,
    /// Productivity impact over the last 7 days
    Impact,
}

pub fn run(action: ReportAction) -> Result<()> {
    let config = Config::load()?;
    let mut engine = CommuteEngine::open(&config)?;
    let today = engine.now().date;

    match action {
        ReportAction::Weekly => {
            let report = engine.weekly_report(today);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportAction::Today => {
            let out = json!({
                "date": today,
                "stats": engine.daily_stats(today),
                "impact": engine.impact_log().daily_summary(today),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ReportAction::Impact => {
            let log = engine.impact_log();
            let out = json!({
                "weekly_impact": log.weekly_impact(today),
                "recommendations": log.long_term_recommendations(today),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
