//! Departure advice and productivity impact.
//!
//! Everything here is a pure function of the two leg readings, the work
//! schedule and the current time. Nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::clock::ClockReading;
use crate::congestion::{Condition, CongestionReading, WeatherSeverity};
use crate::schedule::{ClockTime, WorkSchedule};

/// Time of day after which return-trip advice is given.
pub const EVENING_FROM: u16 = 17 * 60;

/// Number of recommendations shown as banners.
pub const BANNER_LIMIT: usize = 2;

const LEAVE_SOON_WINDOW: i32 = 30;
const PLENTY_OF_TIME: i32 = 60;

const SCORE_MIN: i32 = -20;
const SCORE_MAX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Departure is due within half an hour
    LeaveSoon,
    /// Departure time has already passed
    Late,
    /// More than an hour until departure
    PlentyOfTime,
    /// Expected arrival home when leaving work now
    ArrivalIfLeavingNow,
    /// Return leg is congested; waiting out the peak helps
    WaitForPeak,
    /// Detour suggested for a slow outbound leg
    AlternativeRoute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind, priority: Priority, message: String) -> Self {
        Self {
            kind,
            priority,
            message,
        }
    }
}

/// Latest departure that still arrives `buffer` minutes before work starts.
pub fn compute_departure(schedule: &WorkSchedule, outbound: &CongestionReading) -> ClockTime {
    ClockTime::wrapping(departure_minutes(schedule, outbound))
}

/// Arrival home when leaving at `now`.
pub fn compute_arrival(now: &ClockReading, return_leg: &CongestionReading) -> ClockTime {
    ClockTime::wrapping(now.minutes_of_day() as i32 + return_leg.duration_minutes as i32)
}

fn departure_minutes(schedule: &WorkSchedule, outbound: &CongestionReading) -> i32 {
    schedule.start().minutes() as i32 - outbound.duration_minutes as i32 - schedule.buffer_minutes()
}

/// Build the advice list, high priority first.
///
/// Rules, in evaluation order:
/// - before work starts: leave soon (departure within 30 min), late
///   (departure passed) or plenty of time (over an hour to spare)
/// - from 17:00: arrival estimate, plus a wait hint when the return leg is
///   congested
/// - an alternative route when one is known and the outbound leg is not
///   flowing
pub fn generate_recommendations(
    now: &ClockReading,
    outbound: &CongestionReading,
    return_leg: &CongestionReading,
    schedule: &WorkSchedule,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let now_min = now.minutes_of_day() as i32;
    let start = schedule.start();

    if now_min < start.minutes() as i32 {
        let departure = departure_minutes(schedule, outbound);
        let until_departure = departure - now_min;
        if until_departure > 0 && until_departure <= LEAVE_SOON_WINDOW {
            out.push(Recommendation::new(
                RecommendationKind::LeaveSoon,
                Priority::High,
                format!(
                    "Leave in {until_departure} min ({}) to arrive by {start}",
                    ClockTime::wrapping(departure)
                ),
            ));
        } else if until_departure <= 0 {
            let late_by = until_departure.abs();
            let arrival = ClockTime::wrapping(start.minutes() as i32 + late_by);
            out.push(Recommendation::new(
                RecommendationKind::Late,
                Priority::High,
                format!("You should have left {late_by} min ago. Expected arrival: {arrival}"),
            ));
        } else if until_departure > PLENTY_OF_TIME {
            out.push(Recommendation::new(
                RecommendationKind::PlentyOfTime,
                Priority::Medium,
                format!("Leave at {} to arrive on time", ClockTime::wrapping(departure)),
            ));
        }
    }

    if now.minutes_of_day() >= EVENING_FROM {
        out.push(Recommendation::new(
            RecommendationKind::ArrivalIfLeavingNow,
            Priority::Medium,
            format!(
                "Leaving now, you will be home at {}",
                compute_arrival(now, return_leg)
            ),
        ));
        if return_leg.condition == Condition::Congested {
            out.push(Recommendation::new(
                RecommendationKind::WaitForPeak,
                Priority::High,
                "Heavy traffic: consider waiting 30-60 minutes to avoid the peak".to_string(),
            ));
        }
    }

    if let Some(hint) = &outbound.alternative_route {
        if outbound.condition != Condition::Flowing {
            out.push(Recommendation::new(
                RecommendationKind::AlternativeRoute,
                Priority::Medium,
                hint.to_string(),
            ));
        }
    }

    out.sort_by_key(|r| r.priority.rank());
    out
}

/// The recommendations shown as banners.
pub fn banners(recommendations: &[Recommendation]) -> &[Recommendation] {
    &recommendations[..recommendations.len().min(BANNER_LIMIT)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    LeaveEarlier,
    StressReduction,
    ProductiveCommute,
    FlexibleWork,
}

/// Productivity advice derived from lost time and stress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub priority: Priority,
    pub message: String,
}

/// How today's commute affects the working day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductivityImpact {
    /// Impact score, -20 (severe) to +10 (favourable)
    pub score: i32,
    /// Minutes over the baseline round trip
    pub time_lost: u32,
    /// Minutes under the baseline round trip
    pub time_gained: u32,
    /// Baseline as a percentage of the current round trip
    pub efficiency_pct: u32,
    /// Traffic stress, 0 to 100
    pub stress: u32,
    pub suggestions: Vec<Suggestion>,
}

pub fn productivity_impact(
    outbound: &CongestionReading,
    return_leg: &CongestionReading,
    baseline_total: u32,
    weather: WeatherSeverity,
    now: &ClockReading,
) -> ProductivityImpact {
    let current = (outbound.duration_minutes + return_leg.duration_minutes).max(1);
    let difference = current as i64 - baseline_total as i64;
    let time_lost = difference.max(0) as u32;
    let time_gained = (-difference).max(0) as u32;
    let efficiency_pct = (baseline_total as f64 / current as f64 * 100.0).round() as u32;
    let stress = traffic_stress(outbound, return_leg, weather);

    let mut score = 0;
    if time_lost > 45 {
        score -= 15;
    } else if time_lost > 30 {
        score -= 10;
    } else if time_lost > 15 {
        score -= 5;
    } else if time_gained > 10 {
        score += 5;
    }

    if stress > 80 {
        score -= 5;
    } else if stress < 30 {
        score += 3;
    }

    // Early start on a light day
    if now.minutes_of_day() < 8 * 60 && time_lost < 10 {
        score += 2;
    }

    ProductivityImpact {
        score: score.clamp(SCORE_MIN, SCORE_MAX),
        time_lost,
        time_gained,
        efficiency_pct,
        stress,
        suggestions: productivity_suggestions(time_lost, stress, now),
    }
}

pub fn productivity_impact_score(
    outbound: &CongestionReading,
    return_leg: &CongestionReading,
    baseline_total: u32,
    weather: WeatherSeverity,
    now: &ClockReading,
) -> i32 {
    productivity_impact(outbound, return_leg, baseline_total, weather, now).score
}

/// Stress from conditions, long legs and weather, capped at 100.
pub fn traffic_stress(
    outbound: &CongestionReading,
    return_leg: &CongestionReading,
    weather: WeatherSeverity,
) -> u32 {
    let condition_stress = |c: Condition| match c {
        Condition::Congested => 40,
        Condition::Slow => 20,
        Condition::Flowing => 0,
    };

    let mut stress = condition_stress(outbound.condition) + condition_stress(return_leg.condition);
    if outbound.duration_minutes > 50 {
        stress += 15;
    }
    if return_leg.duration_minutes > 55 {
        stress += 15;
    }
    stress += match weather {
        WeatherSeverity::LightPrecipitation => 10,
        WeatherSeverity::HeavyPrecipitation | WeatherSeverity::Storm => 20,
        WeatherSeverity::Clear | WeatherSeverity::Fog => 0,
    };
    stress.min(100)
}

fn productivity_suggestions(time_lost: u32, stress: u32, now: &ClockReading) -> Vec<Suggestion> {
    let mut out = Vec::new();
    if time_lost > 30 {
        out.push(Suggestion {
            kind: SuggestionKind::LeaveEarlier,
            priority: Priority::High,
            message: "Consider leaving 15 min earlier to make up for heavy traffic".to_string(),
        });
    }
    if stress > 70 {
        out.push(Suggestion {
            kind: SuggestionKind::StressReduction,
            priority: Priority::Medium,
            message: "Stressful traffic detected. Practise deep breathing on the way".to_string(),
        });
    }
    if now.minutes_of_day() > EVENING_FROM && time_lost > 20 {
        out.push(Suggestion {
            kind: SuggestionKind::ProductiveCommute,
            priority: Priority::Medium,
            message: "Use the extra time in traffic for podcasts or audiobooks".to_string(),
        });
    }
    if time_lost > 45 {
        out.push(Suggestion {
            kind: SuggestionKind::FlexibleWork,
            priority: Priority::High,
            message: "Consider remote work or flexible hours on heavy-traffic days".to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::{Confidence, RouteHint};
    use crate::history::Trend;
    use crate::location::{Direction, RouteKey};
    use chrono::Weekday;

    fn reading(direction: Direction, minutes: u32, condition: Condition) -> CongestionReading {
        CongestionReading {
            route: RouteKey::new("a", "b", direction),
            direction,
            timestamp: ClockReading::on_weekday(Weekday::Tue, 8, 0).timestamp(),
            base_minutes: direction.default_minutes(),
            duration_minutes: minutes,
            distance_km: 14.0,
            multiplier: 1.0,
            condition,
            confidence: Confidence::High,
            trend: Trend::Stable,
            alternative_route: None,
        }
    }

    fn at(h: u8, m: u8) -> ClockReading {
        ClockReading::on_weekday(Weekday::Tue, h, m)
    }

    #[test]
    fn departure_subtracts_duration_and_buffer() {
        let out = reading(Direction::Outbound, 50, Condition::Slow);
        let schedule = WorkSchedule::default();
        assert_eq!(compute_departure(&schedule, &out).to_string(), "08:05");
    }

    #[test]
    fn departure_and_arrival_wrap() {
        let schedule = WorkSchedule::parse("00:30", "08:00", 5).unwrap();
        let out = reading(Direction::Outbound, 60, Condition::Flowing);
        assert_eq!(compute_departure(&schedule, &out).to_string(), "23:25");

        let back = reading(Direction::Return, 90, Condition::Flowing);
        assert_eq!(compute_arrival(&at(23, 0), &back).to_string(), "00:30");
    }

    #[test]
    fn leave_soon_within_half_hour() {
        let out = reading(Direction::Outbound, 50, Condition::Slow);
        let back = reading(Direction::Return, 38, Condition::Flowing);
        let recs = generate_recommendations(&at(7, 50), &out, &back, &WorkSchedule::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::LeaveSoon);
        assert_eq!(recs[0].priority, Priority::High);
        assert!(recs[0].message.contains("08:05"));
    }

    #[test]
    fn late_reports_projected_arrival() {
        let out = reading(Direction::Outbound, 50, Condition::Slow);
        let back = reading(Direction::Return, 38, Condition::Flowing);
        let recs = generate_recommendations(&at(8, 20), &out, &back, &WorkSchedule::default());
        assert_eq!(recs[0].kind, RecommendationKind::Late);
        // 15 min late for a 09:00 start
        assert!(recs[0].message.contains("09:15"));
    }

    #[test]
    fn no_morning_advice_between_thirty_and_sixty_minutes() {
        let out = reading(Direction::Outbound, 35, Condition::Flowing);
        let back = reading(Direction::Return, 38, Condition::Flowing);
        // Departure 08:20, 45 min away
        let recs = generate_recommendations(&at(7, 35), &out, &back, &WorkSchedule::default());
        assert!(recs.is_empty());

        let recs = generate_recommendations(&at(6, 0), &out, &back, &WorkSchedule::default());
        assert_eq!(recs[0].kind, RecommendationKind::PlentyOfTime);
    }

    #[test]
    fn evening_advice_sorted_high_first() {
        let mut out = reading(Direction::Outbound, 35, Condition::Slow);
        out.alternative_route = Some(RouteHint {
            label: "Via Marginal".into(),
            extra_minutes: 8,
        });
        let back = reading(Direction::Return, 80, Condition::Congested);
        let recs = generate_recommendations(&at(18, 0), &out, &back, &WorkSchedule::default());
        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::WaitForPeak,
                RecommendationKind::ArrivalIfLeavingNow,
                RecommendationKind::AlternativeRoute,
            ]
        );
        assert!(recs[1].message.contains("19:20"));
        assert_eq!(banners(&recs).len(), 2);
    }

    #[test]
    fn alternative_route_skipped_when_flowing() {
        let mut out = reading(Direction::Outbound, 35, Condition::Flowing);
        out.alternative_route = Some(RouteHint {
            label: "Via Marginal".into(),
            extra_minutes: 8,
        });
        let back = reading(Direction::Return, 38, Condition::Flowing);
        let recs = generate_recommendations(&at(12, 0), &out, &back, &WorkSchedule::default());
        assert!(recs.is_empty());
    }

    #[test]
    fn stress_components() {
        let out = reading(Direction::Outbound, 81, Condition::Congested);
        let back = reading(Direction::Return, 60, Condition::Slow);
        // 40 + 20 + 15 + 15 + 20
        assert_eq!(traffic_stress(&out, &back, WeatherSeverity::Storm), 100);
        assert_eq!(traffic_stress(&out, &back, WeatherSeverity::Clear), 90);
        let calm = reading(Direction::Return, 38, Condition::Flowing);
        let easy = reading(Direction::Outbound, 35, Condition::Flowing);
        assert_eq!(traffic_stress(&easy, &calm, WeatherSeverity::LightPrecipitation), 10);
    }

    #[test]
    fn heavy_day_impact() {
        let out = reading(Direction::Outbound, 81, Condition::Congested);
        let back = reading(Direction::Return, 60, Condition::Slow);
        let impact = productivity_impact(&out, &back, 73, WeatherSeverity::Clear, &at(7, 0));
        assert_eq!(impact.time_lost, 68);
        assert_eq!(impact.efficiency_pct, 52);
        assert_eq!(impact.score, -20);
        let kinds: Vec<_> = impact.suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::LeaveEarlier,
                SuggestionKind::StressReduction,
                SuggestionKind::FlexibleWork,
            ]
        );
    }

    #[test]
    fn light_early_day_impact() {
        let out = reading(Direction::Outbound, 25, Condition::Flowing);
        let back = reading(Direction::Return, 30, Condition::Flowing);
        let impact = productivity_impact(&out, &back, 73, WeatherSeverity::Clear, &at(6, 30));
        assert_eq!(impact.time_gained, 18);
        // +5 gained, +3 low stress, +2 early; capped at +10
        assert_eq!(impact.score, 10);
        assert!(impact.suggestions.is_empty());
        assert_eq!(
            productivity_impact_score(&out, &back, 73, WeatherSeverity::Clear, &at(6, 30)),
            10
        );
    }
}
