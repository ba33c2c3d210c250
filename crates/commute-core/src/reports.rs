//! Daily commute statistics and weekly reports.
//!
//! Daily stats accumulate one round trip per estimate. A weekly report
//! covers Sunday to Saturday of the week containing the given day and is
//! stored under its ISO week key (`2024-W10`). Everything lives in one JSON
//! document under [`REPORTS_KEY`].

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::congestion::{CongestionReading, WeatherSeverity};
use crate::error::HistoryError;
use crate::storage::{update_json, KvStore};

pub const REPORTS_KEY: &str = "traffic-report-data";

const OUTBOUND_DELAY_MIN: u32 = 45;
const RETURN_DELAY_MIN: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherImpact {
    #[default]
    None,
    Rain,
    Fog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_commutes: u32,
    /// Sum of round-trip minutes over all commutes
    pub total_travel_time: u32,
    /// Running average of outbound minutes
    pub average_outbound: u32,
    /// Running average of return minutes
    pub average_return: u32,
    /// Commutes with outbound over 45 or return over 50 minutes
    pub peak_delays: u32,
    pub weather_impact: WeatherImpact,
}

impl DailyStats {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_commutes: 0,
            total_travel_time: 0,
            average_outbound: 0,
            average_return: 0,
            peak_delays: 0,
            weather_impact: WeatherImpact::None,
        }
    }

    pub fn round_trip(&self) -> u32 {
        self.average_outbound + self.average_return
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Positive,
    Warning,
    Info,
    Suggestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week_key: String,
    /// Sunday
    pub week_start: NaiveDate,
    /// Saturday
    pub week_end: NaiveDate,
    pub total_days: u32,
    pub total_commutes: u32,
    pub total_travel_time: u32,
    pub average_outbound: u32,
    pub average_return: u32,
    pub best_day: Option<DayTotal>,
    pub worst_day: Option<DayTotal>,
    pub weather_impact_days: u32,
    pub peak_delay_days: u32,
    pub daily_breakdown: Vec<DailyStats>,
    pub insights: Vec<Insight>,
}

impl WeeklyReport {
    pub fn suggestions(&self) -> impl Iterator<Item = &Insight> {
        self.insights
            .iter()
            .filter(|i| i.kind == InsightKind::Suggestion)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReportData {
    #[serde(default)]
    daily_stats: BTreeMap<NaiveDate, DailyStats>,
    #[serde(default)]
    weekly_reports: BTreeMap<String, WeeklyReport>,
}

#[derive(Debug, Clone, Default)]
pub struct CommuteReports {
    data: ReportData,
}

impl CommuteReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &dyn KvStore) -> Self {
        match Self::try_load(store) {
            Ok(reports) => reports,
            Err(e) => {
                tracing::warn!(error = %e, "report data unavailable, starting empty");
                Self::new()
            }
        }
    }

    pub fn try_load(store: &dyn KvStore) -> Result<Self, HistoryError> {
        let Some(raw) = store.get(REPORTS_KEY)? else {
            return Ok(Self::new());
        };
        Ok(Self {
            data: serde_json::from_str(&raw)?,
        })
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<(), HistoryError> {
        store.set(REPORTS_KEY, &serde_json::to_string(&self.data)?)
    }

    /// Pick up days and reports written by other processes. Keeps the
    /// current copy when the store cannot be read.
    pub fn refresh(&mut self, store: &dyn KvStore) {
        match Self::try_load(store) {
            Ok(latest) => *self = latest,
            Err(e) => tracing::debug!(error = %e, "keeping in-memory report data"),
        }
    }

    pub fn daily(&self, date: NaiveDate) -> Option<&DailyStats> {
        self.data.daily_stats.get(&date)
    }

    /// Fold one round trip into the stats for `date`.
    pub fn update_daily(
        &mut self,
        store: &dyn KvStore,
        date: NaiveDate,
        outbound: &CongestionReading,
        return_leg: &CongestionReading,
        weather: WeatherSeverity,
    ) -> DailyStats {
        let out = outbound.duration_minutes;
        let back = return_leg.duration_minutes;
        match update_json(store, REPORTS_KEY, &self.data, |data| {
            fold_round_trip(data, date, out, back, weather)
        }) {
            Ok(data) => self.data = data,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist report data");
                fold_round_trip(&mut self.data, date, out, back, weather);
            }
        }
        self.data
            .daily_stats
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DailyStats::new(date))
    }

    /// Build, store and return the report for the week containing `today`.
    pub fn weekly_report(&mut self, store: &dyn KvStore, today: NaiveDate) -> WeeklyReport {
        self.refresh(store);
        let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
        let week_end = week_start + Duration::days(6);
        let iso = week_start.iso_week();
        let week_key = format!("{}-W{:02}", iso.year(), iso.week());

        let mut report = WeeklyReport {
            week_key: week_key.clone(),
            week_start,
            week_end,
            total_days: 0,
            total_commutes: 0,
            total_travel_time: 0,
            average_outbound: 0,
            average_return: 0,
            best_day: None,
            worst_day: None,
            weather_impact_days: 0,
            peak_delay_days: 0,
            daily_breakdown: Vec::new(),
            insights: Vec::new(),
        };

        let mut outbound_sum = 0;
        let mut return_sum = 0;
        for stats in self.data.daily_stats.range(week_start..=week_end).map(|(_, s)| s) {
            report.total_days += 1;
            report.total_commutes += stats.total_commutes;
            report.total_travel_time += stats.total_travel_time;
            outbound_sum += stats.average_outbound;
            return_sum += stats.average_return;
            if stats.weather_impact != WeatherImpact::None {
                report.weather_impact_days += 1;
            }
            if stats.peak_delays > 0 {
                report.peak_delay_days += 1;
            }

            let day = DayTotal {
                date: stats.date,
                total: stats.round_trip(),
            };
            if report.best_day.map_or(true, |best| day.total < best.total) {
                report.best_day = Some(day);
            }
            if report.worst_day.map_or(true, |worst| day.total > worst.total) {
                report.worst_day = Some(day);
            }
            report.daily_breakdown.push(stats.clone());
        }

        if report.total_days > 0 {
            let days = report.total_days as f64;
            report.average_outbound = (outbound_sum as f64 / days).round() as u32;
            report.average_return = (return_sum as f64 / days).round() as u32;
        }
        report.insights = insights(&report);

        match update_json(store, REPORTS_KEY, &self.data, |data| {
            data.weekly_reports.insert(week_key.clone(), report.clone());
        }) {
            Ok(data) => self.data = data,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist report data");
                self.data.weekly_reports.insert(week_key, report.clone());
            }
        }
        tracing::debug!(week = %report.week_key, days = report.total_days, "generated weekly report");
        report
    }

    pub fn latest_weekly_report(&self) -> Option<&WeeklyReport> {
        self.data.weekly_reports.values().max_by_key(|r| r.week_start)
    }
}

fn fold_round_trip(data: &mut ReportData, date: NaiveDate, out: u32, back: u32, weather: WeatherSeverity) {
    let stats = data
        .daily_stats
        .entry(date)
        .or_insert_with(|| DailyStats::new(date));

    stats.total_commutes += 1;
    stats.total_travel_time += out + back;
    stats.average_outbound = running_average(stats.average_outbound, out, stats.total_commutes);
    stats.average_return = running_average(stats.average_return, back, stats.total_commutes);
    if out > OUTBOUND_DELAY_MIN || back > RETURN_DELAY_MIN {
        stats.peak_delays += 1;
    }
    // Clear weather keeps whatever impact was already seen today.
    if weather.is_precipitation() {
        stats.weather_impact = WeatherImpact::Rain;
    } else if weather == WeatherSeverity::Fog {
        stats.weather_impact = WeatherImpact::Fog;
    }
}

fn running_average(average: u32, value: u32, count: u32) -> u32 {
    let count = count.max(1) as f64;
    ((average as f64 * (count - 1.0) + value as f64) / count).round() as u32
}

fn insights(report: &WeeklyReport) -> Vec<Insight> {
    let mut out = Vec::new();
    let total_average = report.average_outbound + report.average_return;

    if total_average < 70 {
        out.push(Insight::new(
            InsightKind::Positive,
            "Efficient week",
            format!("Average round trip was {total_average} minutes, below average"),
        ));
    } else if total_average > 90 {
        out.push(Insight::new(
            InsightKind::Warning,
            "Delayed week",
            format!("Average round trip was {total_average} minutes; consider other departure times"),
        ));
    }

    if report.weather_impact_days > 2 {
        out.push(Insight::new(
            InsightKind::Info,
            "Weather impact",
            format!("{} days with weather affecting traffic", report.weather_impact_days),
        ));
    }

    if let (Some(best), Some(worst)) = (report.best_day, report.worst_day) {
        out.push(Insight::new(
            InsightKind::Info,
            "Weekly pattern",
            format!(
                "Best day: {} ({} min). Worst day: {} ({} min)",
                best.date.format("%A"),
                best.total,
                worst.date.format("%A"),
                worst.total
            ),
        ));
    }

    if report.peak_delay_days > 3 {
        out.push(Insight::new(
            InsightKind::Warning,
            "Frequent delays",
            format!(
                "{} days with significant delays. Consider leaving 10-15 min earlier",
                report.peak_delay_days
            ),
        ));
    }

    if report.average_outbound > 45 {
        out.push(Insight::new(
            InsightKind::Suggestion,
            "Route optimisation",
            "Try alternative morning routes to cut travel time",
        ));
    }
    if report.peak_delay_days > 2 {
        out.push(Insight::new(
            InsightKind::Suggestion,
            "Schedule adjustment",
            "Leaving 15 minutes earlier can avoid the traffic peak",
        ));
    }
    if report.weather_impact_days > 1 {
        out.push(Insight::new(
            InsightKind::Suggestion,
            "Weather preparation",
            "On rainy days, add 20% to the estimated travel time",
        ));
    }
    out
}
