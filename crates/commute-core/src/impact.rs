//! Rolling log of productivity impact.
//!
//! Up to 24 entries per day, 30 days of retention. Persisted as one JSON
//! document under [`IMPACT_KEY`], merged with the stored copy on every
//! append.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::recommend::ProductivityImpact;
use crate::storage::{update_json, KvStore};

pub const IMPACT_KEY: &str = "traffic-impact-history";
pub const MAX_ENTRIES_PER_DAY: usize = 24;
pub const RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEntry {
    pub timestamp: DateTime<Utc>,
    pub time_lost: u32,
    pub time_gained: u32,
    pub efficiency_pct: u32,
    pub stress: u32,
    pub score: i32,
}

impl ImpactEntry {
    pub fn from_impact(timestamp: DateTime<Utc>, impact: &ProductivityImpact) -> Self {
        Self {
            timestamp,
            time_lost: impact.time_lost,
            time_gained: impact.time_gained,
            efficiency_pct: impact.efficiency_pct,
            stress: impact.stress,
            score: impact.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyImpactSummary {
    pub date: NaiveDate,
    pub total_time_lost: u32,
    pub average_efficiency: u32,
    pub average_stress: u32,
    /// Sum of entry scores for the day
    pub total_impact: i32,
    /// Over an hour lost, or a summed impact below -10
    pub needs_attention: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayImpact {
    pub date: NaiveDate,
    pub average_impact: f64,
}

type Days = BTreeMap<NaiveDate, Vec<ImpactEntry>>;

#[derive(Debug, Clone, Default)]
pub struct ImpactLog {
    days: Days,
}

impl ImpactLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &dyn KvStore) -> Self {
        match Self::try_load(store) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(error = %e, "impact log unavailable, starting empty");
                Self::new()
            }
        }
    }

    pub fn try_load(store: &dyn KvStore) -> Result<Self, HistoryError> {
        let Some(raw) = store.get(IMPACT_KEY)? else {
            return Ok(Self::new());
        };
        Ok(Self {
            days: serde_json::from_str(&raw)?,
        })
    }

    /// Append an entry for `date`, trim the day, purge expired days and
    /// persist. Store failures are logged.
    pub fn record(&mut self, store: &dyn KvStore, date: NaiveDate, entry: ImpactEntry) {
        match update_json(store, IMPACT_KEY, &self.days, |days| {
            append_entry(days, date, entry.clone())
        }) {
            Ok(days) => self.days = days,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist impact log");
                append_entry(&mut self.days, date, entry);
            }
        }
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<(), HistoryError> {
        store.set(IMPACT_KEY, &serde_json::to_string(&self.days)?)
    }

    pub fn entries(&self, date: NaiveDate) -> &[ImpactEntry] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn daily_summary(&self, date: NaiveDate) -> Option<DailyImpactSummary> {
        let entries = self.days.get(&date).filter(|e| !e.is_empty())?;
        let n = entries.len() as f64;
        let total_time_lost: u32 = entries.iter().map(|e| e.time_lost).sum();
        let total_impact: i32 = entries.iter().map(|e| e.score).sum();
        let average_efficiency =
            (entries.iter().map(|e| e.efficiency_pct as f64).sum::<f64>() / n).round() as u32;
        let average_stress = (entries.iter().map(|e| e.stress as f64).sum::<f64>() / n).round() as u32;

        Some(DailyImpactSummary {
            date,
            total_time_lost,
            average_efficiency,
            average_stress,
            total_impact,
            needs_attention: total_time_lost > 60 || total_impact < -10,
        })
    }

    /// Average score per day for the last 7 days up to `today`.
    pub fn weekly_impact(&self, today: NaiveDate) -> Vec<DayImpact> {
        let week_ago = today - Duration::days(7);
        self.days
            .range(week_ago..)
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(date, entries)| DayImpact {
                date: *date,
                average_impact: entries.iter().map(|e| e.score as f64).sum::<f64>()
                    / entries.len() as f64,
            })
            .collect()
    }

    pub fn long_term_recommendations(&self, today: NaiveDate) -> Vec<String> {
        let weekly = self.weekly_impact(today);
        if weekly.is_empty() {
            return Vec::new();
        }
        let average = weekly.iter().map(|d| d.average_impact).sum::<f64>() / weekly.len() as f64;

        let mut out = Vec::new();
        if average < -5.0 {
            out.push("Consider remote work or flexible hours".to_string());
            out.push("Try alternative routes on a permanent basis".to_string());
        }
        if average < -10.0 {
            out.push("Evaluate moving closer to work or changing jobs".to_string());
            out.push("Consider public transport as an alternative".to_string());
        }
        out
    }
}

fn append_entry(days: &mut Days, date: NaiveDate, entry: ImpactEntry) {
    let entries = days.entry(date).or_default();
    entries.push(entry);
    if entries.len() > MAX_ENTRIES_PER_DAY {
        let excess = entries.len() - MAX_ENTRIES_PER_DAY;
        entries.drain(..excess);
    }

    let cutoff = date - Duration::days(RETENTION_DAYS);
    days.retain(|day, _| *day >= cutoff);
}
