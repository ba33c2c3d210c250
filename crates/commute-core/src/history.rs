//! Time-bucketed history of observed commute durations.
//!
//! Samples are grouped by route and 15-minute bucket. Each bucket keeps the
//! 10 most recent samples; older ones are evicted first-in first-out and
//! nothing expires by age.
//!
//! The whole map is persisted as one JSON document under
//! [`HISTORY_KEY`]. Appends go through [`KvStore::update`]: the stored
//! document is re-read, the sample is added to it and the result written
//! back in one step, so samples appended by another process sharing the
//! store survive. Store failures never reach the caller: a failed load
//! starts from empty history, a failed append keeps the in-memory copy.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::location::RouteKey;
use crate::storage::{update_json, KvStore};

pub const HISTORY_KEY: &str = "traffic-historical-data";

/// Samples retained per route and bucket.
pub const MAX_SAMPLES_PER_BUCKET: usize = 10;

/// Samples needed before a trend is reported.
pub const TREND_MIN_SAMPLES: usize = 6;

/// Difference in minutes between window means that counts as a change.
const TREND_THRESHOLD_MIN: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub route: RouteKey,
    pub bucket: u8,
    pub duration_minutes: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Direction a series of durations is moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Worsening,
}

impl Trend {
    /// Compare two values with the ±2 minute dead band.
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous + TREND_THRESHOLD_MIN {
            Trend::Worsening
        } else if current < previous - TREND_THRESHOLD_MIN {
            Trend::Improving
        } else {
            Trend::Stable
        }
    }
}

type Buckets = BTreeMap<u8, VecDeque<HistoricalSample>>;
type Routes = BTreeMap<String, Buckets>;

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    routes: Routes,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted history, starting empty if the store is unavailable
    /// or holds unreadable data.
    pub fn load(store: &dyn KvStore) -> Self {
        match Self::try_load(store) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "history unavailable, starting from empty history");
                Self::new()
            }
        }
    }

    pub fn try_load(store: &dyn KvStore) -> Result<Self, HistoryError> {
        let Some(raw) = store.get(HISTORY_KEY)? else {
            return Ok(Self::new());
        };
        let routes: Routes = serde_json::from_str(&raw)?;
        Ok(Self { routes })
    }

    /// Pick up samples other writers appended since this copy was loaded.
    /// Keeps the current copy when the store cannot be read.
    pub fn refresh(&mut self, store: &dyn KvStore) {
        match Self::try_load(store) {
            Ok(latest) => *self = latest,
            Err(e) => tracing::debug!(error = %e, "keeping in-memory history"),
        }
    }

    /// Append a sample to the stored history, evicting the oldest beyond
    /// the cap, and adopt the merged result.
    pub fn record(&mut self, store: &dyn KvStore, sample: HistoricalSample) {
        match update_json(store, HISTORY_KEY, &self.routes, |routes| {
            push_sample(routes, sample.clone())
        }) {
            Ok(routes) => self.routes = routes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist traffic history");
                self.push(sample);
            }
        }
    }

    /// Append without persisting.
    pub fn push(&mut self, sample: HistoricalSample) {
        push_sample(&mut self.routes, sample);
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(&self.routes)?;
        store.set(HISTORY_KEY, &raw)
    }

    /// Samples for a route and bucket, oldest first.
    pub fn samples(&self, route: &RouteKey, bucket: u8) -> impl Iterator<Item = &HistoricalSample> {
        self.routes
            .get(&route.storage_key())
            .and_then(|buckets| buckets.get(&bucket))
            .into_iter()
            .flat_map(|samples| samples.iter())
    }

    pub fn sample_count(&self, route: &RouteKey, bucket: u8) -> usize {
        self.samples(route, bucket).count()
    }

    /// Rounded mean of the retained samples, `None` when the bucket is empty.
    pub fn mean_minutes(&self, route: &RouteKey, bucket: u8) -> Option<u32> {
        let durations: Vec<u32> = self
            .samples(route, bucket)
            .map(|s| s.duration_minutes)
            .collect();
        if durations.is_empty() {
            return None;
        }
        let sum: u64 = durations.iter().map(|&d| d as u64).sum();
        Some((sum as f64 / durations.len() as f64).round() as u32)
    }

    /// Mean of the last three samples against the three before them.
    pub fn trend(&self, route: &RouteKey, bucket: u8) -> Trend {
        let durations: Vec<f64> = self
            .samples(route, bucket)
            .map(|s| s.duration_minutes as f64)
            .collect();
        if durations.len() < TREND_MIN_SAMPLES {
            return Trend::Stable;
        }
        let n = durations.len();
        let recent = mean(&durations[n - 3..]);
        let older = mean(&durations[n - 6..n - 3]);
        Trend::between(older, recent)
    }

    /// Every route storage key with its bucket sample counts.
    pub fn summary(&self) -> Vec<(String, u8, usize)> {
        self.routes
            .iter()
            .flat_map(|(route, buckets)| {
                buckets
                    .iter()
                    .map(move |(bucket, samples)| (route.clone(), *bucket, samples.len()))
            })
            .collect()
    }
}

fn push_sample(routes: &mut Routes, sample: HistoricalSample) {
    let samples = routes
        .entry(sample.route.storage_key())
        .or_default()
        .entry(sample.bucket)
        .or_default();
    samples.push_back(sample);
    while samples.len() > MAX_SAMPLES_PER_BUCKET {
        samples.pop_front();
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Direction;
    use crate::storage::MemoryStore;

    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, HistoryError> {
            Err(HistoryError::Unavailable("disk gone".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("disk gone".into()))
        }
    }

    fn route() -> RouteKey {
        RouteKey::new("home", "work", Direction::Outbound)
    }

    fn sample(bucket: u8, minutes: u32) -> HistoricalSample {
        HistoricalSample {
            route: route(),
            bucket,
            duration_minutes: minutes,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn mean_over_capped_window() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::new();
        for m in [30, 32, 34, 30, 33, 31, 35, 29, 32, 34] {
            history.record(&store, sample(32, m));
        }
        assert_eq!(history.mean_minutes(&route(), 32), Some(32));

        // 11th sample evicts the oldest (30)
        history.record(&store, sample(32, 40));
        assert_eq!(history.sample_count(&route(), 32), 10);
        let first = history.samples(&route(), 32).next().unwrap();
        assert_eq!(first.duration_minutes, 32);
        // (32+34+30+33+31+35+29+32+34+40) / 10 = 33.0
        assert_eq!(history.mean_minutes(&route(), 32), Some(33));
    }

    #[test]
    fn buckets_and_directions_are_independent() {
        let mut history = HistoryStore::new();
        history.push(sample(32, 50));
        assert!(history.mean_minutes(&route(), 33).is_none());
        let reverse = RouteKey::new("work", "home", Direction::Return);
        assert!(history.mean_minutes(&reverse, 32).is_none());
    }

    #[test]
    fn trend_needs_six_samples() {
        let mut history = HistoryStore::new();
        for m in [30, 30, 30, 40, 40] {
            history.push(sample(10, m));
        }
        assert_eq!(history.trend(&route(), 10), Trend::Stable);
        history.push(sample(10, 40));
        assert_eq!(history.trend(&route(), 10), Trend::Worsening);
    }

    #[test]
    fn trend_detects_improvement_and_dead_band() {
        let mut history = HistoryStore::new();
        for m in [50, 50, 50, 40, 40, 40] {
            history.push(sample(5, m));
        }
        assert_eq!(history.trend(&route(), 5), Trend::Improving);

        let mut flat = HistoryStore::new();
        for m in [40, 40, 40, 42, 42, 42] {
            flat.push(sample(5, m));
        }
        assert_eq!(flat.trend(&route(), 5), Trend::Stable);
    }

    #[test]
    fn history_survives_reload() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::new();
        history.record(&store, sample(32, 41));
        let reloaded = HistoryStore::load(&store);
        assert_eq!(reloaded.mean_minutes(&route(), 32), Some(41));
    }

    #[test]
    fn stale_copy_does_not_drop_samples_from_another_writer() {
        let store = MemoryStore::new();
        let mut watcher = HistoryStore::load(&store);
        let mut observer = HistoryStore::load(&store);

        observer.record(&store, sample(32, 60));
        watcher.record(&store, sample(32, 35));

        let durations: Vec<u32> = HistoryStore::load(&store)
            .samples(&route(), 32)
            .map(|s| s.duration_minutes)
            .collect();
        assert_eq!(durations, vec![60, 35]);
        assert_eq!(watcher.sample_count(&route(), 32), 2);
    }

    #[test]
    fn refresh_picks_up_other_writers() {
        let store = MemoryStore::new();
        let mut reader = HistoryStore::load(&store);
        HistoryStore::new().record(&store, sample(8, 44));
        assert!(reader.mean_minutes(&route(), 8).is_none());
        reader.refresh(&store);
        assert_eq!(reader.mean_minutes(&route(), 8), Some(44));
    }

    #[test]
    fn store_failures_are_absorbed() {
        let history = HistoryStore::load(&BrokenStore);
        assert!(history.summary().is_empty());

        let mut history = history;
        history.record(&BrokenStore, sample(1, 20));
        assert_eq!(history.mean_minutes(&route(), 1), Some(20));
    }

    #[test]
    fn corrupt_history_is_reported_by_try_load() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "not json").unwrap();
        assert!(matches!(
            HistoryStore::try_load(&store),
            Err(HistoryError::Corrupt(_))
        ));
        assert!(HistoryStore::load(&store).summary().is_empty());
    }
}
