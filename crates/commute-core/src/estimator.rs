//! Base travel duration before time-of-day effects.
//!
//! Resolution order:
//! 1. learned history for the route and bucket
//! 2. distance heuristic from two street addresses
//! 3. fixed per-direction default (35 / 38 minutes)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::{HistoricalSample, HistoryStore};
use crate::jitter::{DistanceJitter, JitterSource};
use crate::location::{Direction, Gazetteer, LocationDescriptor, RouteKey};
use crate::storage::KvStore;

pub const MIN_BASE_MINUTES: u32 = 15;
pub const MAX_BASE_MINUTES: u32 = 90;

const SAME_CITY_KM: f64 = 15.0;
const OTHER_CITY_KM: f64 = 35.0;
const BOTH_CENTRAL_FACTOR: f64 = 0.7;
const ONE_CENTRAL_FACTOR: f64 = 0.9;

/// Where a base estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseSource {
    History,
    Distance,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseEstimate {
    pub minutes: u32,
    pub distance_km: f64,
    pub source: BaseSource,
}

#[derive(Debug, Clone)]
pub struct RouteEstimator {
    gazetteer: Gazetteer,
    distance_jitter: DistanceJitter,
    history: HistoryStore,
}

impl RouteEstimator {
    pub fn new(gazetteer: Gazetteer, distance_jitter: DistanceJitter, history: HistoryStore) -> Self {
        Self {
            gazetteer,
            distance_jitter,
            history,
        }
    }

    /// Build with history loaded from the store.
    pub fn load(store: &dyn KvStore, gazetteer: Gazetteer, distance_jitter: DistanceJitter) -> Self {
        Self::new(gazetteer, distance_jitter, HistoryStore::load(store))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Reload history so samples written by other processes count.
    pub fn refresh_history(&mut self, store: &dyn KvStore) {
        self.history.refresh(store);
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn distance_jitter(&self) -> DistanceJitter {
        self.distance_jitter
    }

    pub fn estimate_base_duration(
        &self,
        route: &RouteKey,
        bucket: u8,
        locations: Option<(&LocationDescriptor, &LocationDescriptor)>,
        jitter: &mut dyn JitterSource,
    ) -> BaseEstimate {
        let direction = route.direction;

        if let Some(minutes) = self.history.mean_minutes(route, bucket) {
            return BaseEstimate {
                minutes,
                distance_km: implied_distance(minutes, direction),
                source: BaseSource::History,
            };
        }

        if let Some((origin, destination)) = locations.filter(|(a, b)| a.is_geographic() && b.is_geographic()) {
            let km = self.estimate_distance_km(origin, destination, jitter);
            let minutes = (km * direction.minutes_per_km()).round() as i64;
            let minutes = minutes.clamp(MIN_BASE_MINUTES as i64, MAX_BASE_MINUTES as i64) as u32;
            return BaseEstimate {
                minutes,
                distance_km: round_tenth(km),
                source: BaseSource::Distance,
            };
        }

        tracing::debug!(
            route = %route.storage_key(),
            bucket,
            "no history or addresses for route, using default duration"
        );
        let minutes = direction.default_minutes();
        BaseEstimate {
            minutes,
            distance_km: implied_distance(minutes, direction),
            source: BaseSource::Default,
        }
    }

    /// Approximate road distance between two addresses in kilometres.
    pub fn estimate_distance_km(
        &self,
        origin: &LocationDescriptor,
        destination: &LocationDescriptor,
        jitter: &mut dyn JitterSource,
    ) -> f64 {
        let mut km = if self.gazetteer.shares_city(origin, destination) {
            SAME_CITY_KM
        } else {
            OTHER_CITY_KM
        };

        match (
            origin.is_central(&self.gazetteer),
            destination.is_central(&self.gazetteer),
        ) {
            (true, true) => km *= BOTH_CENTRAL_FACTOR,
            (true, false) | (false, true) => km *= ONE_CENTRAL_FACTOR,
            (false, false) => {}
        }

        let half = self.distance_jitter.half_width_km();
        km += jitter.uniform(-half, half);
        km.max(1.0)
    }

    /// Append a sample to history and persist it.
    pub fn record_sample(
        &mut self,
        store: &dyn KvStore,
        route: &RouteKey,
        bucket: u8,
        minutes: u32,
        recorded_at: DateTime<Utc>,
    ) {
        self.history.record(
            store,
            HistoricalSample {
                route: route.clone(),
                bucket,
                duration_minutes: minutes,
                recorded_at,
            },
        );
    }
}

fn implied_distance(minutes: u32, direction: Direction) -> f64 {
    round_tenth(minutes as f64 / direction.minutes_per_km())
}

fn round_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}
