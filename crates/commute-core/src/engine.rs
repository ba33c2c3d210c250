//! Engine facade.
//!
//! [`CommuteEngine`] wires the estimator, congestion model, advice and
//! logs together. All collaborators (store, clock, jitter) are passed in,
//! so the engine has no hidden global state.
//!
//! ```ignore
//! let config = Config::load()?;
//! let mut engine = CommuteEngine::open(&config)?;
//! let report = engine.estimate(EstimateRequest::new(config.route(), config.work_schedule()?));
//! ```
//!
//! Tests build the engine with [`CommuteEngine::new`] over a
//! [`MemoryStore`](crate::storage::MemoryStore), a fixed clock and fixed
//! jitter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::{ClockReading, SystemClock, TimeClock, BUCKETS_PER_DAY};
use crate::congestion::{
    CongestionModel, CongestionReading, Evaluation, PeakProfile, RouteHint, WeatherSeverity,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
use crate::error::{Result, ValidationError};
use crate::estimator::RouteEstimator;
use crate::history::HistoryStore;
use crate::impact::{ImpactEntry, ImpactLog};
use crate::jitter::{DistanceJitter, JitterSource, SeededJitter};
use crate::kpi::{intensity_kpi, DelayKpi, DelayKpiTracker, IntensityKpi};
use crate::location::{CommuteRoute, Direction, Gazetteer, RouteKey};
use crate::recommend::{
    banners, compute_arrival, compute_departure, generate_recommendations, productivity_impact,
    ProductivityImpact, Recommendation,
};
use crate::reports::{CommuteReports, DailyStats, WeeklyReport};
use crate::schedule::{ClockTime, WorkSchedule};
use crate::storage::{Config, KvStore, SqliteStore};

/// Tunables that stay fixed for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub gazetteer: Gazetteer,
    pub distance_jitter: DistanceJitter,
    pub profile: PeakProfile,
    pub outbound_hint: Option<RouteHint>,
    pub return_hint: Option<RouteHint>,
    /// Free-flow round trip used for lost-time and efficiency figures
    pub baseline_total: u32,
    /// When false, requested weather is treated as clear
    pub weather_integration: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gazetteer: Gazetteer::default(),
            distance_jitter: DistanceJitter::default(),
            profile: PeakProfile::default(),
            outbound_hint: None,
            return_hint: None,
            baseline_total: Direction::Outbound.default_minutes() + Direction::Return.default_minutes(),
            weather_integration: true,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let (outbound_hint, return_hint) = config.route_hints();
        Self {
            gazetteer: config.gazetteer.clone(),
            distance_jitter: config.engine.jitter_policy,
            profile: PeakProfile::default(),
            outbound_hint,
            return_hint,
            baseline_total: config.engine.baseline_total,
            weather_integration: config.engine.weather_integration,
        }
    }
}

/// What to estimate.
#[derive(Debug, Clone)]
pub struct EstimateRequest {
    pub route: CommuteRoute,
    pub schedule: WorkSchedule,
    /// Defaults to the engine clock
    pub at: Option<ClockReading>,
    pub weather: WeatherSeverity,
}

impl EstimateRequest {
    pub fn new(route: CommuteRoute, schedule: WorkSchedule) -> Self {
        Self {
            route,
            schedule,
            at: None,
            weather: WeatherSeverity::Clear,
        }
    }

    pub fn at(mut self, at: ClockReading) -> Self {
        self.at = Some(at);
        self
    }

    pub fn weather(mut self, weather: WeatherSeverity) -> Self {
        self.weather = weather;
        self
    }
}

/// Everything produced by one estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateReport {
    pub at: ClockReading,
    pub weather: WeatherSeverity,
    pub outbound: CongestionReading,
    pub return_leg: CongestionReading,
    /// High priority first
    pub recommendations: Vec<Recommendation>,
    /// Latest departure for an on-time arrival
    pub departure: ClockTime,
    /// Arrival home when leaving at `at`
    pub arrival: ClockTime,
    pub productivity: ProductivityImpact,
    pub intensity: IntensityKpi,
    pub delay_kpi: DelayKpi,
}

impl EstimateReport {
    pub fn banners(&self) -> &[Recommendation] {
        banners(&self.recommendations)
    }
}

pub struct CommuteEngine {
    store: Box<dyn KvStore>,
    clock: Box<dyn TimeClock>,
    jitter: Box<dyn JitterSource>,
    estimator: RouteEstimator,
    congestion: CongestionModel,
    delay_tracker: DelayKpiTracker,
    impact: ImpactLog,
    reports: CommuteReports,
    baseline_total: u32,
    weather_integration: bool,
}

impl CommuteEngine {
    /// Build an engine, loading history and logs from `store`.
    pub fn new(
        store: Box<dyn KvStore>,
        clock: Box<dyn TimeClock>,
        jitter: Box<dyn JitterSource>,
        settings: EngineSettings,
    ) -> Self {
        let history = HistoryStore::load(store.as_ref());
        let impact = ImpactLog::load(store.as_ref());
        let reports = CommuteReports::load(store.as_ref());
        Self {
            estimator: RouteEstimator::new(settings.gazetteer, settings.distance_jitter, history),
            congestion: CongestionModel::new(settings.profile)
                .with_hints(settings.outbound_hint, settings.return_hint),
            delay_tracker: DelayKpiTracker::new(),
            impact,
            reports,
            baseline_total: settings.baseline_total,
            weather_integration: settings.weather_integration,
            store,
            clock,
            jitter,
        }
    }

    /// Open the engine over `~/.config/commute/commute.db` with the wall
    /// clock and the configured jitter seed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::History`](crate::error::CoreError::History) if
    /// the database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open()?;
        Ok(Self::new(
            Box::new(store),
            Box::new(SystemClock),
            Box::new(SeededJitter::new(config.engine.seed)),
            EngineSettings::from_config(config),
        ))
    }

    pub fn now(&self) -> ClockReading {
        self.clock.now()
    }

    pub fn history(&self) -> &HistoryStore {
        self.estimator.history()
    }

    pub fn impact_log(&self) -> &ImpactLog {
        &self.impact
    }

    pub fn reports(&self) -> &CommuteReports {
        &self.reports
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Option<&DailyStats> {
        self.reports.daily(date)
    }

    /// Build and persist the weekly report for the week containing `today`.
    pub fn weekly_report(&mut self, today: NaiveDate) -> WeeklyReport {
        self.reports.weekly_report(self.store.as_ref(), today)
    }

    /// Estimate both legs and derive advice.
    ///
    /// History is reloaded first so samples recorded by another process
    /// count. Each leg's base sample is recorded into history, and the round
    /// trip is appended to the impact log and daily stats.
    pub fn estimate(&mut self, request: EstimateRequest) -> EstimateReport {
        let at = request.at.unwrap_or_else(|| self.clock.now());
        self.estimator.refresh_history(self.store.as_ref());
        let weather = if self.weather_integration {
            request.weather
        } else {
            WeatherSeverity::Clear
        };

        let outbound = self.evaluate_leg(&request.route, Direction::Outbound, at, weather);
        let return_leg = self.evaluate_leg(&request.route, Direction::Return, at, weather);

        let recommendations = generate_recommendations(&at, &outbound, &return_leg, &request.schedule);
        let productivity = productivity_impact(&outbound, &return_leg, self.baseline_total, weather, &at);
        let intensity = intensity_kpi(&outbound, &return_leg);
        let delay_kpi = self
            .delay_tracker
            .update(&outbound, &return_leg, self.baseline_total, &at);

        self.impact.record(
            self.store.as_ref(),
            at.date,
            ImpactEntry::from_impact(at.timestamp(), &productivity),
        );
        self.reports
            .update_daily(self.store.as_ref(), at.date, &outbound, &return_leg, weather);

        tracing::debug!(
            outbound = outbound.duration_minutes,
            return_leg = return_leg.duration_minutes,
            score = productivity.score,
            "estimate complete"
        );

        EstimateReport {
            at,
            weather,
            departure: compute_departure(&request.schedule, &outbound),
            arrival: compute_arrival(&at, &return_leg),
            outbound,
            return_leg,
            recommendations,
            productivity,
            intensity,
            delay_kpi,
        }
    }

    /// [`estimate`](Self::estimate) at the clock's current time.
    pub fn estimate_now(
        &mut self,
        route: &CommuteRoute,
        weather: WeatherSeverity,
        schedule: &WorkSchedule,
    ) -> EstimateReport {
        let at = self.clock.now();
        self.estimate(
            EstimateRequest::new(route.clone(), *schedule)
                .at(at)
                .weather(weather),
        )
    }

    /// Seed history with an observed duration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] for a bucket outside `0..96`
    /// or minutes outside `1..=360`.
    pub fn record_observation(
        &mut self,
        route: &RouteKey,
        bucket: u8,
        minutes: u32,
    ) -> Result<(), ValidationError> {
        if bucket >= BUCKETS_PER_DAY {
            return Err(ValidationError::OutOfRange {
                field: "bucket".into(),
                value: bucket as i64,
                min: 0,
                max: BUCKETS_PER_DAY as i64 - 1,
            });
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return Err(ValidationError::OutOfRange {
                field: "minutes".into(),
                value: minutes as i64,
                min: MIN_DURATION_MINUTES as i64,
                max: MAX_DURATION_MINUTES as i64,
            });
        }
        let recorded_at = self.clock.now().timestamp();
        self.estimator
            .record_sample(self.store.as_ref(), route, bucket, minutes, recorded_at);
        tracing::info!(route = %route.storage_key(), bucket, minutes, "recorded observation");
        Ok(())
    }

    fn evaluate_leg(
        &mut self,
        route: &CommuteRoute,
        direction: Direction,
        at: ClockReading,
        weather: WeatherSeverity,
    ) -> CongestionReading {
        let key = route.key(direction);
        let base = self.estimator.estimate_base_duration(
            &key,
            at.bucket(),
            route.geographic_endpoints(direction),
            self.jitter.as_mut(),
        );
        self.congestion.evaluate(
            &mut self.estimator,
            self.store.as_ref(),
            self.jitter.as_mut(),
            Evaluation {
                route: &key,
                base,
                at,
                weather,
            },
        )
    }
}
