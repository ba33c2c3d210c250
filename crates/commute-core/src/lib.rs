//! # Commute Core Library
//!
//! This library provides the core logic for estimating daily commute times.
//! It follows a CLI-first approach: every operation is available through the
//! standalone `commute` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Estimator**: Base duration from learned history, an address-distance
//!   heuristic, or per-direction defaults
//! - **Congestion model**: Peak curves, day-of-week and weather multipliers
//! - **Advice**: Departure/arrival times, recommendations and productivity
//!   impact, plus KPIs, an impact log and weekly reports
//! - **Storage**: Key-value persistence (SQLite or in-memory) and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`CommuteEngine`]: Facade wiring all components together
//! - [`HistoryStore`]: Time-bucketed duration samples
//! - [`CongestionModel`]: Final duration and traffic condition
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod congestion;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod history;
pub mod impact;
pub mod jitter;
pub mod kpi;
pub mod location;
pub mod recommend;
pub mod reports;
pub mod schedule;
pub mod scheduler;
pub mod storage;

pub use clock::{ClockReading, FixedClock, SystemClock, TimeClock};
pub use congestion::{
    Condition, Confidence, CongestionModel, CongestionReading, PeakProfile, PeakWindow, RouteHint,
    WeatherSeverity,
};
pub use engine::{CommuteEngine, EngineSettings, EstimateReport, EstimateRequest};
pub use error::{ConfigError, CoreError, HistoryError, ScheduleError, ValidationError};
pub use estimator::{BaseEstimate, BaseSource, RouteEstimator};
pub use history::{HistoricalSample, HistoryStore, Trend};
pub use impact::{DailyImpactSummary, ImpactLog};
pub use jitter::{DistanceJitter, FixedJitter, JitterSource, SeededJitter};
pub use kpi::{DelayKpi, DelayKpiTracker, IntensityKpi};
pub use location::{CommuteRoute, Direction, Gazetteer, LocationDescriptor, RouteKey};
pub use recommend::{Priority, ProductivityImpact, Recommendation, RecommendationKind};
pub use reports::{CommuteReports, DailyStats, Insight, WeeklyReport};
pub use schedule::{ClockTime, WorkSchedule};
pub use scheduler::RepeatingTask;
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};
