//! Traffic KPIs: per-leg intensity and a rolling delay tracker.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::clock::ClockReading;
use crate::congestion::{Condition, CongestionReading};
use crate::history::Trend;

/// Delay values retained by [`DelayKpiTracker`].
pub const DELAY_HISTORY_LEN: usize = 10;

const CONGESTED_FLOOR: u8 = 75;
const SLOW_FLOOR: u8 = 45;

/// Traffic intensity on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityKpi {
    pub outbound: u8,
    pub return_leg: u8,
    /// Rounded mean of both legs
    pub overall: u8,
}

pub fn intensity_kpi(outbound: &CongestionReading, return_leg: &CongestionReading) -> IntensityKpi {
    let outbound = leg_intensity(outbound);
    let return_leg = leg_intensity(return_leg);
    IntensityKpi {
        outbound,
        return_leg,
        overall: ((outbound as f64 + return_leg as f64) / 2.0).round() as u8,
    }
}

/// `20 + relative_delay * 60`, clamped, with a floor per condition.
pub fn leg_intensity(reading: &CongestionReading) -> u8 {
    let base = reading.base_minutes.max(1) as f64;
    let delay = (reading.duration_minutes as f64 - base) / base;
    let value = (20.0 + delay * 60.0).clamp(0.0, 100.0).round() as u8;
    match reading.condition {
        Condition::Congested => value.max(CONGESTED_FLOOR),
        Condition::Slow => value.max(SLOW_FLOOR),
        Condition::Flowing => value,
    }
}

/// Delay snapshot for the current round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayKpi {
    /// Minutes over the baseline round trip, never negative
    pub delay_minutes: u32,
    pub efficiency_pct: u32,
    /// Change against the previous update
    pub trend: Trend,
    /// Expected direction over the next 30 minutes
    pub forecast: Trend,
}

#[derive(Debug, Clone, Default)]
pub struct DelayKpiTracker {
    delays: VecDeque<u32>,
}

impl DelayKpiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(
        &mut self,
        outbound: &CongestionReading,
        return_leg: &CongestionReading,
        baseline_total: u32,
        now: &ClockReading,
    ) -> DelayKpi {
        let current = (outbound.duration_minutes + return_leg.duration_minutes).max(1);
        let delay_minutes = current.saturating_sub(baseline_total);
        let efficiency_pct = (baseline_total as f64 / current as f64 * 100.0).round() as u32;

        self.delays.push_back(delay_minutes);
        while self.delays.len() > DELAY_HISTORY_LEN {
            self.delays.pop_front();
        }

        DelayKpi {
            delay_minutes,
            efficiency_pct,
            trend: self.trend(),
            forecast: forecast_next_30_min(now),
        }
    }

    pub fn delays(&self) -> impl Iterator<Item = u32> + '_ {
        self.delays.iter().copied()
    }

    fn trend(&self) -> Trend {
        let n = self.delays.len();
        if n < 2 {
            return Trend::Stable;
        }
        Trend::between(self.delays[n - 2] as f64, self.delays[n - 1] as f64)
    }
}

/// Rush-hour build-up and wind-down windows.
pub fn forecast_next_30_min(now: &ClockReading) -> Trend {
    let m = now.minutes_of_day();
    let within = |from: u16, to: u16| m >= from * 60 && m < to * 60;
    if within(6, 8) || within(15, 17) {
        Trend::Worsening
    } else if within(9, 11) || within(19, 21) {
        Trend::Improving
    } else {
        Trend::Stable
    }
}
