//! Property tests for the congestion model and history store.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use commute_core::congestion::{final_duration, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
use commute_core::history::MAX_SAMPLES_PER_BUCKET;
use commute_core::{
    ClockReading, Condition, CongestionModel, Direction, HistoricalSample, HistoryStore,
    JitterSource, RouteKey, SeededJitter, WeatherSeverity,
};
use proptest::prelude::*;

fn weather() -> impl Strategy<Value = WeatherSeverity> {
    prop_oneof![
        Just(WeatherSeverity::Clear),
        Just(WeatherSeverity::Fog),
        Just(WeatherSeverity::LightPrecipitation),
        Just(WeatherSeverity::HeavyPrecipitation),
        Just(WeatherSeverity::Storm),
    ]
}

proptest! {
    #[test]
    fn condition_never_improves_as_multiplier_grows(a in 0.5f64..3.5, b in 0.5f64..3.5) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            Condition::from_multiplier(low).severity() <= Condition::from_multiplier(high).severity()
        );
    }

    #[test]
    fn final_duration_stays_in_range(base in 0u32..2000, multiplier in 0.0f64..10.0, jitter in 0.9f64..1.1) {
        let d = final_duration(base, multiplier, jitter);
        prop_assert!((MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&d));
    }

    #[test]
    fn duration_jitter_stays_within_five_percent(seed in any::<u64>(), base in 15u32..=90) {
        let mut jitter = SeededJitter::new(Some(seed));
        let factor = jitter.uniform(0.95, 1.05);
        prop_assert!((0.95..=1.05).contains(&factor));
        let d = final_duration(base, 1.0, factor) as f64;
        let b = base as f64;
        prop_assert!(d >= (b * 0.95).round() && d <= (b * 1.05).round());
    }

    #[test]
    fn same_seed_gives_same_sequence(seed in any::<u64>()) {
        let mut a = SeededJitter::new(Some(seed));
        let mut b = SeededJitter::new(Some(seed));
        for _ in 0..8 {
            prop_assert_eq!(a.uniform(-3.0, 3.0), b.uniform(-3.0, 3.0));
        }
    }

    #[test]
    fn combined_multiplier_is_positive_and_bounded(
        day in 0u32..7,
        hour in 0u8..24,
        minute in 0u8..60,
        w in weather(),
        outbound in any::<bool>(),
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap() + Duration::days(day as i64);
        let at = ClockReading::new(date, hour, minute);
        let direction = if outbound { Direction::Outbound } else { Direction::Return };
        let m = CongestionModel::default().combined_multiplier(direction, &at, w);
        // Evening peak 2.4 * Friday 1.08 * storm 1.25
        prop_assert!(m > 0.0 && m <= 2.4 * 1.08 * 1.25 + 1e-9);
    }

    #[test]
    fn history_keeps_newest_samples_only(durations in prop::collection::vec(1u32..=360, 1..40)) {
        let route = RouteKey::new("home", "work", Direction::Outbound);
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap();
        let mut history = HistoryStore::new();
        for (i, &minutes) in durations.iter().enumerate() {
            history.push(HistoricalSample {
                route: route.clone(),
                bucket: 32,
                duration_minutes: minutes,
                recorded_at: start + Duration::days(i as i64),
            });
        }

        let kept: Vec<u32> = history.samples(&route, 32).map(|s| s.duration_minutes).collect();
        let skip = durations.len().saturating_sub(MAX_SAMPLES_PER_BUCKET);
        prop_assert_eq!(&kept[..], &durations[skip..]);

        let mean = history.mean_minutes(&route, 32).unwrap();
        let lo = *kept.iter().min().unwrap();
        let hi = *kept.iter().max().unwrap();
        prop_assert!(mean >= lo && mean <= hi);
    }
}
