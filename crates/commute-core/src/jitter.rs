//! Random sources for duration and distance jitter.
//!
//! Jitter is injected so tests can pin it; production uses a PCG generator
//! seeded from entropy or from configuration.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

/// Uniform draws in a closed range.
pub trait JitterSource {
    /// Draw a value in `[low, high]`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// PCG-backed jitter, reproducible when seeded.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: Mcg128Xsl64,
}

impl SeededJitter {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }
}

impl JitterSource for SeededJitter {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Always returns the same fraction of the requested range.
///
/// `FixedJitter::midpoint()` yields 0 km of distance jitter and a duration
/// factor of exactly 1.0.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter {
    /// Position within the range, 0.0 = low, 1.0 = high
    pub fraction: f64,
}

impl FixedJitter {
    pub fn midpoint() -> Self {
        Self { fraction: 0.5 }
    }

    pub fn low() -> Self {
        Self { fraction: 0.0 }
    }

    pub fn high() -> Self {
        Self { fraction: 1.0 }
    }
}

impl JitterSource for FixedJitter {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.fraction.clamp(0.0, 1.0)
    }
}

/// Distance jitter policy for the address heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceJitter {
    /// ±5 km
    #[default]
    Wide,
    /// ±3 km
    Narrow,
}

impl DistanceJitter {
    pub fn half_width_km(self) -> f64 {
        match self {
            DistanceJitter::Wide => 5.0,
            DistanceJitter::Narrow => 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_jitter_is_reproducible() {
        let mut a = SeededJitter::new(Some(42));
        let mut b = SeededJitter::new(Some(42));
        for _ in 0..20 {
            assert_eq!(a.uniform(0.95, 1.05), b.uniform(0.95, 1.05));
        }
    }

    #[test]
    fn seeded_jitter_stays_in_range() {
        let mut j = SeededJitter::new(Some(7));
        for _ in 0..1000 {
            let v = j.uniform(-5.0, 5.0);
            assert!((-5.0..=5.0).contains(&v));
        }
    }

    #[test]
    fn fixed_jitter_positions() {
        assert!((FixedJitter::midpoint().uniform(0.95, 1.05) - 1.0).abs() < 1e-12);
        assert_eq!(FixedJitter::low().uniform(-3.0, 3.0), -3.0);
        assert_eq!(FixedJitter::high().uniform(-3.0, 3.0), 3.0);
    }

    #[test]
    fn distance_policies() {
        assert_eq!(DistanceJitter::default(), DistanceJitter::Wide);
        assert_eq!(DistanceJitter::Wide.half_width_km(), 5.0);
        assert_eq!(DistanceJitter::Narrow.half_width_km(), 3.0);
    }
}
