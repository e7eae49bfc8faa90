use crate::config::JitterRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the multiplicative factor applied to each candidate score.
pub trait JitterSource {
    fn next_factor(&mut self) -> f32;
}

/// Always returns the same factor; pins scores in tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedJitter(pub f32);

impl Default for FixedJitter {
    fn default() -> Self {
        Self(1.0)
    }
}

impl JitterSource for FixedJitter {
    fn next_factor(&mut self) -> f32 {
        self.0
    }
}

/// Uniform draws from a `JitterRange` using a seedable `StdRng`.
#[derive(Clone, Debug)]
pub struct SeededJitter {
    rng: StdRng,
    range: JitterRange,
}

impl SeededJitter {
    pub fn new(seed: u64, range: JitterRange) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            range,
        }
    }

    /// Seeds from the wall clock; each call gets an independent stream.
    pub fn from_clock(range: JitterRange) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(nanos, range)
    }
}

impl JitterSource for SeededJitter {
    fn next_factor(&mut self) -> f32 {
        self.rng.random_range(self.range.min()..=self.range.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_sequence() {
        let range = JitterRange::default();
        let mut a = SeededJitter::new(42, range);
        let mut b = SeededJitter::new(42, range);
        let xs: Vec<f32> = (0..32).map(|_| a.next_factor()).collect();
        let ys: Vec<f32> = (0..32).map(|_| b.next_factor()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn draws_stay_in_range() {
        let range = JitterRange::new(0.9, 1.1).unwrap();
        let mut j = SeededJitter::new(7, range);
        for _ in 0..1000 {
            let f = j.next_factor();
            assert!((0.9..=1.1).contains(&f), "factor {f}");
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let range = JitterRange::new(1.0, 1.0).unwrap();
        let mut j = SeededJitter::from_clock(range);
        assert_eq!(j.next_factor(), 1.0);
    }

    #[test]
    fn fixed_jitter_repeats() {
        let mut j = FixedJitter(0.8);
        assert_eq!(j.next_factor(), 0.8);
        assert_eq!(j.next_factor(), 0.8);
        assert_eq!(FixedJitter::default().next_factor(), 1.0);
    }
}
