//! Source of the uniform draws that decide every probabilistic event.
//!
//! Hosts, the destination and the slot engine never touch a global
//! generator. The engine owns one `RandomOutcomeSource` and lends it to
//! whoever needs a draw, so a seeded source replays a run exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomOutcomeSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `[low, high]`, both ends inclusive.
    fn uniform_inclusive(&mut self, low: u32, high: u32) -> u32;

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }
}

/// `rand`-backed outcome source.
#[derive(Debug, Clone)]
pub struct RandomOutcomes<R = StdRng> {
    rng: R,
}

impl RandomOutcomes<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        RandomOutcomes {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        RandomOutcomes {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> RandomOutcomes<R> {
    pub fn new(rng: R) -> Self {
        RandomOutcomes { rng }
    }
}

impl<R: Rng> RandomOutcomeSource for RandomOutcomes<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn uniform_inclusive(&mut self, low: u32, high: u32) -> u32 {
        self.rng.gen_range(low..=high)
    }
}

/// Scripted source for tests: every unit draw returns the same value and
/// integer draws return the low or high end of the range.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct FixedOutcomes {
    pub unit: f64,
    pub take_high: bool,
}

#[cfg(test)]
impl FixedOutcomes {
    /// Every `chance(p)` with `p > 0` succeeds.
    pub fn always() -> Self {
        FixedOutcomes {
            unit: 0.0,
            take_high: false,
        }
    }

    /// Every `chance(p)` with `p < 1` fails.
    pub fn never() -> Self {
        FixedOutcomes {
            unit: 0.999_999,
            take_high: false,
        }
    }
}

#[cfg(test)]
impl RandomOutcomeSource for FixedOutcomes {
    fn next_unit(&mut self) -> f64 {
        self.unit
    }

    fn uniform_inclusive(&mut self, low: u32, high: u32) -> u32 {
        if self.take_high {
            high
        } else {
            low
        }
    }
}
