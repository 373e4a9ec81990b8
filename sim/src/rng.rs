//! Simulation random number source.

use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shared RNG resource. Every random draw in the simulation goes through it,
/// so a fixed seed reproduces a session.
#[derive(Resource, Debug)]
pub struct SimRng(pub StdRng);

impl SimRng {
    /// Create a deterministic RNG from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Create an RNG seeded from `seed` when present, otherwise from entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self(StdRng::from_entropy()),
        }
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f32 {
        self.0.gen::<f32>()
    }

    /// Uniform draw in `[low, high)`. Returns `low` for an empty range.
    #[inline]
    pub fn range(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            low
        } else {
            self.0.gen_range(low..high)
        }
    }

    /// Uniform integer in `[low, high]`.
    #[inline]
    pub fn between(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            low
        } else {
            self.0.gen_range(low..=high)
        }
    }

    /// True with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Random facing sign, +1.0 or -1.0.
    #[inline]
    pub fn sign(&mut self) -> f32 {
        if self.0.gen_bool(0.5) {
            1.0
        } else {
            -1.0
        }
    }

    /// Pick one entry of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.0.gen_range(0..items.len()))
        }
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::from_optional_seed(None)
    }
}
