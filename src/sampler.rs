//! Seeded random-sampling primitives.
//!
//! All randomness in a run flows through one [`ConstraintSampler`] handle,
//! so a fixed seed reproduces the exact same population and node labels.
//! The sampler is passed explicitly; there is no process-wide RNG state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};

/// Deterministic source of uniform integers and Poisson counts.
#[derive(Debug, Clone)]
pub struct ConstraintSampler {
    rng: StdRng,
    seed: u64,
}

impl ConstraintSampler {
    /// Creates a sampler whose stream is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this sampler was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `[low, high)`.
    ///
    /// # Panics
    /// Panics when `high <= low`. Callers must always pass a non-empty range.
    pub fn uniform(&mut self, low: u32, high: u32) -> u32 {
        self.rng.random_range(low..high)
    }

    /// Poisson-distributed count with the given mean, truncated to an integer.
    ///
    /// A mean that is zero, negative or not finite yields 0.
    pub fn poisson_count(&mut self, mean: f64) -> u32 {
        if !(mean.is_finite() && mean > 0.0) {
            return 0;
        }
        match Poisson::new(mean) {
            Ok(dist) => {
                let draw: f64 = dist.sample(&mut self.rng);
                draw as u32
            }
            Err(_) => 0,
        }
    }

    /// `true` with probability `(100 - percent) / 100`.
    ///
    /// Used for the Include-vs-Exclude operator choice.
    pub fn keep_unless(&mut self, percent: u32) -> bool {
        self.uniform(0, 100) >= percent
    }
}
