/*!

Explicitly threaded random-number state.

A single [`SimRng`] is seeded once from the configured seed and handed down
through the driver, the state machine and the transmission model. All draws
for a run come from this one stream, in household-order × member-order, which
makes a run fully reproducible for a fixed seed and fixed inputs.

*/

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;

pub struct SimRng {
    rng: StdRng,
}

impl SimRng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        SimRng {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random()
    }

    /// Samples the given distribution.
    pub fn sample<T, D: Distribution<T>>(&mut self, distribution: &D) -> T {
        distribution.sample(&mut self.rng)
    }

    /// Samples `amount` distinct indices in `0..length` without replacement.
    /// `amount` is clamped to `length`.
    pub fn sample_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, length, amount.min(length)).into_vec()
    }
}
