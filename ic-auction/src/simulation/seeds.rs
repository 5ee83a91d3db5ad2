use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// SplitMix64 finalizer over `seed` combined with `stream`.
///
/// Used to derive independent generator seeds (per trial, per date) from one
/// root seed without drawing from a shared RNG.
pub fn mix(seed: u64, stream: u64) -> u64 {
    let mut z = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// RNG for one Monte Carlo trial of an evaluation.
pub fn trial_rng(evaluation_seed: u64, trial: usize) -> StdRng {
    StdRng::seed_from_u64(mix(evaluation_seed, trial as u64))
}

/// Root seed of the equilibrium search for `date`.
pub fn date_seed(seed: u64, date: NaiveDate) -> u64 {
    mix(seed, date.num_days_from_ce() as u64)
}

/// Hands out one seed per utility evaluation.
#[derive(Debug, Clone)]
pub struct SeedStream {
    rng: StdRng,
}

impl SeedStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        self.rng.random()
    }

    /// The underlying generator, for consumers that draw directly (optimizers).
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
