//! Seeding of the priority generator.
//!
//! Every [`Forest`](super::Forest) owns its generator, so forests never share
//! random state and a fixed seed reproduces the exact same tree shapes.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub type Priority = u32;

/// Seed used when deterministic seeding is requested without a value.
pub const DEFAULT_SEED: u64 = 5489;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    /// Wall-clock nanoseconds at construction.
    #[default]
    Clock,
    Fixed(u64),
}

impl Seed {
    /// `deterministic_seed` switch: `true` gives [`DEFAULT_SEED`].
    pub fn deterministic(enabled: bool) -> Seed {
        if enabled {
            Seed::Fixed(DEFAULT_SEED)
        } else {
            Seed::Clock
        }
    }

    pub fn value(self) -> u64 {
        match self {
            Seed::Fixed(seed) => seed,
            Seed::Clock => {
                let since = match SystemTime::now().duration_since(UNIX_EPOCH) {
                    Ok(d) => d,
                    Err(e) => e.duration(),
                };
                since.as_nanos() as u64
            }
        }
    }

    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.value())
    }
}
