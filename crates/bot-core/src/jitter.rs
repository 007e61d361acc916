use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Randomized delays for every scheduled action, so nothing fires on a fixed period.
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: StdRng,
}

impl Default for Jitter {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Jitter {
    /// Deterministic sequence, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform delay in `[min_ms, max_ms)`. Collapses to `min_ms` if the range is empty.
    pub fn between(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        if max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(self.rng.gen_range(min_ms..max_ms))
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// `base` plus, with probability `p`, an extra 1000–2000ms pause.
    pub fn with_occasional_pause(&mut self, base: Duration, p: f64) -> Duration {
        if self.chance(p) {
            base + self.between(1_000, 2_000)
        } else {
            base
        }
    }
}
