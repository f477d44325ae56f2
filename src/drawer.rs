//! Weighted outcome drawing

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::symbols::{Outcome, WeightTable};

/// Draws fixed-length outcomes from a weight table.
///
/// Each position is an independent weighted sample with replacement. The
/// RNG is statistically uniform, not cryptographic; fairness is the
/// requirement here, the session layer owns anything security-sensitive.
pub struct Drawer {
    rng: StdRng,
    draw_len: usize,
}

impl Drawer {
    /// Create a drawer seeded from the OS entropy source
    pub fn new(draw_len: usize) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            draw_len,
        }
    }

    /// Create a drawer with a fixed seed for reproducible results
    pub fn seeded(draw_len: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            draw_len,
        }
    }

    /// Re-seed the RNG in place
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Outcome length produced by this drawer
    pub fn draw_len(&self) -> usize {
        self.draw_len
    }

    /// Draw one outcome. A constructed `WeightTable` always has positive
    /// total weight, so this cannot fail.
    pub fn draw(&mut self, table: &WeightTable) -> Outcome {
        self.draw_n(table, self.draw_len)
    }

    /// Draw an outcome of an explicit length (modes share one drawer)
    pub fn draw_n(&mut self, table: &WeightTable, len: usize) -> Outcome {
        let mut outcome = Vec::with_capacity(len);
        for _ in 0..len {
            outcome.push(table.sample(&mut self.rng));
        }
        outcome
    }
}
