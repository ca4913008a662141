//! Deterministic random number generation for synthetic facts.
//!
//! RULE: the fact generator never calls a platform RNG.
//! All randomness flows through FactRng instances derived from a single
//! master seed. Each fact stream gets its own RNG, seeded from
//! (master_seed XOR stream_index). This means:
//!   - Adding a new stream never changes existing streams.
//!   - Each stream is fully reproducible in isolation.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single fact stream.
pub struct FactRng {
    pub stream: FactStream,
    inner:      Pcg64Mcg,
}

impl FactRng {
    pub fn new(master_seed: u64, stream: FactStream) -> Self {
        let derived_seed = master_seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            stream,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an index in [0, len).
    pub fn index(&mut self, len: usize) -> usize {
        self.next_u64_below(len as u64) as usize
    }

    /// Roll an integer in [lo, hi] inclusive.
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(hi >= lo, "empty range");
        lo + self.next_u64_below((hi - lo + 1) as u64) as i64
    }

    /// Uniform float in [lo, hi).
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Index in [0, len) skewed towards 0. `skew` > 1 concentrates mass
    /// on the first entries, which gives catalogue sales a Pareto shape.
    pub fn skewed_index(&mut self, len: usize, skew: f64) -> usize {
        let u = self.next_f64().powf(skew);
        ((u * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Sample from a simplified Pareto distribution.
    /// x_min: minimum value, alpha: shape parameter (higher = less skewed).
    pub fn pareto(&mut self, x_min: f64, alpha: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        x_min * u.powf(-1.0 / alpha)
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum FactStream {
    Stores    = 0,
    Products  = 1,
    Customers = 2,
    Orders    = 3,
    Reviews   = 4,
    Loyalty   = 5,
}
