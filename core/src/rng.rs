//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call a platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the master seed in AnalyticsConfig.
//!
//! Each consumer gets its own stream, seeded from
//! (master_seed XOR stream_index * golden ratio). This means:
//!   - Adding a new stream never changes existing streams.
//!   - Label noise, the split shuffle and each forest tree are
//!     reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single consumer.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream from the master seed and a stable index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll an index in [0, n). Returns 0 when n is 0.
    pub fn index_below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }

    /// Sample from N(mean, std) using the Box–Muller transform.
    pub fn normal(&mut self, mean: f64, std: f64) -> f64 {
        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std * z
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index_below(i + 1);
            items.swap(i, j);
        }
    }
}

/// All streams for one training call, derived from a single seed.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }

    /// Stream for the n-th tree of a forest. Tree streams live above
    /// the fixed slots so they never collide with them.
    pub fn for_tree(&self, tree_index: usize) -> StreamRng {
        StreamRng::new(self.master_seed, TREE_STREAM_BASE + tree_index as u64).with_name("tree")
    }
}

const TREE_STREAM_BASE: u64 = 1_000;

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    ChurnLabels = 0,
    CltvLabels  = 1,
    Split       = 2,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChurnLabels => "churn_labels",
            Self::CltvLabels  => "cltv_labels",
            Self::Split       => "split",
        }
    }
}
