//! Buffer initialization.
//!
//! Seeds the weight buffer with bounded uniform pseudo-random values
//! and zeroes the bias and gradient buffers. The bound is a
//! configuration constant ([`crate::config::DEFAULT_WEIGHT_BOUND`]),
//! not derived from data.
//!
//! The seed is explicit and test-controllable: `Some(seed)` gives a
//! fully deterministic fill, `None` seeds from OS entropy.

use crate::buffers::{BufferKind, BufferPool};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Observed minimum and maximum of the weight buffer after
/// initialization.
///
/// Consumed only by the visualization readback, never by training.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightStats {
    /// Smallest initialized weight.
    pub min: f32,
    /// Largest initialized weight.
    pub max: f32,
}

/// Seeds weights and zeroes biases and gradients.
pub struct Initializer {
    rng: SmallRng,
    bound: f32,
}

impl Initializer {
    /// Creates an initializer drawing weights from `[-bound, bound]`.
    ///
    /// `seed: None` pulls entropy from the OS; pass `Some(..)` for
    /// reproducible runs.
    pub fn new(bound: f32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        Self { rng, bound }
    }

    /// Fills the weight buffer uniformly and zeroes everything else.
    ///
    /// Returns the observed min/max of the freshly seeded weights. On
    /// a weightless layout (degenerate) the stats are both zero.
    pub fn initialize(&mut self, pool: &mut BufferPool) -> WeightStats {
        let bound = self.bound;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        let weight_len = pool.len(BufferKind::Weights);
        let weights: Vec<f32> = (0..weight_len)
            .map(|_| {
                let w = self.rng.gen_range(-bound..=bound);
                min = min.min(w);
                max = max.max(w);
                w
            })
            .collect();
        // Infallible: the vec was sized from the pool itself.
        let _ = pool.replace(BufferKind::Weights, &weights);

        pool.fill(BufferKind::Biases, 0.0);
        pool.fill(BufferKind::WeightGradients, 0.0);
        pool.fill(BufferKind::BiasGradients, 0.0);

        if weight_len == 0 {
            return WeightStats { min: 0.0, max: 0.0 };
        }
        log::debug!(
            "Initialized {} weights in [{:.3}, {:.3}], observed [{:.3}, {:.3}]",
            weight_len,
            -bound,
            bound,
            min,
            max
        );
        WeightStats { min, max }
    }
}
