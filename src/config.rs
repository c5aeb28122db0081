//! Engine configuration and hyperparameters.
//!
//! This module provides [`EngineConfig`] for configuring the network
//! engine: layer topology, weight initialization bound, seeding, and
//! training-loop parameters.
//!
//! # Example
//!
//! ```rust
//! use flatnet::EngineConfig;
//!
//! // Preset for the digit-classifier topology
//! let config = EngineConfig::default_digits();
//! assert_eq!(config.layer_sizes, vec![784, 6, 4, 6, 10]);
//!
//! // Or customize
//! let config = EngineConfig {
//!     layer_sizes: vec![4, 6, 4, 3],
//!     init_seed: Some(42),
//!     ..Default::default()
//! };
//! config.validate().expect("Invalid configuration");
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default symmetric bound for uniform weight initialization.
///
/// Weights are drawn from `[-DEFAULT_WEIGHT_BOUND, DEFAULT_WEIGHT_BOUND]`.
/// This is a configuration constant, not derived from data.
pub const DEFAULT_WEIGHT_BOUND: f32 = 5.0;

/// Default learning rate for the training seam.
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;

/// Default maximum number of outer training iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// Network engine configuration.
///
/// Defines the layer topology and the hyperparameters of the training
/// loop. The topology is fixed at engine construction: changing it
/// requires rebuilding the entire layout and all buffers.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Ordered layer neuron counts: `[input, hidden..., output]`.
    ///
    /// Must have at least two entries, all positive.
    pub layer_sizes: Vec<usize>,

    /// Symmetric bound for uniform weight initialization.
    pub weight_bound: f32,

    /// Learning rate handed to the training-update seam.
    pub learning_rate: f32,

    /// Maximum number of outer training iterations.
    pub max_iterations: usize,

    /// Optional seed for deterministic initialization (None => entropy).
    pub init_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layer_sizes: vec![784, 6, 4, 6, 10],
            weight_bound: DEFAULT_WEIGHT_BOUND,
            learning_rate: DEFAULT_LEARNING_RATE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            init_seed: None,
        }
    }
}

impl EngineConfig {
    /// Creates the digit-classifier preset.
    ///
    /// Topology `[784, 6, 4, 6, 10]`: 28x28 grayscale input, three
    /// narrow hidden layers, ten output classes.
    pub fn default_digits() -> Self {
        Self::default()
    }

    /// Creates the flower-measurement preset.
    ///
    /// Topology `[4, 6, 4, 3]`: four measurements per sample, three
    /// species classes.
    pub fn default_flowers() -> Self {
        Self {
            layer_sizes: vec![4, 6, 4, 3],
            ..Default::default()
        }
    }

    /// Returns the input layer width (`layer_sizes[0]`).
    ///
    /// # Panics
    ///
    /// Panics if `layer_sizes` is empty; call [`validate`](Self::validate)
    /// first.
    #[inline]
    pub fn input_width(&self) -> usize {
        self.layer_sizes[0]
    }

    /// Returns the output layer width (last entry of `layer_sizes`).
    ///
    /// # Panics
    ///
    /// Panics if `layer_sizes` is empty; call [`validate`](Self::validate)
    /// first.
    #[inline]
    pub fn output_width(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `layer_sizes` has fewer than two entries
    /// - any layer size is zero
    /// - `weight_bound` is not a positive finite number
    /// - `learning_rate` is not a positive finite number
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layer_sizes.len() < 2 {
            return Err(ConfigError::TooFewLayers(self.layer_sizes.len()));
        }
        if let Some(idx) = self.layer_sizes.iter().position(|&s| s == 0) {
            return Err(ConfigError::EmptyLayer(idx));
        }
        if !self.weight_bound.is_finite() || self.weight_bound <= 0.0 {
            return Err(ConfigError::InvalidWeightBound(self.weight_bound));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        Ok(())
    }
}

/// Errors returned by [`EngineConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Fewer than two layers: no transform is possible.
    #[error("Need at least 2 layers, got {0}")]
    TooFewLayers(usize),

    /// A layer has zero neurons.
    #[error("Layer {0} has zero neurons")]
    EmptyLayer(usize),

    /// Weight bound must be positive and finite.
    #[error("Weight bound must be positive and finite, got {0}")]
    InvalidWeightBound(f32),

    /// Learning rate must be positive and finite.
    #[error("Learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input_width(), 784);
        assert_eq!(config.output_width(), 10);
    }

    #[test]
    fn test_flowers_preset() {
        let config = EngineConfig::default_flowers();
        assert!(config.validate().is_ok());
        assert_eq!(config.layer_sizes, vec![4, 6, 4, 3]);
    }

    #[test]
    fn test_too_few_layers() {
        let config = EngineConfig {
            layer_sizes: vec![10],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooFewLayers(1))
        ));
    }

    #[test]
    fn test_empty_layer() {
        let config = EngineConfig {
            layer_sizes: vec![4, 0, 3],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyLayer(1))));
    }

    #[test]
    fn test_invalid_weight_bound() {
        let config = EngineConfig {
            weight_bound: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
