//! # flatnet — flat-buffer layout and dispatch engine for layered networks
//!
//! Deterministically lays out a multi-layer feed-forward network's
//! neurons, weights, and biases into contiguous flat buffers, and
//! drives a parallel compute device through an ordered sequence of
//! per-layer compute passes with explicit cross-layer synchronization.
//!
//! ## Architecture
//! - Three flat address spaces (neurons / weights / biases), planned
//!   by a pure, deterministic layout pass
//! - One forwarding layer per adjacent layer pair, described as
//!   half-open `begin..end` ranges
//! - One compute-kernel dispatch per layer, strict layer order, full
//!   barrier between consecutive layers
//!
//! ## Usage
//! ```rust
//! use flatnet::{EngineConfig, Sample, SoftwareDevice, TrainingStepController};
//!
//! let config = EngineConfig {
//!     layer_sizes: vec![4, 3, 4, 2, 3],
//!     init_seed: Some(42),
//!     ..Default::default()
//! };
//! let mut engine = TrainingStepController::new(config, SoftwareDevice::new()).unwrap();
//! engine.set_enabled(true);
//!
//! let sample = Sample { values: vec![5.1, 3.5, 1.4, 0.2], label: "setosa".into() };
//! engine.step(&sample).unwrap();
//! let neurons = engine.read_neurons().unwrap();
//! assert_eq!(neurons.len(), engine.layout().neuron_count);
//! ```
//!
//! The `gpu` feature adds a wgpu backend behind the same
//! [`ComputeDevice`] interface.

pub mod buffers;
pub mod config;
pub mod dataset;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod init;
pub mod labels;
pub mod layout;
pub mod trainer;

// Re-exports
pub use buffers::{BufferKind, BufferPool};
pub use config::{ConfigError, EngineConfig, DEFAULT_WEIGHT_BOUND};
pub use dataset::{load_samples, Sample};
pub use device::{ComputeDevice, DeviceEvent, SoftwareDevice};
pub use dispatch::{workgroup_count, DispatchOrchestrator, PassState, GROUP_WIDTH};
pub use error::{FlatnetError, FlatnetResult};
pub use init::{Initializer, WeightStats};
pub use labels::LabelTable;
pub use layout::{ForwardingLayer, LayerSpec, NetworkLayout};
pub use trainer::{StepOutcome, TrainingStepController};

#[cfg(feature = "gpu")]
pub use device::{WgpuBackend, WgpuDevice, WgpuOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
