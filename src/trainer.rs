//! Training step control.
//!
//! [`TrainingStepController`] owns the whole engine context — layout,
//! buffer pool, device, orchestrator, label table — and drives one
//! network pass per outer iteration while training is enabled. There
//! is no process-wide mutable state: everything lives in this struct
//! and is released when it drops.
//!
//! # Training Seam
//!
//! No loss computation or parameter-update rule runs here. The
//! gradient buffers are allocated, reset to zero at the start of every
//! step, and readable afterwards; whatever update rule a caller adds
//! plugs in after the forward pass completes.

use crate::buffers::{BufferKind, BufferPool};
use crate::config::EngineConfig;
use crate::dataset::Sample;
use crate::device::ComputeDevice;
use crate::dispatch::{DispatchOrchestrator, PassState};
use crate::error::{FlatnetError, FlatnetResult};
use crate::init::{Initializer, WeightStats};
use crate::labels::LabelTable;
use crate::layout::{LayerSpec, NetworkLayout};

/// What a call to [`TrainingStepController::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A full network pass ran; the sample's label resolved to this
    /// class index.
    Completed {
        /// First-seen class index of the sample's label.
        class_index: usize,
    },
    /// Training is disabled; nothing was dispatched.
    Skipped,
}

/// Owns the engine context and drives per-step network passes.
///
/// The `enabled` flag is toggled externally (by the UI collaborator in
/// the original program). Toggling takes effect before the next full
/// pass begins; a pass already in flight runs to completion.
pub struct TrainingStepController<D: ComputeDevice> {
    config: EngineConfig,
    layout: NetworkLayout,
    pool: BufferPool,
    device: D,
    orchestrator: DispatchOrchestrator,
    labels: LabelTable,
    weight_stats: WeightStats,
    enabled: bool,
    steps_run: usize,
}

impl<D: ComputeDevice> TrainingStepController<D> {
    /// Builds the full engine: plans the layout, allocates and seeds
    /// the buffers, and uploads everything to the device.
    ///
    /// # Errors
    ///
    /// Fails fast on an invalid configuration (before any allocation)
    /// and propagates device allocation/upload failures, which are
    /// fatal.
    pub fn new(config: EngineConfig, mut device: D) -> FlatnetResult<Self> {
        config.validate()?;
        let spec = LayerSpec::new(config.layer_sizes.clone())?;
        let layout = NetworkLayout::plan(&spec);

        let mut pool = BufferPool::new(&layout);
        let mut initializer = Initializer::new(config.weight_bound, config.init_seed);
        let weight_stats = initializer.initialize(&mut pool);

        device.allocate(&layout)?;
        for kind in BufferKind::ALL {
            device.upload(kind, pool.buffer(kind))?;
        }

        log::info!(
            "Engine ready: {} layers, {} neurons, {} weights",
            spec.layer_count(),
            layout.neuron_count,
            layout.weight_count
        );

        Ok(Self {
            config,
            layout,
            pool,
            device,
            orchestrator: DispatchOrchestrator::new(),
            labels: LabelTable::new(),
            weight_stats,
            enabled: false,
            steps_run: 0,
        })
    }

    /// Runs one training step: resolves the label, writes the input
    /// sample into the first layer's neuron slots, and drives the full
    /// dispatch sequence.
    ///
    /// A sample may carry fewer values than the input layer is wide;
    /// the remainder of the input slice is zeroed so stale values from
    /// the previous sample never leak into this pass.
    ///
    /// # Errors
    ///
    /// Fails if the sample carries *more* values than the input layer
    /// holds, or on any device error (which abandons the pass).
    pub fn step(&mut self, sample: &Sample) -> FlatnetResult<StepOutcome> {
        if !self.enabled {
            return Ok(StepOutcome::Skipped);
        }

        let input_range = self.layout.input_range();
        if sample.values.len() > input_range.len() {
            return Err(FlatnetError::length_mismatch(
                input_range.len(),
                sample.values.len(),
            ));
        }

        // Gradients accumulate within a single step only.
        self.pool.fill(BufferKind::WeightGradients, 0.0);
        self.pool.fill(BufferKind::BiasGradients, 0.0);
        self.device
            .upload(BufferKind::WeightGradients, self.pool.buffer(BufferKind::WeightGradients))?;
        self.device
            .upload(BufferKind::BiasGradients, self.pool.buffer(BufferKind::BiasGradients))?;

        let class_index = self.labels.resolve(&sample.label);

        let mut input = vec![0.0f32; input_range.len()];
        input[..sample.values.len()].copy_from_slice(&sample.values);
        self.pool
            .write(BufferKind::Neurons, input_range.clone(), &input)?;
        // The input write must be device-visible before layer 0 runs.
        self.device
            .upload_range(BufferKind::Neurons, input_range.start, &input)?;

        self.orchestrator.run_pass(&mut self.device, &self.layout)?;
        self.steps_run += 1;

        Ok(StepOutcome::Completed { class_index })
    }

    /// Drives up to `max_iterations` steps over `samples`, cycling the
    /// feed, until training is disabled.
    ///
    /// Returns the number of completed steps.
    ///
    /// # Errors
    ///
    /// An empty feed is fatal, as is any step failure.
    pub fn run(&mut self, samples: &[Sample]) -> FlatnetResult<usize> {
        if samples.is_empty() {
            return Err(FlatnetError::dataset("no samples to train on"));
        }

        let mut completed = 0;
        for i in 0..self.config.max_iterations {
            if !self.enabled {
                break;
            }
            match self.step(&samples[i % samples.len()])? {
                StepOutcome::Completed { .. } => completed += 1,
                StepOutcome::Skipped => break,
            }
        }
        Ok(completed)
    }

    /// Enables or disables training.
    ///
    /// Cooperative: takes effect before the next full pass begins.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Training {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Returns whether training is currently enabled.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the current pass state.
    #[inline]
    pub fn pass_state(&self) -> PassState {
        self.orchestrator.state()
    }

    /// Returns the number of completed training steps.
    #[inline]
    pub fn steps_run(&self) -> usize {
        self.steps_run
    }

    /// Returns the planned layout.
    #[inline]
    pub fn layout(&self) -> &NetworkLayout {
        &self.layout
    }

    /// Returns the engine configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the label table.
    #[inline]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Weight min/max recorded at initialization, for display only.
    #[inline]
    pub fn weight_stats(&self) -> WeightStats {
        self.weight_stats
    }

    /// Reads the device-resident neuron buffer (visualization
    /// readback; no mutation).
    pub fn read_neurons(&mut self) -> FlatnetResult<Vec<f32>> {
        self.device.download(BufferKind::Neurons)
    }

    /// Reads the device-resident weight buffer (visualization
    /// readback; no mutation).
    pub fn read_weights(&mut self) -> FlatnetResult<Vec<f32>> {
        self.device.download(BufferKind::Weights)
    }

    /// Reads the device-resident bias buffer (visualization
    /// readback; no mutation).
    pub fn read_biases(&mut self) -> FlatnetResult<Vec<f32>> {
        self.device.download(BufferKind::Biases)
    }

    /// Reads the device-resident gradient buffers (training seam).
    pub fn read_gradients(&mut self) -> FlatnetResult<(Vec<f32>, Vec<f32>)> {
        Ok((
            self.device.download(BufferKind::WeightGradients)?,
            self.device.download(BufferKind::BiasGradients)?,
        ))
    }
}

impl<D: ComputeDevice> std::fmt::Debug for TrainingStepController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingStepController")
            .field("layers", &self.config.layer_sizes)
            .field("enabled", &self.enabled)
            .field("steps_run", &self.steps_run)
            .field("labels", &self.labels.len())
            .finish()
    }
}
