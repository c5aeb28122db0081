//! wgpu implementation of the compute device interface.
//!
//! Storage buffers hold the five flat arrays and the forwarding table;
//! one compute pipeline serves every layer, selected per dispatch by a
//! per-layer uniform. The cross-layer barrier is realized as submit +
//! `device.poll(Maintain::Wait)`: the control thread blocks until the
//! device signals completion before the next layer's dispatch is
//! issued.

use crate::buffers::BufferKind;
use crate::device::backend::WgpuBackend;
use crate::device::shaders::FORWARD_SHADER;
use crate::device::tensor::GpuTensor;
use crate::device::uniforms::{ForwardingEntry, PassUniforms};
use crate::device::ComputeDevice;
use crate::error::{FlatnetError, FlatnetResult};
use crate::layout::NetworkLayout;
use std::sync::Arc;
use wgpu::util::DeviceExt;

struct GpuResources {
    neurons: GpuTensor,
    weights: GpuTensor,
    biases: GpuTensor,
    weight_gradients: GpuTensor,
    bias_gradients: GpuTensor,
    pipeline: wgpu::ComputePipeline,
    /// One bind group per forwarding layer, each with its own
    /// pre-filled layer-index uniform.
    layer_bind_groups: Vec<wgpu::BindGroup>,
}

/// GPU-backed [`ComputeDevice`].
///
/// Created from an initialized [`WgpuBackend`]; buffers and the
/// pipeline come alive in [`allocate`](ComputeDevice::allocate) and
/// are released when the device drops.
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    kernel_source: String,
    resources: Option<GpuResources>,
}

impl WgpuDevice {
    /// Creates a device using the built-in forward kernel.
    pub fn new(backend: &WgpuBackend) -> Self {
        Self::with_kernel_source(backend, FORWARD_SHADER)
    }

    /// Creates a device using externally loaded kernel source.
    ///
    /// Pair with
    /// [`load_shader_source`](crate::device::load_shader_source); a
    /// missing file has already failed by the time this is called.
    pub fn with_kernel_source(backend: &WgpuBackend, source: &str) -> Self {
        Self {
            device: backend.device_arc(),
            queue: backend.queue_arc(),
            kernel_source: source.to_owned(),
            resources: None,
        }
    }

    fn resources(&self) -> FlatnetResult<&GpuResources> {
        self.resources
            .as_ref()
            .ok_or_else(|| FlatnetError::not_allocated("wgpu device"))
    }

    fn tensor(res: &GpuResources, kind: BufferKind) -> &GpuTensor {
        match kind {
            BufferKind::Neurons => &res.neurons,
            BufferKind::Weights => &res.weights,
            BufferKind::Biases => &res.biases,
            BufferKind::WeightGradients => &res.weight_gradients,
            BufferKind::BiasGradients => &res.bias_gradients,
        }
    }

    /// Compiles the kernel and builds the pipeline, failing fast on
    /// validation errors instead of running a broken program.
    fn build_pipeline(
        &self,
        bind_group_layout: &wgpu::BindGroupLayout,
    ) -> FlatnetResult<wgpu::ComputePipeline> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("flatnet forward shader"),
                source: wgpu::ShaderSource::Wgsl(self.kernel_source.as_str().into()),
            });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("flatnet forward pipeline layout"),
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("flatnet forward pipeline"),
                layout: Some(&layout),
                module: &shader,
                entry_point: Some("forward_main"),
                compilation_options: Default::default(),
                cache: None,
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(FlatnetError::shader(format!(
                "kernel compilation failed: {}",
                err
            )));
        }

        Ok(pipeline)
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("flatnet forward bind group layout"),
            entries: &[
                storage(0, true),  // forwarding table
                storage(1, true),  // weights
                storage(2, true),  // biases
                storage(3, false), // neurons (read_write)
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        })
    }
}

impl ComputeDevice for WgpuDevice {
    fn allocate(&mut self, layout: &NetworkLayout) -> FlatnetResult<()> {
        let neurons = GpuTensor::zeroed(&self.device, "flatnet neurons", layout.neuron_count);
        let weights = GpuTensor::zeroed(&self.device, "flatnet weights", layout.weight_count);
        let biases = GpuTensor::zeroed(&self.device, "flatnet biases", layout.bias_count);
        let weight_gradients =
            GpuTensor::zeroed(&self.device, "flatnet weight gradients", layout.weight_count);
        let bias_gradients =
            GpuTensor::zeroed(&self.device, "flatnet bias gradients", layout.bias_count);

        let entries: Vec<ForwardingEntry> = layout
            .forwarding_layers()
            .iter()
            .map(ForwardingEntry::from_layer)
            .collect();
        let table = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("flatnet forwarding table"),
                contents: bytemuck::cast_slice(&entries),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group_layout = Self::create_bind_group_layout(&self.device);
        let pipeline = self.build_pipeline(&bind_group_layout)?;

        // One uniform + bind group per layer: the whole pass reuses one
        // compiled kernel, parameterized by layer index.
        let layer_count = layout.forwarding_count();
        let mut layer_bind_groups = Vec::with_capacity(layer_count);
        for index in 0..layer_count {
            let uniforms = PassUniforms::new(index, layer_count);
            let uniform_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("flatnet pass uniforms (layer {})", index)),
                        contents: bytemuck::bytes_of(&uniforms),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("flatnet forward bind group (layer {})", index)),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: table.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: weights.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: biases.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: neurons.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            });
            layer_bind_groups.push(bind_group);
        }

        log::info!(
            "GPU buffers resident: {} neuron / {} weight / {} bias elements, {} layers",
            layout.neuron_count,
            layout.weight_count,
            layout.bias_count,
            layer_count
        );

        self.resources = Some(GpuResources {
            neurons,
            weights,
            biases,
            weight_gradients,
            bias_gradients,
            pipeline,
            layer_bind_groups,
        });
        Ok(())
    }

    fn upload(&mut self, kind: BufferKind, data: &[f32]) -> FlatnetResult<()> {
        let res = self.resources()?;
        Self::tensor(res, kind).update(&self.queue, data)
    }

    fn upload_range(
        &mut self,
        kind: BufferKind,
        offset: usize,
        data: &[f32],
    ) -> FlatnetResult<()> {
        let res = self.resources()?;
        Self::tensor(res, kind).update_range(&self.queue, offset, data)
    }

    fn download(&mut self, kind: BufferKind) -> FlatnetResult<Vec<f32>> {
        let res = self.resources()?;
        Self::tensor(res, kind).download(&self.device, &self.queue)
    }

    fn dispatch_layer(&mut self, layer_index: usize, group_count: u32) -> FlatnetResult<()> {
        let res = self.resources()?;
        let bind_group = res
            .layer_bind_groups
            .get(layer_index)
            .ok_or_else(|| FlatnetError::layer_index(layer_index, res.layer_bind_groups.len()))?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("flatnet layer {} encoder", layer_index)),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&format!("flatnet layer {} pass", layer_index)),
                timestamp_writes: None,
            });
            pass.set_pipeline(&res.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(group_count, 1, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn barrier(&mut self) -> FlatnetResult<()> {
        // Blocks the control thread until all prior dispatches have
        // completed, making their writes visible to the next one.
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("allocated", &self.resources.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // GPU tests require an actual adapter; the software device covers
    // the orchestration contract. Run with:
    // cargo test --features gpu -- --ignored
    use super::*;
    use crate::config::EngineConfig;
    use crate::dataset::Sample;
    use crate::device::backend::WgpuOptions;
    use crate::trainer::TrainingStepController;

    #[test]
    #[ignore]
    fn test_gpu_matches_software_device() {
        let backend = WgpuBackend::init(WgpuOptions::default()).expect("no adapter");
        let config = EngineConfig {
            layer_sizes: vec![4, 3, 4, 2, 3],
            init_seed: Some(42),
            ..Default::default()
        };

        let mut gpu = TrainingStepController::new(config.clone(), WgpuDevice::new(&backend))
            .expect("gpu engine");
        let mut sw = TrainingStepController::new(
            config,
            crate::device::SoftwareDevice::new(),
        )
        .expect("software engine");

        let sample = Sample {
            values: vec![0.5, -0.25, 1.0, 0.0],
            label: "a".to_owned(),
        };
        gpu.set_enabled(true);
        sw.set_enabled(true);
        gpu.step(&sample).unwrap();
        sw.step(&sample).unwrap();

        let gpu_neurons = gpu.read_neurons().unwrap();
        let sw_neurons = sw.read_neurons().unwrap();
        for (g, s) in gpu_neurons.iter().zip(&sw_neurons) {
            assert!((g - s).abs() < 1e-5, "gpu {} vs software {}", g, s);
        }
    }
}
