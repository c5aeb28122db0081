//! Software-simulated compute device.
//!
//! Executes the forward kernel on the host, one simulated invocation
//! at a time, with the same per-invocation bounds guard the GPU kernel
//! uses. Dispatching too few groups therefore leaves destination
//! neurons observably stale, exactly as it would on real hardware.
//!
//! The device records every dispatch and barrier so tests can assert
//! the ordering discipline.

use crate::buffers::BufferKind;
use crate::device::ComputeDevice;
use crate::dispatch::GROUP_WIDTH;
use crate::error::{FlatnetError, FlatnetResult};
use crate::layout::{ForwardingLayer, NetworkLayout};

/// One recorded device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A kernel invocation batch for one forwarding layer.
    Dispatch {
        /// Forwarding-layer index passed to the kernel.
        layer: usize,
        /// Number of invocation groups issued.
        groups: u32,
    },
    /// A full synchronization barrier.
    Barrier,
}

#[derive(Debug, Default)]
struct DeviceBuffers {
    neurons: Vec<f32>,
    weights: Vec<f32>,
    biases: Vec<f32>,
    weight_gradients: Vec<f32>,
    bias_gradients: Vec<f32>,
    table: Vec<ForwardingLayer>,
}

/// Host-side device simulation.
///
/// Buffers live in plain vectors; a dispatch runs the reference
/// forward kernel (logistic activation over the weighted sum plus
/// bias) for each invocation in the batch. Since execution is
/// synchronous, [`barrier`](ComputeDevice::barrier) only has to be
/// *called* at the right points — the event log lets tests verify
/// that it is.
#[derive(Debug, Default)]
pub struct SoftwareDevice {
    buffers: Option<DeviceBuffers>,
    events: Vec<DeviceEvent>,
}

impl SoftwareDevice {
    /// Creates an unallocated device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns the recorded event log.
    pub fn take_events(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.events)
    }

    fn buffers(&self) -> FlatnetResult<&DeviceBuffers> {
        self.buffers
            .as_ref()
            .ok_or_else(|| FlatnetError::not_allocated("software device"))
    }

    fn buffers_mut(&mut self) -> FlatnetResult<&mut DeviceBuffers> {
        self.buffers
            .as_mut()
            .ok_or_else(|| FlatnetError::not_allocated("software device"))
    }

    fn buffer_mut(bufs: &mut DeviceBuffers, kind: BufferKind) -> &mut Vec<f32> {
        match kind {
            BufferKind::Neurons => &mut bufs.neurons,
            BufferKind::Weights => &mut bufs.weights,
            BufferKind::Biases => &mut bufs.biases,
            BufferKind::WeightGradients => &mut bufs.weight_gradients,
            BufferKind::BiasGradients => &mut bufs.bias_gradients,
        }
    }

    /// Runs one simulated invocation: computes one destination neuron.
    ///
    /// Mirrors the WGSL kernel body: the invocation index is guarded
    /// against `dst_size`, the weighted sum runs over the source
    /// slice, and the result passes through the logistic function.
    fn run_invocation(bufs: &mut DeviceBuffers, fwd: &ForwardingLayer, invocation: usize) {
        if invocation >= fwd.dst_size {
            return;
        }
        let src_offset = fwd.src_range().start;
        let mut acc = bufs.biases[fwd.bias_range.start + invocation];
        for i in 0..fwd.src_size {
            let w = bufs.weights[fwd.weight_range.start + i * fwd.dst_size + invocation];
            acc += w * bufs.neurons[src_offset + i];
        }
        bufs.neurons[fwd.neuron_range.start + invocation] = 1.0 / (1.0 + (-acc).exp());
    }
}

impl ComputeDevice for SoftwareDevice {
    fn allocate(&mut self, layout: &NetworkLayout) -> FlatnetResult<()> {
        self.buffers = Some(DeviceBuffers {
            neurons: vec![0.0; layout.neuron_count],
            weights: vec![0.0; layout.weight_count],
            biases: vec![0.0; layout.bias_count],
            weight_gradients: vec![0.0; layout.weight_count],
            bias_gradients: vec![0.0; layout.bias_count],
            table: layout.forwarding_layers().to_vec(),
        });
        Ok(())
    }

    fn upload(&mut self, kind: BufferKind, data: &[f32]) -> FlatnetResult<()> {
        let bufs = self.buffers_mut()?;
        let buf = Self::buffer_mut(bufs, kind);
        if data.len() != buf.len() {
            return Err(FlatnetError::length_mismatch(buf.len(), data.len()));
        }
        buf.copy_from_slice(data);
        Ok(())
    }

    fn upload_range(
        &mut self,
        kind: BufferKind,
        offset: usize,
        data: &[f32],
    ) -> FlatnetResult<()> {
        let bufs = self.buffers_mut()?;
        let buf = Self::buffer_mut(bufs, kind);
        let end = offset + data.len();
        if end > buf.len() {
            return Err(FlatnetError::range_out_of_bounds(
                kind.name(),
                &(offset..end),
                buf.len(),
            ));
        }
        buf[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn download(&mut self, kind: BufferKind) -> FlatnetResult<Vec<f32>> {
        let bufs = self.buffers()?;
        Ok(match kind {
            BufferKind::Neurons => bufs.neurons.clone(),
            BufferKind::Weights => bufs.weights.clone(),
            BufferKind::Biases => bufs.biases.clone(),
            BufferKind::WeightGradients => bufs.weight_gradients.clone(),
            BufferKind::BiasGradients => bufs.bias_gradients.clone(),
        })
    }

    fn dispatch_layer(&mut self, layer_index: usize, group_count: u32) -> FlatnetResult<()> {
        let bufs = self.buffers_mut()?;
        let fwd = bufs
            .table
            .get(layer_index)
            .cloned()
            .ok_or_else(|| FlatnetError::layer_index(layer_index, bufs.table.len()))?;

        // Exactly group_count * GROUP_WIDTH invocations, as the device
        // would launch; the per-invocation guard trims the overhang.
        for invocation in 0..(group_count as usize * GROUP_WIDTH) {
            Self::run_invocation(bufs, &fwd, invocation);
        }

        self.events.push(DeviceEvent::Dispatch {
            layer: layer_index,
            groups: group_count,
        });
        Ok(())
    }

    fn barrier(&mut self) -> FlatnetResult<()> {
        // Execution is synchronous; recording the call is the contract.
        self.events.push(DeviceEvent::Barrier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayerSpec;

    fn layout() -> NetworkLayout {
        NetworkLayout::plan(&LayerSpec::new(vec![2, 3, 2]).unwrap())
    }

    fn allocated() -> (NetworkLayout, SoftwareDevice) {
        let layout = layout();
        let mut device = SoftwareDevice::new();
        device.allocate(&layout).unwrap();
        (layout, device)
    }

    #[test]
    fn test_unallocated_errors() {
        let mut device = SoftwareDevice::new();
        assert!(device.download(BufferKind::Neurons).is_err());
        assert!(device.dispatch_layer(0, 1).is_err());
    }

    #[test]
    fn test_upload_download_round_trip() {
        let (layout, mut device) = allocated();
        let weights: Vec<f32> = (0..layout.weight_count).map(|i| i as f32).collect();
        device.upload(BufferKind::Weights, &weights).unwrap();
        assert_eq!(device.download(BufferKind::Weights).unwrap(), weights);
    }

    #[test]
    fn test_upload_range_bounds() {
        let (_, mut device) = allocated();
        assert!(device
            .upload_range(BufferKind::Neurons, 0, &[1.0, 2.0])
            .is_ok());
        assert!(device
            .upload_range(BufferKind::Neurons, 6, &[1.0, 2.0])
            .is_err());
    }

    #[test]
    fn test_dispatch_computes_sigmoid_sum() {
        let (layout, mut device) = allocated();
        // First transform: 2 -> 3. Identity-ish weights, known bias.
        // w[i][j] row-major src x dst.
        let mut weights = vec![0.0; layout.weight_count];
        weights[0] = 1.0; // w[0][0]
        weights[4] = 1.0; // w[1][1]
        device.upload(BufferKind::Weights, &weights).unwrap();

        let mut biases = vec![0.0; layout.bias_count];
        biases[2] = 0.5;
        device.upload(BufferKind::Biases, &biases).unwrap();

        device
            .upload_range(BufferKind::Neurons, 0, &[2.0, -1.0])
            .unwrap();
        device.dispatch_layer(0, 1).unwrap();

        let neurons = device.download(BufferKind::Neurons).unwrap();
        let sigmoid = |x: f32| 1.0 / (1.0 + (-x).exp());
        assert!((neurons[2] - sigmoid(2.0)).abs() < 1e-6);
        assert!((neurons[3] - sigmoid(-1.0)).abs() < 1e-6);
        assert!((neurons[4] - sigmoid(0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_undersized_group_count_leaves_neurons_stale() {
        // 40 destination neurons need ceil(40/32) = 2 groups; issuing
        // only 1 must leave the tail uncomputed.
        let layout = NetworkLayout::plan(&LayerSpec::new(vec![2, 40]).unwrap());
        let mut device = SoftwareDevice::new();
        device.allocate(&layout).unwrap();
        device
            .upload(BufferKind::Biases, &vec![10.0; layout.bias_count])
            .unwrap();

        device.dispatch_layer(0, 1).unwrap();
        let neurons = device.download(BufferKind::Neurons).unwrap();
        let dst = &neurons[2..42];
        // First 32 computed (sigmoid(10) ~ 1), the rest untouched.
        assert!(dst[..32].iter().all(|&v| v > 0.99));
        assert!(dst[32..].iter().all(|&v| v == 0.0));

        device.dispatch_layer(0, 2).unwrap();
        let neurons = device.download(BufferKind::Neurons).unwrap();
        assert!(neurons[2..42].iter().all(|&v| v > 0.99));
    }

    #[test]
    fn test_dispatch_rejects_bad_layer_index() {
        let (_, mut device) = allocated();
        assert!(device.dispatch_layer(2, 1).is_err());
    }
}
