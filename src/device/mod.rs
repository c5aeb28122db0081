//! Compute device abstraction.
//!
//! The layout and orchestration logic never talks to a concrete GPU
//! API. It drives a minimal device-resource interface — allocate,
//! upload, dispatch, barrier, download — so the engine is portable
//! across compute backends and testable with a software-simulated
//! device.
//!
//! # Backends
//!
//! - [`SoftwareDevice`] — always available; executes the forward kernel
//!   on the host, one simulated invocation at a time.
//! - [`WgpuDevice`] — behind the `gpu` feature; storage buffers and a
//!   WGSL compute pipeline on a wgpu device.

mod software;

#[cfg(feature = "gpu")]
mod backend;
#[cfg(feature = "gpu")]
mod gpu;
#[cfg(feature = "gpu")]
pub mod shaders;
#[cfg(feature = "gpu")]
mod tensor;
#[cfg(feature = "gpu")]
mod uniforms;

pub use software::{DeviceEvent, SoftwareDevice};

#[cfg(feature = "gpu")]
pub use backend::{PowerPreference, WgpuBackend, WgpuOptions};
#[cfg(feature = "gpu")]
pub use gpu::WgpuDevice;
#[cfg(feature = "gpu")]
pub use shaders::{load_shader_source, FORWARD_SHADER};
#[cfg(feature = "gpu")]
pub use tensor::GpuTensor;
#[cfg(feature = "gpu")]
pub use uniforms::{ForwardingEntry, PassUniforms};

use crate::buffers::BufferKind;
use crate::error::FlatnetResult;
use crate::layout::NetworkLayout;

/// Minimal interface a compute backend must provide.
///
/// Lifecycle: [`allocate`](Self::allocate) once with the planned
/// layout, then any number of upload/dispatch/barrier/download rounds.
/// Device resources are released when the backend is dropped.
///
/// # Synchronization Contract
///
/// [`dispatch_layer`](Self::dispatch_layer) may return before the
/// device finishes; [`barrier`](Self::barrier) must block until every
/// write of previously issued dispatches is visible. The orchestrator
/// issues a barrier between consecutive layer dispatches — skipping it
/// would let layer `i+1` read stale neuron values.
pub trait ComputeDevice {
    /// Creates the five device buffers and the forwarding-layer table.
    ///
    /// Allocation failure is fatal; no partial state survives.
    fn allocate(&mut self, layout: &NetworkLayout) -> FlatnetResult<()>;

    /// Replaces a device buffer's full contents.
    fn upload(&mut self, kind: BufferKind, data: &[f32]) -> FlatnetResult<()>;

    /// Writes `data` into a device buffer starting at `offset`.
    ///
    /// Used for the per-step input-sample write, which must be visible
    /// before the first layer's dispatch.
    fn upload_range(&mut self, kind: BufferKind, offset: usize, data: &[f32])
        -> FlatnetResult<()>;

    /// Reads a device buffer back to the host.
    fn download(&mut self, kind: BufferKind) -> FlatnetResult<Vec<f32>>;

    /// Issues one compute-kernel invocation batch for a forwarding
    /// layer.
    ///
    /// The layer index is the kernel's per-call parameter: a single
    /// compiled kernel serves every layer by reading that layer's
    /// ranges from the uploaded forwarding table.
    fn dispatch_layer(&mut self, layer_index: usize, group_count: u32) -> FlatnetResult<()>;

    /// Blocks until all previously dispatched work is complete and its
    /// writes are visible.
    fn barrier(&mut self) -> FlatnetResult<()>;
}
