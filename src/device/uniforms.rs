//! Uniform and storage-table structures for the compute kernel.
//!
//! `#[repr(C)]` structures matching the WGSL-side layout. Every struct
//! here is sized in whole 16-byte rows so std140/std430 alignment
//! rules hold on both sides.

use crate::layout::ForwardingLayer;
use bytemuck::{Pod, Zeroable};

/// One row of the device-resident forwarding-layer table.
///
/// The kernel indexes this table with the per-call layer parameter to
/// find the ranges of the layer it is computing.
///
/// # Layout
///
/// Total size: 32 bytes (8 × u32).
///
/// ```text
/// Offset  Size  Field
/// 0       4     src_offset
/// 4       4     src_size
/// 8       4     dst_offset
/// 12      4     dst_size
/// 16      4     weight_offset
/// 20      4     bias_offset
/// 24      8     padding
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ForwardingEntry {
    /// Source layer's first neuron index.
    pub src_offset: u32,
    /// Source layer neuron count.
    pub src_size: u32,
    /// Destination layer's first neuron index.
    pub dst_offset: u32,
    /// Destination layer neuron count.
    pub dst_size: u32,
    /// First weight index of this transform.
    pub weight_offset: u32,
    /// First bias index of this transform.
    pub bias_offset: u32,
    /// Padding to a 16-byte row.
    pub _pad0: u32,
    /// Padding to a 16-byte row.
    pub _pad1: u32,
}

impl ForwardingEntry {
    /// Converts a planned forwarding layer into its table row.
    pub fn from_layer(fwd: &ForwardingLayer) -> Self {
        Self {
            src_offset: fwd.src_range().start as u32,
            src_size: fwd.src_size as u32,
            dst_offset: fwd.neuron_range.start as u32,
            dst_size: fwd.dst_size as u32,
            weight_offset: fwd.weight_range.start as u32,
            bias_offset: fwd.bias_range.start as u32,
            _pad0: 0,
            _pad1: 0,
        }
    }

    /// Returns the size in bytes.
    pub const fn size_bytes() -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Per-dispatch uniform carrying the kernel's layer parameter.
///
/// # Layout
///
/// Total size: 16 bytes (1 × vec4).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PassUniforms {
    /// Index of the forwarding layer this dispatch computes.
    pub layer_index: u32,
    /// Number of forwarding layers in the table.
    pub layer_count: u32,
    /// Padding to a 16-byte row.
    pub _pad0: u32,
    /// Padding to a 16-byte row.
    pub _pad1: u32,
}

impl PassUniforms {
    /// Creates uniforms for one layer dispatch.
    pub fn new(layer_index: usize, layer_count: usize) -> Self {
        Self {
            layer_index: layer_index as u32,
            layer_count: layer_count as u32,
            _pad0: 0,
            _pad1: 0,
        }
    }

    /// Returns the size in bytes.
    pub const fn size_bytes() -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayerSpec, NetworkLayout};

    #[test]
    fn test_forwarding_entry_size() {
        // Must be 32 bytes (2 vec4)
        assert_eq!(ForwardingEntry::size_bytes(), 32);
    }

    #[test]
    fn test_pass_uniforms_size() {
        // Must be 16 bytes (1 vec4)
        assert_eq!(PassUniforms::size_bytes(), 16);
    }

    #[test]
    fn test_entry_from_layer() {
        let layout = NetworkLayout::plan(&LayerSpec::new(vec![4, 3, 4, 2, 3]).unwrap());
        let entry = ForwardingEntry::from_layer(&layout.forwarding_layers()[0]);
        assert_eq!(entry.src_offset, 0);
        assert_eq!(entry.src_size, 4);
        assert_eq!(entry.dst_offset, 4);
        assert_eq!(entry.dst_size, 3);
        assert_eq!(entry.weight_offset, 0);
        assert_eq!(entry.bias_offset, 0);
    }

    #[test]
    fn test_pod_cast() {
        let entry = ForwardingEntry::from_layer(
            &NetworkLayout::plan(&LayerSpec::new(vec![2, 2]).unwrap()).forwarding_layers()[0],
        );
        let bytes: &[u8] = bytemuck::bytes_of(&entry);
        assert_eq!(bytes.len(), 32);
    }
}
