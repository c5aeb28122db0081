//! WGSL kernel source for the forward pass.
//!
//! One compiled kernel serves every layer: each dispatch passes the
//! current layer index in a uniform, and the kernel reads that layer's
//! ranges from the device-resident forwarding table.
//!
//! External kernel files are loaded with [`load_shader_source`];
//! missing or unreadable source is a fatal error, never silently
//! skipped.

use crate::error::FlatnetResult;
use std::fs;
use std::path::Path;

/// Forward pass kernel.
///
/// Each invocation computes one destination neuron: the logistic
/// function of the weighted sum over the source layer plus bias.
///
/// # Bind Group 0
///
/// - Binding 0: forwarding table (storage, read) - [layer_count] entries
/// - Binding 1: weights (storage, read)
/// - Binding 2: biases (storage, read)
/// - Binding 3: neurons (storage, read_write)
/// - Binding 4: pass uniforms (uniform) - current layer index
///
/// # Workgroup Size
///
/// [32, 1, 1] — must stay in sync with
/// [`GROUP_WIDTH`](crate::dispatch::GROUP_WIDTH); group count per
/// dispatch is `ceil(dst_size / 32)`.
pub const FORWARD_SHADER: &str = r#"
// One row per forwarding layer (must match ForwardingEntry in Rust)
struct ForwardingEntry {
    src_offset: u32,
    src_size: u32,
    dst_offset: u32,
    dst_size: u32,
    weight_offset: u32,
    bias_offset: u32,
    _pad0: u32,
    _pad1: u32,
}

// Per-dispatch layer parameter (must match PassUniforms in Rust)
struct PassUniforms {
    layer_index: u32,
    layer_count: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read> table: array<ForwardingEntry>;
@group(0) @binding(1) var<storage, read> weights: array<f32>;
@group(0) @binding(2) var<storage, read> biases: array<f32>;
@group(0) @binding(3) var<storage, read_write> neurons: array<f32>;
@group(0) @binding(4) var<uniform> pass_info: PassUniforms;

@compute @workgroup_size(32)
fn forward_main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let entry = table[pass_info.layer_index];
    let j = gid.x;
    if (j >= entry.dst_size) {
        return;
    }

    // Weighted sum over the source layer; weights are row-major
    // [src_size, dst_size].
    var acc = biases[entry.bias_offset + j];
    for (var i = 0u; i < entry.src_size; i++) {
        acc += weights[entry.weight_offset + i * entry.dst_size + j]
            * neurons[entry.src_offset + i];
    }

    neurons[entry.dst_offset + j] = 1.0 / (1.0 + exp(-acc));
}
"#;

/// Loads kernel source from an external file.
///
/// # Errors
///
/// Propagates the I/O error if the file is missing or unreadable —
/// the engine never links a program with a missing stage.
pub fn load_shader_source<P: AsRef<Path>>(path: P) -> FlatnetResult<String> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    log::debug!("Loaded kernel source from {}", path.display());
    Ok(source)
}
