//! Flat-buffer layout planning for layered networks.
//!
//! Every layer's neurons, every transform's weights, and every
//! transform's biases live in three single contiguous `f32` arrays,
//! concatenated in layer order. This module computes, from an ordered
//! list of layer widths, the index ranges each transform owns in those
//! three flat address spaces.
//!
//! # Range Convention (Critical!)
//!
//! All ranges are half-open `begin..end` with `begin <= end`, strictly
//! increasing across the table. The weight matrix of a transform with
//! `src_size` inputs and `dst_size` outputs is flattened row-major:
//!
//! `w[i][j] = weights[weight_range.start + i * dst_size + j]`
//!
//! # Input Layer
//!
//! The first layer's neuron slots are counted in the neuron total but
//! are the destination of no forwarding layer: they are written
//! externally with the input sample each step. Every other layer's
//! slots are owned by exactly one forwarding layer.

use crate::error::{FlatnetError, FlatnetResult};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A validated, immutable sequence of layer widths.
///
/// The first and last entries are the input and output layer widths.
/// Fixed at construction; changing the topology requires recomputing
/// the entire layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSpec {
    sizes: Vec<usize>,
}

impl LayerSpec {
    /// Validates and wraps a sequence of layer widths.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::InvalidSpec`] if fewer than two layers
    /// are given or any width is zero. This check runs before any
    /// buffer allocation.
    pub fn new(sizes: Vec<usize>) -> FlatnetResult<Self> {
        if sizes.len() < 2 {
            return Err(FlatnetError::invalid_spec(format!(
                "need at least 2 layers for a transform, got {}",
                sizes.len()
            )));
        }
        if let Some(idx) = sizes.iter().position(|&s| s == 0) {
            return Err(FlatnetError::invalid_spec(format!(
                "layer {} has zero neurons",
                idx
            )));
        }
        Ok(Self { sizes })
    }

    /// Returns the layer widths in order.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the number of layers.
    #[inline]
    pub fn layer_count(&self) -> usize {
        self.sizes.len()
    }

    /// Returns the input layer width.
    #[inline]
    pub fn input_width(&self) -> usize {
        self.sizes[0]
    }

    /// Returns the output layer width.
    #[inline]
    pub fn output_width(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }
}

/// The transform connecting one layer to the next, as index ranges into
/// the flat buffers.
///
/// One forwarding layer exists per adjacent layer pair `i -> i+1`. Its
/// `neuron_range` addresses the *destination* layer's neurons; the
/// source layer's slice immediately precedes it (see
/// [`src_range`](Self::src_range)).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForwardingLayer {
    /// Destination layer's neuron slots in the flat neuron buffer.
    pub neuron_range: Range<usize>,
    /// This transform's `src_size * dst_size` weights, row-major.
    pub weight_range: Range<usize>,
    /// Destination layer's biases in the flat bias buffer.
    pub bias_range: Range<usize>,
    /// Source layer neuron count.
    pub src_size: usize,
    /// Destination layer neuron count.
    pub dst_size: usize,
}

impl ForwardingLayer {
    /// The source layer's neuron slots.
    ///
    /// The neuron buffer is concatenated in layer order, so the source
    /// slice ends exactly where `neuron_range` begins.
    #[inline]
    pub fn src_range(&self) -> Range<usize> {
        self.neuron_range.start - self.src_size..self.neuron_range.start
    }
}

/// The planned layout: buffer totals plus the ordered forwarding table.
///
/// Produced by [`NetworkLayout::plan`], a pure function of the
/// [`LayerSpec`]: identical specs yield identical layouts every time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkLayout {
    spec: LayerSpec,
    /// Total neuron buffer length (sum of all layer widths).
    pub neuron_count: usize,
    /// Total weight buffer length (sum of `src * dst` over pairs).
    pub weight_count: usize,
    /// Total bias buffer length (sum of `dst` over pairs).
    pub bias_count: usize,
    forwarding: Vec<ForwardingLayer>,
}

impl NetworkLayout {
    /// Plans the flat-buffer layout for the given spec.
    ///
    /// Single linear scan: for each consecutive pair `(src, dst)` a
    /// forwarding layer is emitted at the current running totals, then
    /// the totals advance by the amounts that layer consumed. The first
    /// layer's slots are accounted for by starting the neuron total at
    /// `sizes[0]`.
    pub fn plan(spec: &LayerSpec) -> Self {
        let sizes = spec.sizes();

        let mut neuron_count = sizes[0];
        let mut weight_count = 0usize;
        let mut bias_count = 0usize;

        let mut forwarding = Vec::with_capacity(sizes.len() - 1);
        for pair in sizes.windows(2) {
            let (src, dst) = (pair[0], pair[1]);
            forwarding.push(ForwardingLayer {
                neuron_range: neuron_count..neuron_count + dst,
                weight_range: weight_count..weight_count + src * dst,
                bias_range: bias_count..bias_count + dst,
                src_size: src,
                dst_size: dst,
            });
            neuron_count += dst;
            weight_count += src * dst;
            bias_count += dst;
        }

        Self {
            spec: spec.clone(),
            neuron_count,
            weight_count,
            bias_count,
            forwarding,
        }
    }

    /// Returns the spec this layout was planned from.
    #[inline]
    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    /// Returns the ordered forwarding-layer table.
    #[inline]
    pub fn forwarding_layers(&self) -> &[ForwardingLayer] {
        &self.forwarding
    }

    /// Returns the number of forwarding layers (layer count - 1).
    #[inline]
    pub fn forwarding_count(&self) -> usize {
        self.forwarding.len()
    }

    /// Returns the forwarding layer at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::LayerIndexOutOfRange`] if `index` is past
    /// the table.
    pub fn forwarding_layer(&self, index: usize) -> FlatnetResult<&ForwardingLayer> {
        self.forwarding
            .get(index)
            .ok_or_else(|| FlatnetError::layer_index(index, self.forwarding.len()))
    }

    /// The input layer's neuron slots (written externally each step).
    #[inline]
    pub fn input_range(&self) -> Range<usize> {
        0..self.spec.input_width()
    }

    /// The output layer's neuron slots.
    #[inline]
    pub fn output_range(&self) -> Range<usize> {
        self.neuron_count - self.spec.output_width()..self.neuron_count
    }
}
