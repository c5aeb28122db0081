//! Host-side flat buffer pool.
//!
//! [`BufferPool`] owns the five contiguous `f32` arrays of the engine —
//! neurons, weights, biases, weight gradients, bias gradients — sized
//! from a [`NetworkLayout`]'s totals. All mutation goes through explicit
//! index ranges; whole-buffer replacement only happens at
//! initialization.
//!
//! The pool is the host-visible side of the data. Device-resident
//! copies are kept consistent by the owning engine: any host write that
//! a dispatch depends on (the input-sample write in particular) must be
//! uploaded before that dispatch is issued.

use crate::error::{FlatnetError, FlatnetResult};
use crate::layout::NetworkLayout;
use std::ops::Range;

/// Identifies one of the five flat buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// All layers' neuron values, concatenated in layer order.
    Neurons,
    /// All transforms' weight matrices, concatenated in layer order.
    Weights,
    /// All transforms' bias vectors, concatenated in layer order.
    Biases,
    /// Gradient accumulator shaped like [`BufferKind::Weights`].
    WeightGradients,
    /// Gradient accumulator shaped like [`BufferKind::Biases`].
    BiasGradients,
}

impl BufferKind {
    /// All five kinds, in upload order.
    pub const ALL: [BufferKind; 5] = [
        BufferKind::Neurons,
        BufferKind::Weights,
        BufferKind::Biases,
        BufferKind::WeightGradients,
        BufferKind::BiasGradients,
    ];

    /// Short name used in errors and labels.
    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Neurons => "neuron",
            BufferKind::Weights => "weight",
            BufferKind::Biases => "bias",
            BufferKind::WeightGradients => "weight-gradient",
            BufferKind::BiasGradients => "bias-gradient",
        }
    }
}

/// Owns the five host-side flat buffers.
///
/// Buffer lengths are fixed by the layout at construction and never
/// change; there is no resizing or re-layout during execution.
#[derive(Debug, Clone)]
pub struct BufferPool {
    neurons: Vec<f32>,
    weights: Vec<f32>,
    biases: Vec<f32>,
    weight_gradients: Vec<f32>,
    bias_gradients: Vec<f32>,
}

impl BufferPool {
    /// Allocates all five buffers, zero-filled, sized from the layout.
    pub fn new(layout: &NetworkLayout) -> Self {
        log::debug!(
            "Allocating buffer pool: {} neurons, {} weights, {} biases",
            layout.neuron_count,
            layout.weight_count,
            layout.bias_count
        );
        Self {
            neurons: vec![0.0; layout.neuron_count],
            weights: vec![0.0; layout.weight_count],
            biases: vec![0.0; layout.bias_count],
            weight_gradients: vec![0.0; layout.weight_count],
            bias_gradients: vec![0.0; layout.bias_count],
        }
    }

    /// Returns a read-only view of a whole buffer.
    pub fn buffer(&self, kind: BufferKind) -> &[f32] {
        match kind {
            BufferKind::Neurons => &self.neurons,
            BufferKind::Weights => &self.weights,
            BufferKind::Biases => &self.biases,
            BufferKind::WeightGradients => &self.weight_gradients,
            BufferKind::BiasGradients => &self.bias_gradients,
        }
    }

    fn buffer_mut(&mut self, kind: BufferKind) -> &mut Vec<f32> {
        match kind {
            BufferKind::Neurons => &mut self.neurons,
            BufferKind::Weights => &mut self.weights,
            BufferKind::Biases => &mut self.biases,
            BufferKind::WeightGradients => &mut self.weight_gradients,
            BufferKind::BiasGradients => &mut self.bias_gradients,
        }
    }

    /// Returns a read-only slice of a buffer by explicit range.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::RangeOutOfBounds`] if the range does not
    /// fit the buffer.
    pub fn slice(&self, kind: BufferKind, range: Range<usize>) -> FlatnetResult<&[f32]> {
        let buf = self.buffer(kind);
        if range.end > buf.len() || range.start > range.end {
            return Err(FlatnetError::range_out_of_bounds(
                kind.name(),
                &range,
                buf.len(),
            ));
        }
        Ok(&buf[range])
    }

    /// Writes `values` into a buffer at the explicit range.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::RangeOutOfBounds`] if the range does not
    /// fit, or [`FlatnetError::LengthMismatch`] if `values` does not
    /// fill the range exactly.
    pub fn write(
        &mut self,
        kind: BufferKind,
        range: Range<usize>,
        values: &[f32],
    ) -> FlatnetResult<()> {
        if values.len() != range.len() {
            return Err(FlatnetError::length_mismatch(range.len(), values.len()));
        }
        let buf = self.buffer_mut(kind);
        if range.end > buf.len() || range.start > range.end {
            return Err(FlatnetError::range_out_of_bounds(
                kind.name(),
                &range,
                buf.len(),
            ));
        }
        buf[range].copy_from_slice(values);
        Ok(())
    }

    /// Fills a whole buffer with a constant (initialization only).
    pub fn fill(&mut self, kind: BufferKind, value: f32) {
        self.buffer_mut(kind).fill(value);
    }

    /// Replaces a whole buffer's contents (initialization only).
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::LengthMismatch`] if `values` does not
    /// match the buffer length.
    pub fn replace(&mut self, kind: BufferKind, values: &[f32]) -> FlatnetResult<()> {
        let buf = self.buffer_mut(kind);
        if values.len() != buf.len() {
            return Err(FlatnetError::length_mismatch(buf.len(), values.len()));
        }
        buf.copy_from_slice(values);
        Ok(())
    }

    /// Returns the length of a buffer.
    pub fn len(&self, kind: BufferKind) -> usize {
        self.buffer(kind).len()
    }

    /// True if the neuron buffer is empty (degenerate pool).
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayerSpec;

    fn pool() -> (NetworkLayout, BufferPool) {
        let layout = NetworkLayout::plan(&LayerSpec::new(vec![4, 3, 4, 2, 3]).unwrap());
        let pool = BufferPool::new(&layout);
        (layout, pool)
    }

    #[test]
    fn test_sizes_match_layout() {
        let (layout, pool) = pool();
        assert_eq!(pool.len(BufferKind::Neurons), layout.neuron_count);
        assert_eq!(pool.len(BufferKind::Weights), layout.weight_count);
        assert_eq!(pool.len(BufferKind::Biases), layout.bias_count);
        assert_eq!(pool.len(BufferKind::WeightGradients), layout.weight_count);
        assert_eq!(pool.len(BufferKind::BiasGradients), layout.bias_count);
    }

    #[test]
    fn test_zero_initialized() {
        let (_, pool) = pool();
        for kind in BufferKind::ALL {
            assert!(pool.buffer(kind).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_range_write_and_read() {
        let (layout, mut pool) = pool();
        let input = layout.input_range();
        pool.write(BufferKind::Neurons, input.clone(), &[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(
            pool.slice(BufferKind::Neurons, input).unwrap(),
            &[1.0, 2.0, 3.0, 4.0]
        );
        // Slots past the input stay untouched.
        assert_eq!(pool.slice(BufferKind::Neurons, 4..7).unwrap(), &[0.0; 3]);
    }

    #[test]
    fn test_write_rejects_bad_range() {
        let (_, mut pool) = pool();
        let err = pool
            .write(BufferKind::Neurons, 14..18, &[0.0; 4])
            .unwrap_err();
        assert!(matches!(err, FlatnetError::RangeOutOfBounds { .. }));
    }

    #[test]
    fn test_write_rejects_length_mismatch() {
        let (_, mut pool) = pool();
        let err = pool.write(BufferKind::Neurons, 0..4, &[0.0; 3]).unwrap_err();
        assert!(matches!(err, FlatnetError::LengthMismatch { .. }));
    }

    #[test]
    fn test_replace_validates_length() {
        let (layout, mut pool) = pool();
        assert!(pool
            .replace(BufferKind::Weights, &vec![1.0; layout.weight_count])
            .is_ok());
        assert!(pool.replace(BufferKind::Weights, &[1.0; 3]).is_err());
    }
}
