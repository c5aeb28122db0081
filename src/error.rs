//! Unified error types for flatnet.
//!
//! This module provides [`FlatnetError`], a unified error type covering
//! layout, buffer, dataset, and device errors. It uses the `thiserror`
//! crate for ergonomic error handling.
//!
//! # Example
//!
//! ```rust
//! use flatnet::{FlatnetError, LayerSpec};
//!
//! let err = LayerSpec::new(vec![4]).unwrap_err();
//! assert!(matches!(err, FlatnetError::InvalidSpec(_)));
//! ```

use thiserror::Error;

/// Unified error type for flatnet operations.
///
/// Covers the host-side engine and, when the `gpu` feature is enabled,
/// the wgpu compute backend.
#[derive(Error, Debug)]
pub enum FlatnetError {
    /// The layer specification cannot describe a network.
    ///
    /// Raised before any buffer is allocated: a spec needs at least two
    /// layers (no transforms are possible otherwise) and every layer
    /// needs a positive neuron count.
    #[error("Invalid layer spec: {0}")]
    InvalidSpec(String),

    /// An index range does not fit the buffer it addresses.
    #[error("Range {start}..{end} out of bounds for {buffer} buffer of length {len}")]
    RangeOutOfBounds {
        /// Name of the addressed buffer.
        buffer: &'static str,
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Actual buffer length.
        len: usize,
    },

    /// A slice of values does not match the range it is written into.
    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Expected number of elements.
        expected: usize,
        /// Actual number of elements supplied.
        got: usize,
    },

    /// Dataset row could not be parsed.
    ///
    /// The training feed is fatal-on-error: a malformed row aborts the
    /// run rather than being skipped.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Device buffers were used before [`ComputeDevice::allocate`] ran.
    ///
    /// [`ComputeDevice::allocate`]: crate::device::ComputeDevice::allocate
    #[error("Device not allocated: {0}")]
    DeviceNotAllocated(String),

    /// A dispatch referenced a forwarding layer that does not exist.
    #[error("Layer index {index} out of range (layer count: {count})")]
    LayerIndexOutOfRange {
        /// Requested forwarding-layer index.
        index: usize,
        /// Number of forwarding layers in the table.
        count: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error while loading kernel source or dataset files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPU adapter request failed.
    ///
    /// No suitable GPU adapter was found matching the requested criteria.
    #[cfg(feature = "gpu")]
    #[error("Failed to find suitable GPU adapter: {0}")]
    AdapterNotFound(String),

    /// GPU device request failed.
    ///
    /// Could not create a device with the requested features/limits.
    #[cfg(feature = "gpu")]
    #[error("Failed to create GPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    /// GPU hardware doesn't support required limits.
    #[cfg(feature = "gpu")]
    #[error("Unsupported GPU limits: {0}")]
    UnsupportedLimits(String),

    /// GPU buffer operation failed.
    #[cfg(feature = "gpu")]
    #[error("Buffer operation failed: {0}")]
    BufferError(String),

    /// GPU buffer async operation failed.
    #[cfg(feature = "gpu")]
    #[error("Buffer async error: {0}")]
    BufferAsync(#[from] wgpu::BufferAsyncError),

    /// Compute kernel source or compilation error.
    ///
    /// Kernel problems are fatal: the engine never runs with an
    /// incomplete or non-functional program.
    #[cfg(feature = "gpu")]
    #[error("Shader error: {0}")]
    Shader(String),
}

/// Result type alias for flatnet operations.
pub type FlatnetResult<T> = Result<T, FlatnetError>;

impl FlatnetError {
    /// Creates an invalid-spec error with the given message.
    pub fn invalid_spec<S: Into<String>>(msg: S) -> Self {
        FlatnetError::InvalidSpec(msg.into())
    }

    /// Creates a range-out-of-bounds error.
    pub fn range_out_of_bounds(
        buffer: &'static str,
        range: &std::ops::Range<usize>,
        len: usize,
    ) -> Self {
        FlatnetError::RangeOutOfBounds {
            buffer,
            start: range.start,
            end: range.end,
            len,
        }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(expected: usize, got: usize) -> Self {
        FlatnetError::LengthMismatch { expected, got }
    }

    /// Creates a dataset error with the given message.
    pub fn dataset<S: Into<String>>(msg: S) -> Self {
        FlatnetError::Dataset(msg.into())
    }

    /// Creates a device-not-allocated error.
    pub fn not_allocated<S: Into<String>>(msg: S) -> Self {
        FlatnetError::DeviceNotAllocated(msg.into())
    }

    /// Creates a layer-index-out-of-range error.
    pub fn layer_index(index: usize, count: usize) -> Self {
        FlatnetError::LayerIndexOutOfRange { index, count }
    }

    /// Creates an adapter-not-found error.
    #[cfg(feature = "gpu")]
    pub fn adapter_not_found<S: Into<String>>(msg: S) -> Self {
        FlatnetError::AdapterNotFound(msg.into())
    }

    /// Creates an unsupported-limits error.
    #[cfg(feature = "gpu")]
    pub fn unsupported_limits<S: Into<String>>(msg: S) -> Self {
        FlatnetError::UnsupportedLimits(msg.into())
    }

    /// Creates a GPU buffer error.
    #[cfg(feature = "gpu")]
    pub fn buffer<S: Into<String>>(msg: S) -> Self {
        FlatnetError::BufferError(msg.into())
    }

    /// Creates a shader error.
    #[cfg(feature = "gpu")]
    pub fn shader<S: Into<String>>(msg: S) -> Self {
        FlatnetError::Shader(msg.into())
    }
}
