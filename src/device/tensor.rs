//! GPU buffer abstraction with upload/download helpers.
//!
//! [`GpuTensor`] wraps a wgpu storage buffer holding a flat `f32`
//! array, with synchronous staging-buffer readback.

use crate::error::{FlatnetError, FlatnetResult};
use wgpu::util::DeviceExt;

/// A GPU-resident flat `f32` buffer.
///
/// All engine buffers are one-dimensional; `len` is the element
/// count. Data layout on the device is identical to the host slice it
/// was uploaded from.
pub struct GpuTensor {
    /// The underlying wgpu buffer.
    pub buffer: wgpu::Buffer,
    /// Element count.
    pub len: usize,
}

impl GpuTensor {
    /// Creates a storage buffer initialized from host data.
    pub fn upload(device: &wgpu::Device, label: &str, data: &[f32]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });
        Self {
            buffer,
            len: data.len(),
        }
    }

    /// Creates a zero-filled storage buffer of `len` elements.
    ///
    /// wgpu guarantees fresh buffers read as zero.
    pub fn zeroed(device: &wgpu::Device, label: &str, len: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (len * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self { buffer, len }
    }

    /// Replaces the buffer's full contents.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::LengthMismatch`] if `data` does not
    /// match the buffer length.
    pub fn update(&self, queue: &wgpu::Queue, data: &[f32]) -> FlatnetResult<()> {
        if data.len() != self.len {
            return Err(FlatnetError::length_mismatch(self.len, data.len()));
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        Ok(())
    }

    /// Writes `data` starting at element `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::BufferError`] if the write would run
    /// past the buffer end.
    pub fn update_range(
        &self,
        queue: &wgpu::Queue,
        offset: usize,
        data: &[f32],
    ) -> FlatnetResult<()> {
        if offset + data.len() > self.len {
            return Err(FlatnetError::buffer(format!(
                "range write {}..{} past buffer of {} elements",
                offset,
                offset + data.len(),
                self.len
            )));
        }
        queue.write_buffer(
            &self.buffer,
            (offset * std::mem::size_of::<f32>()) as u64,
            bytemuck::cast_slice(data),
        );
        Ok(())
    }

    /// Downloads the buffer to the host.
    ///
    /// Synchronous: copies into a staging buffer, submits, and blocks
    /// until the map completes.
    pub fn download(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> FlatnetResult<Vec<f32>> {
        let size_bytes = (self.len * std::mem::size_of::<f32>()) as u64;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flatnet staging (download)"),
            size: size_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("flatnet download encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size_bytes);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| FlatnetError::buffer(format!("failed to receive map result: {}", e)))??;

        let data = {
            let mapped = slice.get_mapped_range();
            bytemuck::cast_slice(&mapped).to_vec()
        };
        staging.unmap();

        Ok(data)
    }

    /// Returns the size in bytes.
    pub fn size_bytes(&self) -> u64 {
        (self.len * std::mem::size_of::<f32>()) as u64
    }
}

impl std::fmt::Debug for GpuTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTensor")
            .field("len", &self.len)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // GPU tests require an adapter, run with: cargo test --features gpu -- --ignored
}
