//! GPU backend initialization and device management.
//!
//! [`WgpuBackend`] selects an adapter, checks limits, and owns the
//! wgpu device and queue the engine submits work to.

use crate::error::{FlatnetError, FlatnetResult};
use std::sync::Arc;

/// Power preference for GPU adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    /// Prefer low power consumption (integrated GPU).
    LowPower,
    /// Prefer high performance (discrete GPU).
    #[default]
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(pref: PowerPreference) -> Self {
        match pref {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Options for initializing the wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuOptions {
    /// Power preference for adapter selection.
    pub power_preference: PowerPreference,
    /// Preferred backend (Vulkan, DX12, Metal, etc.).
    /// If None, wgpu will auto-select the best available.
    pub backend: Option<wgpu::Backends>,
    /// Required features.
    pub required_features: wgpu::Features,
    /// Required limits (minimum).
    pub required_limits: wgpu::Limits,
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::HighPerformance,
            backend: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

impl WgpuOptions {
    /// Creates options sized for large flat buffers.
    pub fn compute() -> Self {
        Self {
            required_limits: wgpu::Limits {
                max_storage_buffer_binding_size: 1 << 30, // 1GB
                max_buffer_size: 1 << 30,
                ..wgpu::Limits::default()
            },
            ..Default::default()
        }
    }

    /// Creates options for low-memory environments.
    pub fn low_memory() -> Self {
        Self {
            power_preference: PowerPreference::LowPower,
            required_limits: wgpu::Limits::downlevel_defaults(),
            ..Default::default()
        }
    }
}

/// The wgpu device/queue pair the engine runs on.
///
/// Entry point for all GPU work: create once, then build a
/// [`WgpuDevice`](crate::device::WgpuDevice) on top of it.
pub struct WgpuBackend {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device for resource creation.
    pub device: Arc<wgpu::Device>,
    /// The wgpu queue for command submission.
    pub queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
}

impl WgpuBackend {
    /// Initializes the GPU backend with the given options.
    ///
    /// # Errors
    ///
    /// - [`FlatnetError::AdapterNotFound`] — no suitable GPU adapter.
    /// - [`FlatnetError::UnsupportedLimits`] — the adapter cannot meet
    ///   the requested limits.
    /// - [`FlatnetError::DeviceRequestFailed`] — device creation
    ///   failed.
    pub fn init(options: WgpuOptions) -> FlatnetResult<Self> {
        let backends = options.backend.unwrap_or(wgpu::Backends::all());
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(Self::request_adapter(&instance, &options))?;
        let adapter_info = adapter.get_info();

        log::info!(
            "Selected GPU adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Self::check_limits(&adapter.limits(), &options.required_limits)?;

        let (device, queue) = pollster::block_on(Self::request_device(&adapter, &options))?;
        let limits = device.limits();

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            limits,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        options: &WgpuOptions,
    ) -> FlatnetResult<wgpu::Adapter> {
        // Try the preferred adapter first, then fall back to anything.
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await;

        match adapter {
            Some(a) => Ok(a),
            None => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::None,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or_else(|| {
                    FlatnetError::adapter_not_found(
                        "No GPU adapters available. Ensure GPU drivers are installed.",
                    )
                }),
        }
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        options: &WgpuOptions,
    ) -> FlatnetResult<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("flatnet GPU device"),
                    required_features: options.required_features,
                    required_limits: options.required_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;
        Ok((device, queue))
    }

    fn check_limits(adapter: &wgpu::Limits, required: &wgpu::Limits) -> FlatnetResult<()> {
        if adapter.max_storage_buffer_binding_size < required.max_storage_buffer_binding_size {
            return Err(FlatnetError::unsupported_limits(format!(
                "max_storage_buffer_binding_size: adapter has {}, required {}",
                adapter.max_storage_buffer_binding_size, required.max_storage_buffer_binding_size
            )));
        }
        if adapter.max_buffer_size < required.max_buffer_size {
            return Err(FlatnetError::unsupported_limits(format!(
                "max_buffer_size: adapter has {}, required {}",
                adapter.max_buffer_size, required.max_buffer_size
            )));
        }
        Ok(())
    }

    /// Returns information about the selected adapter.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Returns the device limits.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Returns whether a buffer size (in bytes) fits a storage
    /// binding.
    pub fn supports_buffer_size(&self, size_bytes: u64) -> bool {
        size_bytes <= self.limits.max_storage_buffer_binding_size as u64
    }

    /// Blocks until all submitted work completes.
    pub fn poll(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Returns a clone of the device Arc.
    pub fn device_arc(&self) -> Arc<wgpu::Device> {
        Arc::clone(&self.device)
    }

    /// Returns a clone of the queue Arc.
    pub fn queue_arc(&self) -> Arc<wgpu::Queue> {
        Arc::clone(&self.queue)
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field(
                "max_storage_buffer",
                &self.limits.max_storage_buffer_binding_size,
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let opts = WgpuOptions::default();
        assert_eq!(opts.power_preference, PowerPreference::HighPerformance);
        assert!(opts.backend.is_none());
    }

    #[test]
    fn test_options_compute() {
        let opts = WgpuOptions::compute();
        assert!(opts.required_limits.max_storage_buffer_binding_size >= 1 << 30);
    }

    // GPU tests require an actual adapter, run with: cargo test --features gpu -- --ignored
    #[test]
    #[ignore]
    fn test_backend_init() {
        let backend = WgpuBackend::init(WgpuOptions::default()).expect("Failed to init backend");
        assert!(!backend.adapter_info().name.is_empty());
    }
}
