//! Headless device setup

use anyhow::{Context, Result};

use fixedfn_core::BackendKind;

/// wgpu backends matching a configured backend name
pub fn backends(kind: BackendKind) -> wgpu::Backends {
    match kind {
        BackendKind::Auto => wgpu::Backends::all(),
        BackendKind::Vulkan => wgpu::Backends::VULKAN,
        BackendKind::Metal => wgpu::Backends::METAL,
        BackendKind::Dx12 => wgpu::Backends::DX12,
        BackendKind::OpenGl => wgpu::Backends::GL,
    }
}

/// Device and queue plus the optional features the surface cares about
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// `POLYGON_MODE_LINE` was granted, so wireframe pipelines are possible
    pub wireframe_supported: bool,
}

impl GpuContext {
    /// Open a device without a window surface.
    pub fn headless(kind: BackendKind) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backends(kind),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .with_context(|| format!("Failed to find a GPU adapter for backend '{}'", kind.as_str()))?;

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel.flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
            anyhow::bail!(
                "Adapter '{}' cannot read storage buffers in vertex shaders",
                adapter.get_info().name
            );
        }

        let wireframe_supported = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fixedfn Device"),
            required_features,
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: wgpu::Trace::Off,
        }))
        .context("Failed to create GPU device")?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            "GPU: {} ({:?}, wireframe: {})",
            adapter_info.name,
            adapter_info.backend,
            wireframe_supported
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
            wireframe_supported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert_eq!(backends(BackendKind::Auto), wgpu::Backends::all());
        assert_eq!(backends(BackendKind::Vulkan), wgpu::Backends::VULKAN);
        assert_eq!(backends(BackendKind::OpenGl), wgpu::Backends::GL);
    }
}
