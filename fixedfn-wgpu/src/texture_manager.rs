//! Texture management for the wgpu surface.
//!
//! Owns every texture the engine has committed, the white fallback bound
//! to empty slots, and the per-frame framebuffer copies.

use hashbrown::HashMap;

use anyhow::Result;
use wgpu::util::DeviceExt;

use fixedfn_core::{TextureHandle, TextureKind};

/// Internal texture data
pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    /// Copy of the render target, released at the end of the frame
    pub framebuffer: bool,
}

/// wgpu format holding texels of `kind`
pub fn texture_format(kind: TextureKind) -> wgpu::TextureFormat {
    match kind {
        TextureKind::Bgra => wgpu::TextureFormat::Bgra8Unorm,
        TextureKind::Y | TextureKind::U | TextureKind::V => wgpu::TextureFormat::R8Unorm,
    }
}

/// Handle-indexed texture storage
pub struct TextureManager {
    textures: HashMap<u32, TextureEntry>,
    next_texture_id: u32,
    memory_used: usize,
    fallback_white: TextureHandle,
}

impl TextureManager {
    /// Create the manager and its 1x1 white fallback texture.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self> {
        let mut manager = Self {
            textures: HashMap::new(),
            next_texture_id: 1, // 0 is TextureHandle::INVALID
            memory_used: 0,
            fallback_white: TextureHandle::INVALID,
        };
        manager.fallback_white = manager
            .create(device, queue, &[255, 255, 255, 255], 1, 1, TextureKind::Bgra)
            .map_err(|e| anyhow::anyhow!("Failed to create white fallback texture: {}", e))?;
        Ok(manager)
    }

    /// Upload `pixels` (`width * height` texels of `kind`) as a new texture.
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        kind: TextureKind,
    ) -> Result<TextureHandle> {
        if width == 0 || height == 0 {
            anyhow::bail!("Texture dimensions must be non-zero: {}x{}", width, height);
        }
        let expected_size = (width * height * kind.bytes_per_texel()) as usize;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Pixel data size mismatch: expected {} bytes, got {}",
                expected_size,
                pixels.len()
            );
        }

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Engine Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(kind),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels,
        );

        let handle = self.insert(texture, width, height, expected_size, false);
        tracing::debug!(
            "Loaded {:?} texture {}: {}x{}, {} bytes (total {})",
            kind,
            handle.0,
            width,
            height,
            expected_size,
            self.memory_used
        );
        Ok(handle)
    }

    /// Allocate an empty texture to receive a copy of the render target.
    pub fn create_framebuffer(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (TextureHandle, &wgpu::Texture) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Framebuffer Copy"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let handle = self.insert(texture, width, height, (width * height * 4) as usize, true);
        tracing::trace!("framebuffer copy {}: {}x{}", handle.0, width, height);
        let texture = &self.textures[&handle.0].texture;
        (handle, texture)
    }

    fn insert(
        &mut self,
        texture: wgpu::Texture,
        width: u32,
        height: u32,
        size_bytes: usize,
        framebuffer: bool,
    ) -> TextureHandle {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = TextureHandle(self.next_texture_id);
        self.next_texture_id += 1;
        self.memory_used += size_bytes;
        self.textures.insert(
            handle.0,
            TextureEntry {
                texture,
                view,
                width,
                height,
                size_bytes,
                framebuffer,
            },
        );
        handle
    }

    /// Release a texture. Unknown handles and the fallback are ignored.
    pub fn destroy(&mut self, handle: TextureHandle) {
        if handle == self.fallback_white {
            return;
        }
        match self.textures.remove(&handle.0) {
            Some(entry) => {
                self.memory_used -= entry.size_bytes;
                entry.texture.destroy();
            }
            None => tracing::warn!("destroy of unknown texture {}", handle.0),
        }
    }

    /// Release every framebuffer copy.
    pub fn release_framebuffers(&mut self) {
        let stale: Vec<u32> = self
            .textures
            .iter()
            .filter(|(_, entry)| entry.framebuffer)
            .map(|(&id, _)| id)
            .collect();
        for id in stale {
            self.destroy(TextureHandle(id));
        }
    }

    pub fn is_framebuffer(&self, handle: TextureHandle) -> bool {
        self.textures.get(&handle.0).is_some_and(|entry| entry.framebuffer)
    }

    pub fn get_texture_view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&handle.0).map(|t| &t.view)
    }

    /// View for `handle`, or the white fallback for invalid/unknown handles.
    pub fn view_or_fallback(&self, handle: TextureHandle) -> &wgpu::TextureView {
        self.get_texture_view(handle)
            .unwrap_or_else(|| &self.textures[&self.fallback_white.0].view)
    }

    pub fn dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&handle.0).map(|t| (t.width, t.height))
    }

    pub fn white_texture(&self) -> TextureHandle {
        self.fallback_white
    }

    /// Live textures, excluding the fallback.
    pub fn len(&self) -> usize {
        self.textures.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of texel storage currently allocated
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }
}
