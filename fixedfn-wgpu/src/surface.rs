//! wgpu implementation of [`DrawSurface`]
//!
//! Renders into an offscreen target (color + depth) sized like the
//! configured window. Draws are recorded into a [`CommandBuffer`] and
//! replayed at the end of the frame, or earlier when the engine asks for a
//! copy of the framebuffer.

use std::num::NonZeroU64;
use std::path::Path;

use anyhow::Result;
use glam::Mat4;
use hashbrown::HashMap;

use fixedfn_core::{
    DrawSurface, InternalResolution, RenderStateSnapshot, TextureHandle, TextureKind, Vertex, VideoConfig,
    ViewportRect,
};

use crate::buffer::GrowableBuffer;
use crate::capture;
use crate::command_buffer::{Command, CommandBuffer, DrawCommand, DrawUniforms, PixelViewport, screen_to_clip};
use crate::device::GpuContext;
use crate::pipeline::{DEPTH_FORMAT, PipelineCache, PipelineKey, TEXTURE_SLOTS};
use crate::texture_manager::TextureManager;

/// Color format of the offscreen render target
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct RenderTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Render Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Render Target Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            width,
            height,
        }
    }
}

/// Draw state staged by `set_state`/`bind_texture`/`set_*_data`
#[derive(Default)]
struct StagedDraw {
    state: RenderStateSnapshot,
    textures: [TextureHandle; TEXTURE_SLOTS as usize],
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

/// Counters for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draws recorded
    pub draws: u32,
    /// Command buffer replays (end of frame plus framebuffer copies)
    pub flushes: u32,
    /// Draws discarded (outside a frame, empty, or zero-area viewport)
    pub dropped: u32,
}

pub struct WgpuSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    resolution: InternalResolution,
    target: RenderTarget,
    textures: TextureManager,
    pipelines: PipelineCache,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    vertex_buffer: GrowableBuffer,
    index_buffer: GrowableBuffer,
    uniform_buffer: GrowableBuffer,
    commands: CommandBuffer,
    staged: StagedDraw,
    world_view: Mat4,
    projection: Mat4,
    d3d_view: Mat4,
    viewport: ViewportRect,
    clear_color: [u8; 3],
    wireframe_supported: bool,
    warned_wireframe: bool,
    /// Textures still referenced by recorded commands
    pending_destroy: Vec<TextureHandle>,
    in_frame: bool,
    stats: FrameStats,
    frame_count: u64,
}

fn create_sampler(device: &wgpu::Device, filter: wgpu::FilterMode, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn draw_commands(commands: &[Command]) -> impl Iterator<Item = &DrawCommand> {
    commands.iter().filter_map(|c| match c {
        Command::Draw(draw) => Some(draw),
        Command::Clear { .. } => None,
    })
}

/// Clamp a top-left-origin rectangle into a `width` x `height` target.
fn clamp_viewport(x: f32, y: f32, w: f32, h: f32, width: u32, height: u32) -> PixelViewport {
    let (tw, th) = (width as f32, height as f32);
    let cx = x.clamp(0.0, tw);
    let cy = y.clamp(0.0, th);
    PixelViewport {
        x: cx,
        y: cy,
        width: (x + w).min(tw) - cx,
        height: (y + h).min(th) - cy,
    }
}

impl WgpuSurface {
    /// Open a headless device for `video.backend` and build a surface on it.
    pub fn headless(video: &VideoConfig) -> Result<Self> {
        let gpu = GpuContext::headless(video.backend_kind())?;
        Self::new(gpu, video)
    }

    pub fn new(gpu: GpuContext, video: &VideoConfig) -> Result<Self> {
        let GpuContext {
            device,
            queue,
            wireframe_supported,
            ..
        } = gpu;
        let resolution = InternalResolution::from_config(video);
        let target = RenderTarget::new(&device, video.width.max(1), video.height.max(1));
        let textures = TextureManager::new(&device, &queue)?;
        let pipelines = PipelineCache::new(&device, TARGET_FORMAT);

        tracing::info!(
            "wgpu surface: {}x{} target, {}x{} view at x={}",
            target.width,
            target.height,
            resolution.view_width,
            resolution.view_height,
            resolution.offset_x
        );

        Ok(Self {
            nearest_sampler: create_sampler(&device, wgpu::FilterMode::Nearest, "Nearest Sampler"),
            linear_sampler: create_sampler(&device, wgpu::FilterMode::Linear, "Linear Sampler"),
            vertex_buffer: GrowableBuffer::new(&device, wgpu::BufferUsages::VERTEX, "Vertex Buffer"),
            index_buffer: GrowableBuffer::new(&device, wgpu::BufferUsages::INDEX, "Index Buffer"),
            uniform_buffer: GrowableBuffer::new(&device, wgpu::BufferUsages::STORAGE, "Draw Uniforms"),
            commands: CommandBuffer::new(),
            staged: StagedDraw::default(),
            world_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            d3d_view: Mat4::IDENTITY,
            viewport: ViewportRect {
                x: 0,
                y: 0,
                width: resolution.view_width as u32,
                height: resolution.view_height as u32,
            },
            clear_color: [0, 0, 0],
            wireframe_supported,
            warned_wireframe: false,
            pending_destroy: Vec::new(),
            in_frame: false,
            stats: FrameStats::default(),
            frame_count: 0,
            device,
            queue,
            resolution,
            target,
            textures,
            pipelines,
        })
    }

    /// The whole 4:3 (or stretched) view, where TL geometry lands.
    fn full_view(&self) -> PixelViewport {
        let res = &self.resolution;
        clamp_viewport(
            res.offset_x,
            0.0,
            res.view_width,
            res.view_height,
            self.target.width,
            self.target.height,
        )
    }

    /// Convert a bottom-left-origin view rectangle to target pixels.
    fn pixel_viewport(&self, rect: ViewportRect) -> PixelViewport {
        let top = self.target.height as f32 - (rect.y as f32 + rect.height as f32);
        clamp_viewport(
            rect.x as f32 + self.resolution.offset_x,
            top,
            rect.width as f32,
            rect.height as f32,
            self.target.width,
            self.target.height,
        )
    }

    /// Replay recorded commands into the render target.
    fn flush(&mut self) {
        if self.commands.is_empty() {
            self.destroy_pending();
            return;
        }

        let device = &self.device;
        let queue = &self.queue;

        self.vertex_buffer.reset();
        self.index_buffer.reset();
        self.uniform_buffer.reset();
        if !self.commands.vertices().is_empty() {
            self.vertex_buffer
                .upload(device, queue, bytemuck::cast_slice(self.commands.vertices()));
            self.index_buffer
                .upload(device, queue, bytemuck::cast_slice(self.commands.indices()));
            self.uniform_buffer
                .upload(device, queue, bytemuck::cast_slice(self.commands.uniforms()));
        }

        let uniform_bytes = std::mem::size_of_val(self.commands.uniforms()) as u64;
        let frame_bind_group = NonZeroU64::new(uniform_bytes).map(|size| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Frame Bind Group"),
                layout: self.pipelines.frame_layout(),
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: self.uniform_buffer.buffer(),
                        offset: 0,
                        size: Some(size),
                    }),
                }],
            })
        });

        for draw in draw_commands(self.commands.commands()) {
            self.pipelines.get_or_create(device, draw.pipeline);
        }

        let mut texture_groups: HashMap<([TextureHandle; TEXTURE_SLOTS as usize], bool), wgpu::BindGroup> =
            HashMap::new();
        for draw in draw_commands(self.commands.commands()) {
            texture_groups.entry((draw.textures, draw.filtering)).or_insert_with(|| {
                let sampler = if draw.filtering {
                    &self.linear_sampler
                } else {
                    &self.nearest_sampler
                };
                let views = draw.textures.map(|handle| self.textures.view_or_fallback(handle));
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Texture Bind Group"),
                    layout: self.pipelines.texture_layout(),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(views[0]),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(views[1]),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(views[2]),
                        },
                        wgpu::BindGroupEntry {
                            binding: TEXTURE_SLOTS,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                })
            });
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        let commands = self.commands.commands();
        let mut start = 0;
        while start < commands.len() {
            // A clear opens a new pass; draws load what is already there.
            let (color_load, depth_load) = match commands[start] {
                Command::Clear { color, depth } => {
                    start += 1;
                    (
                        color.map_or(wgpu::LoadOp::Load, |[r, g, b, a]| {
                            wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
                        }),
                        if depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load },
                    )
                }
                Command::Draw(_) => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
            };
            let end = commands[start..]
                .iter()
                .position(|c| matches!(c, Command::Clear { .. }))
                .map_or(commands.len(), |p| start + p);

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(frame_bind_group) = &frame_bind_group {
                pass.set_vertex_buffer(0, self.vertex_buffer.buffer().slice(..));
                pass.set_index_buffer(self.index_buffer.buffer().slice(..), wgpu::IndexFormat::Uint16);
                pass.set_bind_group(0, frame_bind_group, &[]);

                for command in &commands[start..end] {
                    let Command::Draw(draw) = command else { continue };
                    let (Some(pipeline), Some(textures)) = (
                        self.pipelines.get(&draw.pipeline),
                        texture_groups.get(&(draw.textures, draw.filtering)),
                    ) else {
                        continue;
                    };
                    let v = draw.viewport;
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(1, textures, &[]);
                    pass.set_viewport(v.x, v.y, v.width, v.height, 0.0, 1.0);
                    pass.draw_indexed(
                        draw.first_index..draw.first_index + draw.index_count,
                        draw.base_vertex,
                        draw.draw_index..draw.draw_index + 1,
                    );
                }
            }
            drop(pass);
            start = end;
        }

        queue.submit(std::iter::once(encoder.finish()));
        self.commands.reset();
        self.stats.flushes += 1;
        self.destroy_pending();
    }

    fn destroy_pending(&mut self) {
        for handle in self.pending_destroy.drain(..) {
            self.textures.destroy(handle);
        }
    }

    /// Read the render target back as an RGBA image.
    ///
    /// Recorded commands are flushed first, so this also works mid-frame.
    pub fn read_pixels(&mut self) -> Result<image::RgbaImage> {
        self.flush();
        let (width, height) = (self.target.width, self.target.height);
        let pixels = capture::read_texture_pixels(&self.device, &self.queue, &self.target.color, width, height)?;
        capture::to_rgba_image(pixels, width, height, TARGET_FORMAT)
    }

    /// Read the render target back and write it to `path` as PNG.
    pub fn save_png(&mut self, path: &Path) -> Result<()> {
        let image = self.read_pixels()?;
        capture::save_png(&image, path)
    }

    pub fn resolution(&self) -> &InternalResolution {
        &self.resolution
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    /// Counters of the current (or last finished) frame
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Frames finished so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Live engine textures (framebuffer copies included)
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.textures.dimensions(handle)
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn wireframe_supported(&self) -> bool {
        self.wireframe_supported
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl DrawSurface for WgpuSurface {
    fn begin_frame(&mut self) {
        if self.in_frame {
            tracing::warn!(
                "begin_frame while a frame is open; discarding {} commands",
                self.commands.commands().len()
            );
        }
        self.commands.reset();
        self.destroy_pending();
        self.stats = FrameStats::default();
        self.in_frame = true;
    }

    fn end_frame(&mut self) {
        if !self.in_frame {
            tracing::warn!("end_frame without begin_frame");
        }
        self.flush();
        self.textures.release_framebuffers();
        self.in_frame = false;
        self.frame_count += 1;
        tracing::trace!(
            "frame {}: {} draws, {} flushes, {} dropped",
            self.frame_count,
            self.stats.draws,
            self.stats.flushes,
            self.stats.dropped
        );
    }

    fn set_state(&mut self, state: &RenderStateSnapshot) {
        if state.wireframe && !self.wireframe_supported && !self.warned_wireframe {
            tracing::warn!("wireframe requested but POLYGON_MODE_LINE is unavailable; drawing filled");
            self.warned_wireframe = true;
        }
        self.staged.state = *state;
    }

    fn bind_texture(&mut self, handle: TextureHandle, slot: u32) {
        match self.staged.textures.get_mut(slot as usize) {
            Some(bound) => *bound = handle,
            None => tracing::warn!("texture slot {} out of range", slot),
        }
    }

    fn set_vertex_data(&mut self, vertices: &[Vertex]) {
        self.staged.vertices.clear();
        self.staged.vertices.extend_from_slice(vertices);
    }

    fn set_index_data(&mut self, indices: &[u16]) {
        self.staged.indices.clear();
        self.staged.indices.extend_from_slice(indices);
    }

    fn submit_draw(&mut self) {
        let mut vertices = std::mem::take(&mut self.staged.vertices);
        let mut indices = std::mem::take(&mut self.staged.indices);
        if !self.in_frame || vertices.is_empty() || indices.is_empty() {
            if !self.in_frame {
                tracing::warn!("draw outside a frame dropped");
            }
            self.stats.dropped += 1;
            return;
        }

        let state = self.staged.state;
        let (transform, viewport) = if state.pretransformed {
            (screen_to_clip(), self.full_view())
        } else {
            (
                self.d3d_view * self.projection * self.world_view,
                self.pixel_viewport(self.viewport),
            )
        };
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            tracing::trace!("draw with empty viewport skipped");
            self.stats.dropped += 1;
            return;
        }

        let textures = self.staged.textures;
        let textured = state.texture.is_some() && self.textures.get_texture_view(textures[0]).is_some();
        let uniforms = DrawUniforms::new(&state, transform, textured, state.framebuffer_texture);
        let (base_vertex, first_index, draw_index) = self.commands.push_geometry(&vertices, &indices, uniforms);
        self.commands.push(Command::Draw(DrawCommand {
            pipeline: PipelineKey::new(&state, self.wireframe_supported),
            base_vertex,
            first_index,
            index_count: indices.len() as u32,
            draw_index,
            textures,
            filtering: state.texture_filtering,
            viewport,
        }));
        self.stats.draws += 1;

        vertices.clear();
        indices.clear();
        self.staged.vertices = vertices;
        self.staged.indices = indices;
    }

    fn create_texture(&mut self, pixels: &[u8], width: u32, height: u32, kind: TextureKind) -> Result<TextureHandle> {
        self.textures.create(&self.device, &self.queue, pixels, width, height, kind)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        if self.commands.references(handle) {
            self.pending_destroy.push(handle);
        } else {
            self.textures.destroy(handle);
        }
    }

    fn framebuffer_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle> {
        // the copy must see everything drawn so far
        self.flush();

        let origin_x = self.resolution.offset_x.max(0.0) as u32;
        let available = self.target.width.saturating_sub(origin_x);
        if available == 0 {
            anyhow::bail!("Framebuffer copy origin {} is outside the target", origin_x);
        }
        let copy_width = (self.resolution.internal_x(width as f32) as u32).clamp(1, available);
        let copy_height = (self.resolution.internal_y(height as f32) as u32).clamp(1, self.target.height);

        let (handle, texture) = self
            .textures
            .create_framebuffer(&self.device, copy_width, copy_height, TARGET_FORMAT);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Framebuffer Copy Encoder"),
        });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.color,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: origin_x,
                    y: 0,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: copy_width,
                height: copy_height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(handle)
    }

    fn set_world_view(&mut self, matrix: &Mat4) {
        self.world_view = *matrix;
    }

    fn set_projection(&mut self, matrix: &Mat4) {
        self.projection = *matrix;
    }

    fn set_d3d_view(&mut self, matrix: &Mat4) {
        self.d3d_view = *matrix;
    }

    fn set_viewport(&mut self, rect: ViewportRect) {
        self.viewport = rect;
    }

    fn set_clear_color(&mut self, rgb: [u8; 3]) {
        self.clear_color = rgb;
    }

    fn clear(&mut self, color: bool, depth: bool) {
        if !self.in_frame {
            tracing::warn!("clear outside a frame ignored");
            return;
        }
        if !color && !depth {
            return;
        }
        let [r, g, b] = self.clear_color.map(|c| f64::from(c) / 255.0);
        self.commands.push(Command::Clear {
            color: color.then_some([r, g, b, 1.0]),
            depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_viewport_inside() {
        let v = clamp_viewport(10.0, 20.0, 100.0, 50.0, 640, 480);
        assert_eq!(
            v,
            PixelViewport {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn test_clamp_viewport_overhang() {
        let v = clamp_viewport(-20.0, 400.0, 100.0, 200.0, 640, 480);
        assert_eq!(v.x, 0.0);
        assert_eq!(v.width, 80.0);
        assert_eq!(v.y, 400.0);
        assert_eq!(v.height, 80.0);

        let outside = clamp_viewport(700.0, 0.0, 10.0, 10.0, 640, 480);
        assert_eq!(outside.width, 0.0);
    }
}
