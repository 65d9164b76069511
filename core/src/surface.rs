//! Backend draw surface contract
//!
//! The engine never talks to a graphics API directly. Everything it draws
//! goes through a [`DrawSurface`], so backends can be swapped without
//! touching translation or scheduling.

use glam::Mat4;

use crate::state::RenderStateSnapshot;
use crate::texture::TextureHandle;
use crate::vertex::Vertex;

/// Content type of a committed texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TextureKind {
    /// Packed BGRA8 color
    #[default]
    Bgra = 0,
    /// Luma plane of a YUV movie frame
    Y = 1,
    /// Blue-difference chroma plane
    U = 2,
    /// Red-difference chroma plane
    V = 3,
}

impl TextureKind {
    /// Bytes per texel in the data handed to `create_texture`.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureKind::Bgra => 4,
            TextureKind::Y | TextureKind::U | TextureKind::V => 1,
        }
    }
}

/// Viewport rectangle in window pixels, origin at the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Capability set a rendering backend exposes to the engine.
///
/// Draw submission is stateful: `set_state`, `bind_texture`,
/// `set_vertex_data` and `set_index_data` stage the next draw and
/// `submit_draw` consumes it.
pub trait DrawSurface {
    /// Start recording a frame.
    fn begin_frame(&mut self);

    /// Finish and present the frame. Framebuffer textures handed out by
    /// [`framebuffer_texture`](Self::framebuffer_texture) are released here.
    fn end_frame(&mut self);

    fn set_state(&mut self, state: &RenderStateSnapshot);

    fn bind_texture(&mut self, handle: TextureHandle, slot: u32);

    fn set_vertex_data(&mut self, vertices: &[Vertex]);

    fn set_index_data(&mut self, indices: &[u16]);

    /// Draw the staged vertex/index data with the staged state.
    fn submit_draw(&mut self);

    /// Upload a texture. `pixels` holds `width * height` texels of `kind`.
    fn create_texture(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        kind: TextureKind,
    ) -> anyhow::Result<TextureHandle>;

    fn destroy_texture(&mut self, handle: TextureHandle);

    /// Render-target sized texture backing a framebuffer source, valid
    /// until the end of the current frame.
    fn framebuffer_texture(&mut self, width: u32, height: u32) -> anyhow::Result<TextureHandle>;

    /// World-view transform applied to non-TL vertices of following draws.
    fn set_world_view(&mut self, _matrix: &Mat4) {}

    /// Projection applied to non-TL vertices of following draws.
    fn set_projection(&mut self, _matrix: &Mat4) {}

    /// Emulated legacy viewport transform.
    fn set_d3d_view(&mut self, _matrix: &Mat4) {}

    fn set_viewport(&mut self, _rect: ViewportRect) {}

    fn set_clear_color(&mut self, _rgb: [u8; 3]) {}

    /// Request a clear of color and/or depth before following draws.
    fn clear(&mut self, _color: bool, _depth: bool) {}
}
