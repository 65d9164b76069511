//! Virtual render pass
//!
//! Draws and clears accumulate here during the frame and are replayed into
//! a real render pass when the surface flushes (end of frame, or before a
//! framebuffer copy).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use fixedfn_core::{BlendMode, RenderStateSnapshot, TextureHandle, Vertex};

use crate::pipeline::PipelineKey;

/// Fragment is modulated by texture slot 0
pub const FLAG_TEXTURED: u32 = 1 << 0;
/// Alpha test against `params.x` with `modes.y`
pub const FLAG_ALPHA_TEST: u32 = 1 << 1;
/// Slots 0..2 are Y/U/V planes
pub const FLAG_YUV: u32 = 1 << 2;
/// YUV planes are full range
pub const FLAG_FULL_RANGE: u32 = 1 << 3;
/// Texture rows are bottom-up (framebuffer copies)
pub const FLAG_FLIP_V: u32 = 1 << 4;
/// Positions are 640x480 screen coordinates with reciprocal w
pub const FLAG_PRETRANSFORMED: u32 = 1 << 5;

/// Per-draw shader data, indexed by `instance_index`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub transform: [[f32; 4]; 4],
    /// x: alpha reference, y: forced source alpha (negative = vertex alpha)
    pub params: [f32; 4],
    /// x: FLAG_* bits, y: alpha compare function
    pub modes: [u32; 4],
}

impl DrawUniforms {
    pub fn new(state: &RenderStateSnapshot, transform: Mat4, textured: bool, flip_v: bool) -> Self {
        let mut flags = 0;
        if textured {
            flags |= FLAG_TEXTURED;
        }
        if state.alpha_test {
            flags |= FLAG_ALPHA_TEST;
        }
        if state.yuv {
            flags |= FLAG_YUV | FLAG_TEXTURED;
        }
        if state.full_range {
            flags |= FLAG_FULL_RANGE;
        }
        if flip_v {
            flags |= FLAG_FLIP_V;
        }
        if state.pretransformed {
            flags |= FLAG_PRETRANSFORMED;
        }
        Self {
            transform: transform.to_cols_array_2d(),
            params: [state.alpha_ref_normalized(), forced_alpha(state.blend_mode).unwrap_or(-1.0), 0.0, 0.0],
            modes: [flags, state.alpha_func as u32, 0, 0],
        }
    }

    pub fn flags(&self) -> u32 {
        self.modes[0]
    }
}

/// Source alpha the fixed blend modes imply: average mixes half and half,
/// quarter adds a quarter of the incoming color.
pub fn forced_alpha(mode: BlendMode) -> Option<f32> {
    match mode {
        BlendMode::Average => Some(0.5),
        BlendMode::Quarter => Some(0.25),
        _ => None,
    }
}

/// Maps 640x480 screen coordinates to clip space.
pub fn screen_to_clip() -> Mat4 {
    Mat4::from_cols_array(&[
        2.0 / 640.0,
        0.0,
        0.0,
        0.0,
        0.0,
        -2.0 / 480.0,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
        -1.0,
        1.0,
        0.0,
        1.0,
    ])
}

/// Viewport in target pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelViewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub pipeline: PipelineKey,
    pub base_vertex: i32,
    pub first_index: u32,
    pub index_count: u32,
    /// Index into the frame's [`DrawUniforms`]
    pub draw_index: u32,
    pub textures: [TextureHandle; 3],
    pub filtering: bool,
    pub viewport: PixelViewport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Draw(DrawCommand),
    Clear { color: Option<[f64; 4]>, depth: bool },
}

/// Commands plus the geometry and uniforms they reference
#[derive(Debug, Default)]
pub struct CommandBuffer {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    uniforms: Vec<DrawUniforms>,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append geometry and uniforms, returning the (base_vertex,
    /// first_index, draw_index) a draw command should reference.
    pub fn push_geometry(&mut self, vertices: &[Vertex], indices: &[u16], uniforms: DrawUniforms) -> (i32, u32, u32) {
        let base_vertex = self.vertices.len() as i32;
        let first_index = self.indices.len() as u32;
        let draw_index = self.uniforms.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.uniforms.push(uniforms);
        (base_vertex, first_index, draw_index)
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn uniforms(&self) -> &[DrawUniforms] {
        &self.uniforms
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Draw commands that reference `handle` in any slot
    pub fn references(&self, handle: TextureHandle) -> bool {
        self.commands.iter().any(|c| match c {
            Command::Draw(draw) => draw.textures.contains(&handle),
            Command::Clear { .. } => false,
        })
    }

    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uniforms.clear();
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixedfn_core::AlphaFunc;
    use glam::Vec4;

    #[test]
    fn test_draw_uniforms_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 96);
    }

    #[test]
    fn test_screen_to_clip_corners() {
        let m = screen_to_clip();
        let cases = [
            (Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(-1.0, 1.0, 0.0, 1.0)),
            (Vec4::new(640.0, 480.0, 0.5, 1.0), Vec4::new(1.0, -1.0, 0.5, 1.0)),
            (Vec4::new(320.0, 240.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 0.0, 1.0)),
        ];
        for (screen, clip) in cases {
            assert!((m * screen).abs_diff_eq(clip, 1e-6), "{screen} -> {}", m * screen);
        }
    }

    #[test]
    fn test_uniform_flags_from_state() {
        let state = RenderStateSnapshot {
            alpha_test: true,
            alpha_func: AlphaFunc::Greater,
            alpha_ref: 255,
            pretransformed: true,
            blend_mode: BlendMode::Quarter,
            ..Default::default()
        };
        let uniforms = DrawUniforms::new(&state, Mat4::IDENTITY, true, false);
        assert_eq!(uniforms.flags(), FLAG_TEXTURED | FLAG_ALPHA_TEST | FLAG_PRETRANSFORMED);
        assert_eq!(uniforms.modes[1], AlphaFunc::Greater as u32);
        assert_eq!(uniforms.params[0], 1.0);
        assert_eq!(uniforms.params[1], 0.25);
    }

    #[test]
    fn test_yuv_implies_textured() {
        let state = RenderStateSnapshot {
            yuv: true,
            full_range: true,
            ..Default::default()
        };
        let uniforms = DrawUniforms::new(&state, Mat4::IDENTITY, false, true);
        assert_eq!(uniforms.flags(), FLAG_YUV | FLAG_TEXTURED | FLAG_FULL_RANGE | FLAG_FLIP_V);
        assert_eq!(uniforms.params[1], -1.0);
    }

    #[test]
    fn test_push_geometry_offsets() {
        let mut buffer = CommandBuffer::new();
        let tri = [Vertex::default(); 3];
        let uniforms = DrawUniforms::new(&RenderStateSnapshot::default(), Mat4::IDENTITY, false, false);
        assert_eq!(buffer.push_geometry(&tri, &[0, 1, 2], uniforms), (0, 0, 0));
        assert_eq!(buffer.push_geometry(&tri, &[0, 2, 1], uniforms), (3, 3, 1));
        assert_eq!(buffer.vertices().len(), 6);

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.uniforms().is_empty());
    }
}
