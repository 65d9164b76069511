//! Shared test utilities for unit and integration tests

use glam::Mat4;

use crate::state::RenderStateSnapshot;
use crate::surface::{DrawSurface, TextureKind, ViewportRect};
use crate::texture::TextureHandle;
use crate::vertex::Vertex;

/// Everything a [`RecordingSurface`] was asked to do, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    BeginFrame,
    EndFrame,
    SetState(RenderStateSnapshot),
    BindTexture(TextureHandle, u32),
    SetVertexData(Vec<Vertex>),
    SetIndexData(Vec<u16>),
    SubmitDraw,
    CreateTexture(TextureHandle, TextureKind),
    DestroyTexture(TextureHandle),
    FramebufferTexture(u32, u32),
    SetWorldView(Mat4),
    SetProjection(Mat4),
    SetD3dView(Mat4),
    SetViewport(ViewportRect),
    SetClearColor([u8; 3]),
    Clear(bool, bool),
}

/// Texture upload captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub handle: TextureHandle,
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
}

/// Draw captured at `submit_draw` time with the state staged for it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub state: Option<RenderStateSnapshot>,
    pub textures: [TextureHandle; 3],
    pub world_view: Option<Mat4>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

/// Test draw surface that records calls instead of rendering
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
    pub uploads: Vec<Upload>,
    pub draws: Vec<RecordedDraw>,
    /// Make every `create_texture` fail
    pub fail_creates: bool,
    next_handle: u32,
    live: Vec<TextureHandle>,
    staged: RecordedDraw,
}

impl Default for RecordedDraw {
    fn default() -> Self {
        Self {
            state: None,
            textures: [TextureHandle::INVALID; 3],
            world_view: None,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> TextureHandle {
        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        self.live.push(handle);
        handle
    }

    pub fn created_textures(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::CreateTexture(..)))
            .count()
    }

    pub fn destroyed(&self) -> Vec<TextureHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::DestroyTexture(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn live_textures(&self) -> usize {
        self.live.len()
    }

    pub fn last_upload(&self) -> Option<&Upload> {
        self.uploads.last()
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_frame(&mut self) {
        self.calls.push(SurfaceCall::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.calls.push(SurfaceCall::EndFrame);
    }

    fn set_state(&mut self, state: &RenderStateSnapshot) {
        self.staged.state = Some(*state);
        self.calls.push(SurfaceCall::SetState(*state));
    }

    fn bind_texture(&mut self, handle: TextureHandle, slot: u32) {
        if let Some(t) = self.staged.textures.get_mut(slot as usize) {
            *t = handle;
        }
        self.calls.push(SurfaceCall::BindTexture(handle, slot));
    }

    fn set_vertex_data(&mut self, vertices: &[Vertex]) {
        self.staged.vertices = vertices.to_vec();
        self.calls.push(SurfaceCall::SetVertexData(vertices.to_vec()));
    }

    fn set_index_data(&mut self, indices: &[u16]) {
        self.staged.indices = indices.to_vec();
        self.calls.push(SurfaceCall::SetIndexData(indices.to_vec()));
    }

    fn submit_draw(&mut self) {
        self.draws.push(self.staged.clone());
        self.calls.push(SurfaceCall::SubmitDraw);
    }

    fn create_texture(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        kind: TextureKind,
    ) -> anyhow::Result<TextureHandle> {
        if self.fail_creates {
            anyhow::bail!("texture creation disabled");
        }
        let handle = self.allocate();
        self.uploads.push(Upload {
            handle,
            pixels: pixels.to_vec(),
            width,
            height,
            kind,
        });
        self.calls.push(SurfaceCall::CreateTexture(handle, kind));
        Ok(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.live.retain(|&h| h != handle);
        self.calls.push(SurfaceCall::DestroyTexture(handle));
    }

    fn framebuffer_texture(&mut self, width: u32, height: u32) -> anyhow::Result<TextureHandle> {
        self.next_handle += 1;
        self.calls.push(SurfaceCall::FramebufferTexture(width, height));
        Ok(TextureHandle(self.next_handle))
    }

    fn set_world_view(&mut self, matrix: &Mat4) {
        self.staged.world_view = Some(*matrix);
        self.calls.push(SurfaceCall::SetWorldView(*matrix));
    }

    fn set_projection(&mut self, matrix: &Mat4) {
        self.calls.push(SurfaceCall::SetProjection(*matrix));
    }

    fn set_d3d_view(&mut self, matrix: &Mat4) {
        self.calls.push(SurfaceCall::SetD3dView(*matrix));
    }

    fn set_viewport(&mut self, rect: ViewportRect) {
        self.calls.push(SurfaceCall::SetViewport(rect));
    }

    fn set_clear_color(&mut self, rgb: [u8; 3]) {
        self.calls.push(SurfaceCall::SetClearColor(rgb));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.calls.push(SurfaceCall::Clear(color, depth));
    }
}
