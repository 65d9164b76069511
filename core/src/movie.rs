//! Decoded movie frame upload and presentation
//!
//! Frames arrive already decoded, either as packed BGRA or as three YUV
//! planes. Each frame is uploaded as fresh textures and drawn as a
//! full-screen pre-transformed quad. A frame's textures stay alive until
//! the next frame replaces them (or [`MoviePlayer::stop`]), so a backend
//! may defer the actual draw to `end_frame`.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::error::{ConversionError, ResolveError};
use crate::state::RenderStateSnapshot;
use crate::surface::{DrawSurface, TextureKind};
use crate::texture::TextureHandle;
use crate::vertex::Vertex;
use crate::viewport::{GAME_HEIGHT, GAME_WIDTH};

/// One image plane with its row stride in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoviePlane {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

impl MoviePlane {
    pub fn new(data: Vec<u8>, width: u32, height: u32, stride: u32) -> Self {
        Self {
            data,
            width,
            height,
            stride,
        }
    }

    /// Tightly packed rows of `bytes_per_texel`-sized texels.
    pub fn packed(&self, bytes_per_texel: u32) -> Result<Cow<'_, [u8]>, ConversionError> {
        let row = (self.width * bytes_per_texel) as usize;
        let stride = self.stride as usize;
        let height = self.height as usize;
        if stride < row {
            return Err(ConversionError::TruncatedPixelData {
                expected: row,
                actual: stride,
            });
        }

        let expected = if height == 0 { 0 } else { stride * (height - 1) + row };
        if self.data.len() < expected {
            return Err(ConversionError::TruncatedPixelData {
                expected,
                actual: self.data.len(),
            });
        }

        if stride == row {
            return Ok(Cow::Borrowed(&self.data[..row * height]));
        }
        let mut packed = Vec::with_capacity(row * height);
        for y in 0..height {
            packed.extend_from_slice(&self.data[y * stride..y * stride + row]);
        }
        Ok(Cow::Owned(packed))
    }
}

/// A decoded movie frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieFrame {
    Bgra(MoviePlane),
    Yuv {
        y: MoviePlane,
        u: MoviePlane,
        v: MoviePlane,
        /// Full (0-255) range instead of video range
        full_range: bool,
    },
}

impl MovieFrame {
    fn planes(&self) -> SmallVec<[(&MoviePlane, TextureKind); 3]> {
        match self {
            MovieFrame::Bgra(plane) => smallvec::smallvec![(plane, TextureKind::Bgra)],
            MovieFrame::Yuv { y, u, v, .. } => {
                smallvec::smallvec![(y, TextureKind::Y), (u, TextureKind::U), (v, TextureKind::V)]
            }
        }
    }

    fn state(&self, texture: TextureHandle) -> RenderStateSnapshot {
        let (yuv, full_range) = match self {
            MovieFrame::Bgra(_) => (false, false),
            MovieFrame::Yuv { full_range, .. } => (true, *full_range),
        };
        RenderStateSnapshot {
            texture: Some(texture),
            pretransformed: true,
            texture_filtering: true,
            yuv,
            full_range,
            ..Default::default()
        }
    }
}

/// Full-screen quad in 640x480 screen coordinates.
pub fn fullscreen_quad() -> ([Vertex; 4], [u16; 6]) {
    let white = 0xFFFF_FFFF;
    let vertices = [
        Vertex::new([0.0, 0.0, 0.0], white, [0.0, 0.0]),
        Vertex::new([GAME_WIDTH, 0.0, 0.0], white, [1.0, 0.0]),
        Vertex::new([GAME_WIDTH, GAME_HEIGHT, 0.0], white, [1.0, 1.0]),
        Vertex::new([0.0, GAME_HEIGHT, 0.0], white, [0.0, 1.0]),
    ];
    (vertices, [0, 1, 2, 0, 2, 3])
}

/// Uploads and draws movie frames, owning the current frame's textures
#[derive(Debug, Default)]
pub struct MoviePlayer {
    handles: SmallVec<[TextureHandle; 3]>,
}

impl MoviePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `frame`, bind its planes to slots 0..2 and draw it.
    ///
    /// The previous frame's textures are destroyed once the new ones exist.
    /// On failure nothing is drawn and the previous frame stays current.
    pub fn present<S: DrawSurface + ?Sized>(&mut self, surface: &mut S, frame: &MovieFrame) -> Result<(), ResolveError> {
        let mut created: SmallVec<[TextureHandle; 3]> = SmallVec::new();
        for (plane, kind) in frame.planes() {
            let uploaded = plane
                .packed(kind.bytes_per_texel())
                .map_err(ResolveError::from)
                .and_then(|pixels| {
                    surface
                        .create_texture(&pixels, plane.width, plane.height, kind)
                        .map_err(ResolveError::Backend)
                });
            match uploaded {
                Ok(handle) => created.push(handle),
                Err(e) => {
                    tracing::warn!("movie frame upload failed: {}", e);
                    for handle in created {
                        surface.destroy_texture(handle);
                    }
                    return Err(e);
                }
            }
        }

        for handle in std::mem::replace(&mut self.handles, created) {
            surface.destroy_texture(handle);
        }

        let (vertices, indices) = fullscreen_quad();
        surface.set_state(&frame.state(self.handles[0]));
        for (slot, handle) in self.handles.iter().enumerate() {
            surface.bind_texture(*handle, slot as u32);
        }
        surface.set_vertex_data(&vertices);
        surface.set_index_data(&indices);
        surface.submit_draw();
        tracing::trace!("presented movie frame ({} planes)", self.handles.len());
        Ok(())
    }

    /// Release the current frame's textures.
    pub fn stop<S: DrawSurface + ?Sized>(&mut self, surface: &mut S) {
        for handle in self.handles.drain(..) {
            surface.destroy_texture(handle);
        }
    }

    pub fn current(&self) -> &[TextureHandle] {
        &self.handles
    }
}
