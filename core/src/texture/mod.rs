//! Texture sources, handles and the per-palette texture cache

mod cache;
mod source;

pub use cache::TextureCache;
pub use source::{Palette, SourceId, TextureSource};

/// Handle to a texture owned by a [`DrawSurface`](crate::DrawSurface)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Invalid/null texture handle
    pub const INVALID: TextureHandle = TextureHandle(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::INVALID
    }
}
