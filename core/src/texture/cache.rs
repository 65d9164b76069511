//! Per-palette texture cache
//!
//! Each source image owns one backend texture per palette. Entries are
//! sized when first seen and rebuilt when the source's palette count no
//! longer matches, which is how reloaded palette data is detected.

use hashbrown::HashMap;

use crate::error::ResolveError;
use crate::pixel::{ConvertOptions, convert};
use crate::surface::{DrawSurface, TextureKind};

use super::TextureHandle;
use super::source::{SourceId, TextureSource};

/// Cached textures of one source
#[derive(Debug)]
struct CacheEntry {
    /// Palette slots this entry was sized for
    capacity: u32,
    /// Live handle per palette index
    handles: HashMap<u32, TextureHandle>,
    /// Palette last selected by the host
    selected: Option<u32>,
}

impl CacheEntry {
    fn new(palette_count: u32) -> Self {
        Self {
            capacity: capacity_for(palette_count),
            handles: HashMap::new(),
            selected: None,
        }
    }

    /// Whether this entry was built for a different palette count.
    fn is_stale(&self, palette_count: u32) -> bool {
        self.capacity != palette_count * 2 && !(palette_count == 0 && self.capacity == 1)
    }
}

/// Room for twice the known palettes; the host may add more later.
fn capacity_for(palette_count: u32) -> u32 {
    if palette_count > 0 {
        palette_count * 2
    } else {
        1
    }
}

/// Texture cache keyed by (source, palette index).
///
/// Invariant: at most one live backend handle per (source, palette).
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<SourceId, CacheEntry>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the texture for `source` with the requested palette,
    /// converting and uploading it on a cache miss.
    ///
    /// `requested_palette` of `None` reuses the palette the host selected
    /// last (0 if none). Sources without palettes always use index 0.
    pub fn resolve<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        source: &TextureSource,
        requested_palette: Option<u32>,
    ) -> Result<TextureHandle, ResolveError> {
        let palette_count = source.palette_count();

        if self
            .entries
            .get(&source.id)
            .is_some_and(|entry| entry.is_stale(palette_count))
        {
            tracing::debug!(
                "Palette count of {} changed to {}, rebuilding",
                source.name,
                palette_count
            );
            self.unload(surface, source.id);
        }

        let entry = self
            .entries
            .entry(source.id)
            .or_insert_with(|| CacheEntry::new(palette_count));

        if source.framebuffer {
            tracing::trace!("Framebuffer {} {}x{}", source.name, source.width, source.height);
            return surface
                .framebuffer_texture(source.width, source.height)
                .map_err(ResolveError::Backend);
        }

        let palette_index = if palette_count > 0 {
            requested_palette.or(entry.selected).unwrap_or(0)
        } else {
            0
        };
        if palette_index >= entry.capacity {
            return Err(ResolveError::PaletteSlotOutOfRange {
                index: palette_index,
                capacity: entry.capacity,
            });
        }
        entry.selected = Some(palette_index);

        if let Some(&handle) = entry.handles.get(&palette_index) {
            return Ok(handle);
        }

        let options = ConvertOptions {
            palette_index,
            color_key: source.color_key_for(palette_index),
            reference_alpha: source.reference_alpha,
        };
        let image = convert(source, &options)?;

        let handle = surface
            .create_texture(image.as_bytes(), image.width(), image.height(), TextureKind::Bgra)
            .map_err(ResolveError::Backend)?;

        if let Some(previous) = entry.handles.insert(palette_index, handle) {
            surface.destroy_texture(previous);
        }

        tracing::debug!(
            "Loaded {}[{}] as texture {}: {}x{}",
            source.name,
            palette_index,
            handle.0,
            image.width(),
            image.height()
        );

        Ok(handle)
    }

    /// Remember the palette the host switched `source` to.
    pub fn select_palette(&mut self, source: SourceId, palette_index: u32) {
        if let Some(entry) = self.entries.get_mut(&source) {
            entry.selected = Some(palette_index);
        }
    }

    /// Palette index last selected for `source`.
    pub fn selected_palette(&self, source: SourceId) -> Option<u32> {
        self.entries.get(&source).and_then(|entry| entry.selected)
    }

    /// Drop the texture of one palette so the next resolve reconverts it.
    pub fn invalidate_palette<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        source: SourceId,
        palette_index: u32,
    ) {
        if let Some(handle) = self
            .entries
            .get_mut(&source)
            .and_then(|entry| entry.handles.remove(&palette_index))
        {
            surface.destroy_texture(handle);
        }
    }

    /// Destroy every texture of `source` and forget it.
    pub fn unload<S: DrawSurface + ?Sized>(&mut self, surface: &mut S, source: SourceId) {
        if let Some(entry) = self.entries.remove(&source) {
            for (_, handle) in entry.handles {
                surface.destroy_texture(handle);
            }
        }
    }

    /// Destroy every cached texture.
    pub fn shutdown<S: DrawSurface + ?Sized>(&mut self, surface: &mut S) {
        for (_, entry) in self.entries.drain() {
            for (_, handle) in entry.handles {
                surface.destroy_texture(handle);
            }
        }
    }

    /// Number of live handles held for `source`.
    pub fn live_handles(&self, source: SourceId) -> usize {
        self.entries.get(&source).map_or(0, |entry| entry.handles.len())
    }

    /// Slot capacity recorded for `source`.
    pub fn capacity(&self, source: SourceId) -> Option<u32> {
        self.entries.get(&source).map(|entry| entry.capacity)
    }

    /// Handle cached for (`source`, `palette_index`), if any.
    pub fn cached(&self, source: SourceId, palette_index: u32) -> Option<TextureHandle> {
        self.entries
            .get(&source)
            .and_then(|entry| entry.handles.get(&palette_index).copied())
    }
}
