//! Host-owned texture source images

use crate::pixel::PixelFormat;

/// Identity of a texture source, stable while the host keeps it loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

/// Color tables for paletted sources.
///
/// Colors are BGRA8 words (`0xAARRGGBB`). A source may carry several
/// palettes of `entries` colors each, stored back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<u32>,
    entries: u32,
}

impl Palette {
    /// Create a palette set; `entries` is the number of colors per palette.
    pub fn new(colors: Vec<u32>, entries: u32) -> Self {
        Self {
            colors,
            entries: entries.max(1),
        }
    }

    /// A single palette holding every color in `colors`.
    pub fn single(colors: Vec<u32>) -> Self {
        let entries = colors.len() as u32;
        Self::new(colors, entries)
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Colors per palette
    pub fn entries(&self) -> u32 {
        self.entries
    }

    /// Number of palettes
    pub fn count(&self) -> u32 {
        self.colors.len() as u32 / self.entries
    }

    /// Declared palette size (total colors)
    pub fn size(&self) -> u32 {
        self.colors.len() as u32
    }

    /// Overwrite colors starting at `dest_offset`.
    ///
    /// Returns `true` when anything changed. Writes past the end are
    /// truncated.
    pub fn write(&mut self, dest_offset: usize, colors: &[u32]) -> bool {
        let Some(dest) = self.colors.get_mut(dest_offset..) else {
            return false;
        };
        let len = colors.len().min(dest.len());
        if dest[..len] == colors[..len] {
            return false;
        }
        dest[..len].copy_from_slice(&colors[..len]);
        true
    }
}

/// A source image as the host loaded it.
///
/// Owned by the caller; conversion only borrows it.
#[derive(Debug, Clone)]
pub struct TextureSource {
    pub id: SourceId,
    /// Name used in log output
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    pub palette: Option<Palette>,
    /// Global color-key flag
    pub color_key: bool,
    /// Per-palette color-key flags, overriding `color_key` when present
    pub palette_color_keys: Option<Vec<bool>>,
    /// Alpha substituted for alpha-keyed colors
    pub reference_alpha: u8,
    /// Reserved framebuffer version: never converted, bound to a render target
    pub framebuffer: bool,
}

impl TextureSource {
    /// Direct-color or paletted source image.
    pub fn new(
        id: SourceId,
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            width,
            height,
            format,
            pixels,
            palette: None,
            color_key: false,
            palette_color_keys: None,
            reference_alpha: 0,
            framebuffer: false,
        }
    }

    /// Paletted 8-bit source image.
    pub fn paletted(
        id: SourceId,
        name: impl Into<String>,
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Palette,
    ) -> Self {
        Self {
            palette: Some(palette),
            ..Self::new(id, name, width, height, PixelFormat::PALETTED, indices)
        }
    }

    /// Reserved framebuffer-texture source of the given size.
    pub fn framebuffer(id: SourceId, name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            framebuffer: true,
            ..Self::new(id, name, width, height, PixelFormat::BGRA8, Vec::new())
        }
    }

    pub fn with_color_key(mut self, color_key: bool) -> Self {
        self.color_key = color_key;
        self
    }

    pub fn with_palette_color_keys(mut self, keys: Vec<bool>) -> Self {
        self.palette_color_keys = Some(keys);
        self
    }

    pub fn with_reference_alpha(mut self, reference_alpha: u8) -> Self {
        self.reference_alpha = reference_alpha;
        self
    }

    /// Number of palettes associated with this source.
    pub fn palette_count(&self) -> u32 {
        self.palette.as_ref().map_or(0, Palette::count)
    }

    /// Color key in effect for `palette_index`.
    pub fn color_key_for(&self, palette_index: u32) -> bool {
        match &self.palette_color_keys {
            Some(keys) => keys.get(palette_index as usize).copied().unwrap_or(false),
            None => self.color_key,
        }
    }
}
