//! Source texel to BGRA8 conversion

use crate::error::ConversionError;
use crate::texture::{Palette, TextureSource};

use super::format::PixelFormat;

/// Reserved 8-bit alpha value meaning "use the reference alpha".
pub const ALPHA_KEY: u32 = 0xFE;

/// The one texel pattern a masked 5551 source never inverts.
const MASK_BIT_ONLY: u32 = 0x8000;

/// Per-call conversion parameters chosen by the texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    /// Which palette of a multi-palette source to read from
    pub palette_index: u32,
    /// Treat index 0 (paletted) or an all-zero color (direct) as transparent
    pub color_key: bool,
    /// Alpha substituted for alpha-keyed colors
    pub reference_alpha: u8,
}

/// BGRA8 texels produced by [`convert`].
///
/// Each texel is `0xAARRGGBB`, which is B, G, R, A in memory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    width: u32,
    height: u32,
    texels: Vec<u32>,
}

impl ConvertedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[u32] {
        &self.texels
    }

    /// Texel data as bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// Replace the alpha of an alpha-keyed color with `reference_alpha`.
#[inline]
pub fn apply_alpha_key(color: u32, reference_alpha: u8) -> u32 {
    if color >> 24 == ALPHA_KEY {
        (color & 0x00FF_FFFF) | (u32::from(reference_alpha) << 24)
    } else {
        color
    }
}

/// Convert a whole source image to BGRA8.
///
/// Texels are produced in storage order. Any failure means the texture is
/// unavailable; nothing partial is returned.
pub fn convert(
    source: &TextureSource,
    options: &ConvertOptions,
) -> Result<ConvertedImage, ConversionError> {
    let format = &source.format;
    let bytes_per_pixel = format.bytes_per_pixel;
    if !(1..=4).contains(&bytes_per_pixel) {
        return Err(ConversionError::UnsupportedBytesPerPixel(bytes_per_pixel));
    }

    let texel_count = source.width as usize * source.height as usize;
    let expected = texel_count * bytes_per_pixel as usize;
    if source.pixels.len() < expected {
        return Err(ConversionError::TruncatedPixelData {
            expected,
            actual: source.pixels.len(),
        });
    }
    let data = &source.pixels[..expected];

    let texels = if bytes_per_pixel == 1 {
        let palette = source
            .palette
            .as_ref()
            .ok_or(ConversionError::MissingPalette)?;
        tracing::trace!(source = source.id.0, "paletted source data");
        convert_paletted(data, palette, options)?
    } else {
        if source.palette.is_some() {
            return Err(ConversionError::PaletteFormatMismatch { bytes_per_pixel });
        }
        tracing::trace!(source = source.id.0, bytes_per_pixel, "direct color source data");
        convert_direct(data, format, options)
    };

    Ok(ConvertedImage {
        width: source.width,
        height: source.height,
        texels,
    })
}

fn convert_paletted(
    indices: &[u8],
    palette: &Palette,
    options: &ConvertOptions,
) -> Result<Vec<u32>, ConversionError> {
    let size = palette.size();
    let offset = options.palette_index as usize * palette.entries() as usize;

    indices
        .iter()
        .map(|&index| {
            let index = u32::from(index);
            // Strictly greater: an index equal to the size is let through
            if index > size {
                return Err(ConversionError::PaletteIndexOutOfRange { index, size });
            }
            if options.color_key && index == 0 {
                return Ok(0);
            }
            let color = palette
                .colors()
                .get(offset + index as usize)
                .copied()
                .ok_or(ConversionError::PaletteIndexOutOfRange {
                    index: (offset + index as usize) as u32,
                    size,
                })?;
            Ok(apply_alpha_key(color, options.reference_alpha))
        })
        .collect()
}

fn convert_direct(data: &[u8], format: &PixelFormat, options: &ConvertOptions) -> Vec<u32> {
    let (layout, invert_alpha) = format.unpack_layout();
    let alpha_keyed = layout.has_8bit_alpha();

    data.chunks_exact(layout.bytes_per_pixel as usize)
        .map(|bytes| {
            let pixel = bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

            // PSX style mask bit: color bits all zero
            if options.color_key && (pixel & !layout.alpha.mask) == 0 {
                return 0;
            }

            let mut color = layout.blue.scaled(pixel).unwrap_or(0);
            color |= layout.green.scaled(pixel).unwrap_or(0) << 8;
            color |= layout.red.scaled(pixel).unwrap_or(0) << 16;

            let alpha = if invert_alpha && pixel != MASK_BIT_ONLY {
                layout.alpha.scaled(pixel).map_or(255, |a| 255 - a)
            } else {
                layout.alpha.scaled(pixel).unwrap_or(255)
            };
            color |= alpha << 24;

            if alpha_keyed && layout.alpha.raw(pixel) == ALPHA_KEY {
                color = apply_alpha_key(color, options.reference_alpha);
            }
            color
        })
        .collect()
}
