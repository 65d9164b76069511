//! Error types for texture conversion, texture resolution and configuration

use std::path::PathBuf;

/// Errors produced while converting source texels to BGRA8.
///
/// Every variant means "texture unavailable" to the caller; none of them
/// abort the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported bytes per pixel: {0}")]
    UnsupportedBytesPerPixel(u32),

    #[error("paletted source without palette data")]
    MissingPalette,

    #[error("palette attached to a {bytes_per_pixel}-byte direct color source")]
    PaletteFormatMismatch { bytes_per_pixel: u32 },

    #[error("palette index {index} out of range (palette size {size})")]
    PaletteIndexOutOfRange { index: u32, size: u32 },

    #[error("pixel data truncated: expected {expected} bytes, got {actual}")]
    TruncatedPixelData { expected: usize, actual: usize },
}

/// Errors produced by [`TextureCache::resolve`](crate::TextureCache::resolve).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("texture conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("palette slot {index} out of range (capacity {capacity})")]
    PaletteSlotOutOfRange { index: u32, capacity: u32 },

    #[error("backend rejected texture: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Errors produced while loading or saving [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
