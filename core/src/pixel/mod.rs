//! Pixel format conversion
//!
//! Converts legacy source texels (palette indices or packed 16/24/32-bit
//! direct color) into BGRA8 words ready for upload.

mod convert;
mod format;


pub use convert::{ALPHA_KEY, ConvertOptions, ConvertedImage, apply_alpha_key, convert};
pub use format::{ChannelMask, PixelFormat};
