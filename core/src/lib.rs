//! fixedfn core - legacy fixed-function render-state translation
//!
//! This crate turns per-primitive-group state descriptors and paletted/RGB
//! source images from a PSX-era renderer into backend-agnostic draw
//! operations, and schedules blended geometry after the opaque pass.
//!
//! # Architecture
//!
//! - [`pixel`] - Converts source texels (1/2/3/4 bytes per pixel) to BGRA8
//! - [`TextureCache`] - One backend texture per (source image, palette)
//! - [`Translator`] - Feature/option bitmasks to a [`RenderStateSnapshot`]
//! - [`Scheduler`] - Immediate vs. deferred submission, FIFO replay
//! - [`DrawSurface`] - The capability set a rendering backend implements
//! - [`Engine`] - Host-facing driver operations tying the above together
//! - [`ViewportEmulation`] - 640x480 viewport and Direct3D transform emulation
//! - [`MoviePlayer`] - Decoded BGRA/YUV movie frame upload

pub mod config;
pub mod engine;
pub mod error;
pub mod movie;
pub mod pixel;
pub mod schedule;
pub mod state;
pub mod surface;
pub mod texture;
pub mod vertex;
pub mod viewport;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
mod integration;

pub use config::{BackendKind, EngineConfig, VideoConfig};
pub use engine::{Engine, MatrixSlot, PalettedShapes, SceneMode, palette_runs};
pub use error::{ConfigError, ConversionError, ResolveError};
pub use movie::{MovieFrame, MoviePlane, MoviePlayer};
pub use pixel::{ChannelMask, ConvertOptions, ConvertedImage, PixelFormat, convert};
pub use schedule::{
    DeferredDrawRecord, DeferredTransform, FrameFlags, GroupDraw, GroupTransform, InstanceTransform,
    PaletteAux, Scheduler, SharedMatrix, Submission, TransformPolicy,
};
pub use state::{
    AlphaFunc, BlendEquation, BlendFactor, BlendMode, BlendModeEntry, BlendModeTable, BlendOp, CullMode,
    PrimitiveTopology, RenderFeatures, RenderStateSnapshot, StateDescriptor, TranslateContext, Translator,
};
pub use surface::{DrawSurface, TextureKind, ViewportRect};
pub use texture::{Palette, SourceId, TextureCache, TextureHandle, TextureSource};
pub use vertex::{GroupGeometry, Vertex};
pub use viewport::{InternalResolution, ViewportEmulation};
