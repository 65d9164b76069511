//! fixedfn wgpu backend
//!
//! Implements [`fixedfn_core::DrawSurface`] on wgpu and renders offscreen,
//! so scenes driven through [`fixedfn_core::Engine`] can be captured to PNG.
//!
//! # Architecture
//!
//! - [`WgpuSurface`] - Offscreen color/depth target implementing `DrawSurface`
//! - [`CommandBuffer`] - Records draws and clears, replayed at frame end
//! - [`PipelineCache`] - One render pipeline per blend/cull/depth/topology combination
//! - [`TextureManager`] - BGRA and YUV plane textures plus framebuffer copies
//! - [`GrowableBuffer`] - Per-flush vertex, index and draw-uniform buffers
//! - [`capture`] - Render target readback and PNG output
//! - [`demo`] - Built-in scene for the `fixedfn` binary

pub mod buffer;
pub mod capture;
pub mod command_buffer;
pub mod demo;
pub mod device;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod texture_manager;


pub use buffer::GrowableBuffer;
pub use command_buffer::{CommandBuffer, DrawUniforms};
pub use device::GpuContext;
pub use pipeline::{PipelineCache, PipelineKey};
pub use surface::{FrameStats, TARGET_FORMAT, WgpuSurface};
pub use texture_manager::TextureManager;
