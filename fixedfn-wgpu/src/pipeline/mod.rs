//! Render pipeline management
//!
//! Handles shader module creation, pipeline caching, and bind group layout
//! creation for every fixed-function state combination.

mod bind_groups;
mod cache;
mod creation;
mod key;

pub use bind_groups::TEXTURE_SLOTS;
pub use cache::PipelineCache;
pub use creation::{DEPTH_FORMAT, vertex_buffer_layout};
pub use key::PipelineKey;
