//! Render state: feature masks, blend table, snapshots and translation

mod blend;
mod features;
mod snapshot;
mod translator;

pub use blend::{BLEND_MODE_TABLE, BlendEquation, BlendFactor, BlendMode, BlendModeEntry, BlendModeTable, BlendOp};
pub use features::RenderFeatures;
pub use snapshot::{AlphaFunc, CullMode, PrimitiveTopology, RenderStateSnapshot};
pub use translator::{StateDescriptor, TranslateContext, Translator};
