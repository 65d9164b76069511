//! Deferred draw scheduling
//!
//! Opaque groups are drawn as they arrive. Blended and z-sorted groups are
//! captured into a per-frame FIFO and replayed after the opaque pass.

mod record;
mod scheduler;

pub use record::{
    DeferredDrawRecord, DeferredTransform, GroupDraw, GroupTransform, InstanceTransform, PaletteAux,
    SharedMatrix, TransformPolicy,
};
pub use scheduler::{FrameFlags, Scheduler, Submission};
