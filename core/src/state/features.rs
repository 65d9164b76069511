//! Legacy render feature bits
//!
//! The host describes state changes as a pair of masks with this layout:
//! the feature mask says which states are being set, the option mask
//! carries their values.

bitflags::bitflags! {
    /// Render feature/option bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFeatures: u32 {
        const WIREFRAME = 1 << 0;
        const TEXTURE = 1 << 1;
        const LINEAR_FILTER = 1 << 2;
        const PERSPECTIVE = 1 << 3;
        /// Texture-modulated blending
        const TMAP_BLEND = 1 << 4;
        const WRAP_U = 1 << 5;
        const WRAP_V = 1 << 6;
        const UNKNOWN_80 = 1 << 7;
        const COLOR_KEY = 1 << 8;
        const DITHER = 1 << 9;
        const ALPHA_BLEND = 1 << 10;
        const ALPHA_TEST = 1 << 11;
        const ANTIALIAS = 1 << 12;
        const CULL_FACE = 1 << 13;
        const NO_CULL = 1 << 14;
        const DEPTH_TEST = 1 << 15;
        const DEPTH_MASK = 1 << 16;
        const SHADE_MODE = 1 << 17;
        const SPECULAR = 1 << 18;
        const LIGHT_STATE = 1 << 19;
        const FOG = 1 << 20;
        const TEX_ADDR = 1 << 21;
        const UNKNOWN_400000 = 1 << 22;
        const UNKNOWN_800000 = 1 << 23;
        const ALPHA_FUNC = 1 << 24;
        const ALPHA_REF = 1 << 25;
    }
}

impl RenderFeatures {
    /// Features that route a group to the deferred pass.
    pub const DEFERRING: Self = Self::ALPHA_BLEND.union(Self::TMAP_BLEND);
}
