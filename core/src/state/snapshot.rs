//! Canonical render state snapshot

use crate::texture::TextureHandle;

use super::blend::BlendMode;

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CullMode {
    /// No face culling
    #[default]
    Disabled = 0,
    /// Cull back faces (clockwise winding)
    Back = 1,
    /// Cull front faces (counter-clockwise winding)
    Front = 2,
}

/// Alpha test comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AlphaFunc {
    Never = 0,
    #[default]
    Always = 1,
    Less = 2,
    LessEqual = 3,
    Equal = 4,
    GreaterEqual = 5,
    Greater = 6,
    NotEqual = 7,
}

impl AlphaFunc {
    /// Map the host's alpha function option; out-of-range values fall back
    /// to less-or-equal.
    pub fn from_option(value: u32) -> Self {
        match value {
            0 => AlphaFunc::Never,
            1 => AlphaFunc::Always,
            2 => AlphaFunc::Less,
            3 => AlphaFunc::LessEqual,
            4 => AlphaFunc::Equal,
            5 => AlphaFunc::GreaterEqual,
            6 => AlphaFunc::Greater,
            7 => AlphaFunc::NotEqual,
            _ => AlphaFunc::LessEqual,
        }
    }

    /// Whether a fragment with `alpha` passes against `reference`.
    pub fn passes(self, alpha: f32, reference: f32) -> bool {
        match self {
            AlphaFunc::Never => false,
            AlphaFunc::Always => true,
            AlphaFunc::Less => alpha < reference,
            AlphaFunc::LessEqual => alpha <= reference,
            AlphaFunc::Equal => alpha == reference,
            AlphaFunc::GreaterEqual => alpha >= reference,
            AlphaFunc::Greater => alpha > reference,
            AlphaFunc::NotEqual => alpha != reference,
        }
    }
}

/// Primitive assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PrimitiveTopology {
    #[default]
    Triangles = 0,
    Lines = 1,
}

/// Flat record of everything a backend needs to configure one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderStateSnapshot {
    pub blend_mode: BlendMode,
    pub cull_mode: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub alpha_test: bool,
    pub alpha_func: AlphaFunc,
    /// Alpha test reference, 0-255
    pub alpha_ref: u8,
    pub texture_filtering: bool,
    pub wireframe: bool,
    pub texture: Option<TextureHandle>,
    pub topology: PrimitiveTopology,
    /// Vertices are already in screen space (TL vertices)
    pub pretransformed: bool,
    /// Bound texture is a framebuffer copy (flipped vertically)
    pub framebuffer_texture: bool,
    /// Slots 0..2 hold Y/U/V planes of a movie frame
    pub yuv: bool,
    /// YUV planes use full range instead of video range
    pub full_range: bool,
}

impl RenderStateSnapshot {
    /// Alpha reference normalized to 0-1
    pub fn alpha_ref_normalized(&self) -> f32 {
        f32::from(self.alpha_ref) / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_func_option_mapping() {
        let expected = [
            AlphaFunc::Never,
            AlphaFunc::Always,
            AlphaFunc::Less,
            AlphaFunc::LessEqual,
            AlphaFunc::Equal,
            AlphaFunc::GreaterEqual,
            AlphaFunc::Greater,
            AlphaFunc::NotEqual,
        ];
        for (value, func) in expected.iter().enumerate() {
            assert_eq!(AlphaFunc::from_option(value as u32), *func);
        }
        assert_eq!(AlphaFunc::from_option(8), AlphaFunc::LessEqual);
        assert_eq!(AlphaFunc::from_option(u32::MAX), AlphaFunc::LessEqual);
    }

    #[test]
    fn test_alpha_func_passes() {
        assert!(AlphaFunc::GreaterEqual.passes(0.5, 0.5));
        assert!(!AlphaFunc::Greater.passes(0.5, 0.5));
        assert!(!AlphaFunc::Never.passes(1.0, 0.0));
    }

    #[test]
    fn test_alpha_ref_normalized() {
        let state = RenderStateSnapshot {
            alpha_ref: 255,
            ..Default::default()
        };
        assert_eq!(state.alpha_ref_normalized(), 1.0);
        assert_eq!(RenderStateSnapshot::default().alpha_ref_normalized(), 0.0);
    }
}
