//! Pipeline key types for caching
//!
//! Everything in a [`RenderStateSnapshot`] that wgpu bakes into a render
//! pipeline ends up in the key. Alpha test, texture bindings and transforms
//! are per-draw shader data instead.

use fixedfn_core::{BlendFactor, BlendMode, BlendOp, CullMode, PrimitiveTopology, RenderStateSnapshot};

/// Key for pipeline cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub blend: BlendMode,
    pub cull: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub wireframe: bool,
    pub topology: PrimitiveTopology,
}

impl PipelineKey {
    /// Key for `state`. Wireframe is dropped when the device cannot draw
    /// polygon outlines.
    pub fn new(state: &RenderStateSnapshot, wireframe_supported: bool) -> Self {
        Self {
            blend: state.blend_mode,
            cull: state.cull_mode,
            depth_test: state.depth_test,
            depth_write: state.depth_write,
            wireframe: state.wireframe && wireframe_supported,
            topology: state.topology,
        }
    }

    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        if !self.blend.is_blended() {
            return None;
        }
        let equation = self.blend.equation();
        let component = wgpu::BlendComponent {
            src_factor: blend_factor(equation.src),
            dst_factor: blend_factor(equation.dst),
            operation: match equation.op {
                BlendOp::Add => wgpu::BlendOperation::Add,
                BlendOp::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            },
        };
        Some(wgpu::BlendState {
            color: component,
            alpha: component,
        })
    }

    /// Culled face, with counter-clockwise front faces
    pub fn cull_face(&self) -> Option<wgpu::Face> {
        match self.cull {
            CullMode::Disabled => None,
            CullMode::Back => Some(wgpu::Face::Back),
            CullMode::Front => Some(wgpu::Face::Front),
        }
    }

    pub fn depth_compare(&self) -> wgpu::CompareFunction {
        if self.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        }
    }

    pub fn primitive_topology(&self) -> wgpu::PrimitiveTopology {
        match self.topology {
            PrimitiveTopology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }

    pub fn polygon_mode(&self) -> wgpu::PolygonMode {
        if self.wireframe && self.topology == PrimitiveTopology::Triangles {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        }
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(state: RenderStateSnapshot) -> PipelineKey {
        PipelineKey::new(&state, true)
    }

    #[test]
    fn test_opaque_has_no_blend_state() {
        assert_eq!(key(RenderStateSnapshot::default()).blend_state(), None);
    }

    #[test]
    fn test_subtractive_reverses_operands() {
        let blend = key(RenderStateSnapshot {
            blend_mode: BlendMode::Subtractive,
            ..Default::default()
        })
        .blend_state()
        .unwrap();
        assert_eq!(blend.color.operation, wgpu::BlendOperation::ReverseSubtract);
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn test_average_and_quarter_use_source_alpha() {
        let average = key(RenderStateSnapshot {
            blend_mode: BlendMode::Average,
            ..Default::default()
        })
        .blend_state()
        .unwrap();
        assert_eq!(average.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);

        let quarter = key(RenderStateSnapshot {
            blend_mode: BlendMode::Quarter,
            ..Default::default()
        })
        .blend_state()
        .unwrap();
        assert_eq!(quarter.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(quarter.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn test_depth_and_cull_mapping() {
        let k = key(RenderStateSnapshot {
            depth_test: true,
            cull_mode: CullMode::Front,
            ..Default::default()
        });
        assert_eq!(k.depth_compare(), wgpu::CompareFunction::LessEqual);
        assert_eq!(k.cull_face(), Some(wgpu::Face::Front));
        assert_eq!(key(RenderStateSnapshot::default()).depth_compare(), wgpu::CompareFunction::Always);
        assert_eq!(key(RenderStateSnapshot::default()).cull_face(), None);
    }

    #[test]
    fn test_wireframe_requires_device_support() {
        let state = RenderStateSnapshot {
            wireframe: true,
            ..Default::default()
        };
        assert_eq!(PipelineKey::new(&state, true).polygon_mode(), wgpu::PolygonMode::Line);
        assert_eq!(PipelineKey::new(&state, false).polygon_mode(), wgpu::PolygonMode::Fill);

        let lines = PipelineKey::new(
            &RenderStateSnapshot {
                wireframe: true,
                topology: PrimitiveTopology::Lines,
                ..Default::default()
            },
            true,
        );
        assert_eq!(lines.primitive_topology(), wgpu::PrimitiveTopology::LineList);
        assert_eq!(lines.polygon_mode(), wgpu::PolygonMode::Fill);
    }

    #[test]
    fn test_texture_and_alpha_test_share_pipelines() {
        let a = RenderStateSnapshot::default();
        let b = RenderStateSnapshot {
            alpha_test: true,
            alpha_ref: 10,
            texture: Some(fixedfn_core::TextureHandle(4)),
            ..Default::default()
        };
        assert_eq!(key(a), key(b));
    }
}
