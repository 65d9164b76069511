//! Feature/option bitmask translation
//!
//! Every known feature bit maps to one handler in [`FEATURE_HANDLERS`].
//! Handled bits are cleared from a working copy of the mask; whatever is
//! left afterwards is unknown to the engine and ignored.

use crate::texture::TextureHandle;

use super::blend::{BlendMode, BlendModeTable};
use super::features::RenderFeatures;
use super::snapshot::{AlphaFunc, CullMode, RenderStateSnapshot};

/// Per-group state description supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateDescriptor {
    /// Which states this call sets
    pub features: RenderFeatures,
    /// Values of the boolean states
    pub options: RenderFeatures,
    /// Declared PSX blend mode index
    pub blend_mode: u32,
    /// Alpha function option, used when `features` has `ALPHA_FUNC`
    pub alpha_func: u32,
    /// Alpha reference, used when `features` has `ALPHA_REF`
    pub alpha_ref: u8,
    /// Resolved texture, bound when `features` has `TEXTURE`
    pub texture: Option<TextureHandle>,
    /// Group wants to be distance sorted
    pub z_sort: bool,
}

/// Host-global conditions consulted during translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslateContext {
    /// Blend only when a current auxiliary is active
    pub per_aux_blend: bool,
    /// A current auxiliary is active
    pub current_aux: bool,
    /// Host disabled texture filtering globally
    pub no_filter: bool,
}

type FeatureHandler = fn(&mut Translator, bool, &StateDescriptor, &TranslateContext);

/// Known features in processing order.
///
/// `ALPHA_REF` precedes `ALPHA_FUNC` so a reference set in the same call
/// is applied together with the function.
const FEATURE_HANDLERS: &[(RenderFeatures, FeatureHandler)] = &[
    (RenderFeatures::WIREFRAME, set_wireframe),
    (RenderFeatures::TEXTURE, bind_texture),
    (RenderFeatures::LINEAR_FILTER, set_linear_filter),
    (RenderFeatures::PERSPECTIVE, accept_noop),
    (RenderFeatures::COLOR_KEY, accept_noop),
    (RenderFeatures::DITHER, accept_noop),
    (RenderFeatures::ALPHA_BLEND, set_alpha_blend),
    (RenderFeatures::ALPHA_TEST, set_alpha_test),
    (RenderFeatures::CULL_FACE, set_cull_face),
    (RenderFeatures::NO_CULL, set_no_cull),
    (RenderFeatures::DEPTH_TEST, set_depth_test),
    (RenderFeatures::DEPTH_MASK, set_depth_mask),
    (RenderFeatures::TEX_ADDR, accept_noop),
    (RenderFeatures::ALPHA_REF, set_alpha_ref),
    (RenderFeatures::ALPHA_FUNC, set_alpha_func),
];

/// Features only meaningful with a full descriptor
const DESCRIPTOR_ONLY: RenderFeatures = RenderFeatures::TEXTURE.union(RenderFeatures::ALPHA_BLEND);

fn set_wireframe(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.state.wireframe = on;
}

fn bind_texture(t: &mut Translator, _: bool, desc: &StateDescriptor, _: &TranslateContext) {
    if let Some(texture) = desc.texture {
        t.state.texture = Some(texture);
    }
}

fn set_linear_filter(t: &mut Translator, on: bool, _: &StateDescriptor, ctx: &TranslateContext) {
    t.state.texture_filtering = on && !ctx.no_filter && t.filtering_enabled;
}

fn accept_noop(_: &mut Translator, _: bool, _: &StateDescriptor, _: &TranslateContext) {}

fn set_alpha_blend(t: &mut Translator, on: bool, desc: &StateDescriptor, ctx: &TranslateContext) {
    t.state.blend_mode = if !on || (ctx.per_aux_blend && !ctx.current_aux) {
        BlendMode::None
    } else {
        BlendModeTable::mode(desc.blend_mode)
    };
}

fn set_alpha_test(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.state.alpha_test = on;
}

fn set_cull_face(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.cull_clockwise = on;
    t.state.cull_mode = t.winding_cull();
}

fn set_no_cull(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.state.cull_mode = if on { CullMode::Disabled } else { t.winding_cull() };
}

fn set_depth_test(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.state.depth_test = on;
}

fn set_depth_mask(t: &mut Translator, on: bool, _: &StateDescriptor, _: &TranslateContext) {
    t.state.depth_write = on;
}

fn set_alpha_ref(t: &mut Translator, _: bool, desc: &StateDescriptor, _: &TranslateContext) {
    t.alpha_ref = desc.alpha_ref;
}

fn set_alpha_func(t: &mut Translator, _: bool, desc: &StateDescriptor, _: &TranslateContext) {
    t.state.alpha_func = AlphaFunc::from_option(desc.alpha_func);
    t.state.alpha_ref = t.alpha_ref;
}

/// Render-state translation session.
///
/// Holds the state accumulated over a scene: the current snapshot, the
/// last cull winding and the pending alpha reference. Reset at scene begin.
#[derive(Debug, Clone)]
pub struct Translator {
    state: RenderStateSnapshot,
    /// Last cull-face winding was clockwise
    cull_clockwise: bool,
    /// Reference consumed by the next alpha function
    alpha_ref: u8,
    /// Texture filtering allowed by configuration
    filtering_enabled: bool,
}

impl Translator {
    pub fn new(filtering_enabled: bool) -> Self {
        Self {
            state: RenderStateSnapshot::default(),
            cull_clockwise: false,
            alpha_ref: 0,
            filtering_enabled,
        }
    }

    /// Whether `feature` has a handler (as opposed to being ignored).
    pub fn handles(feature: RenderFeatures) -> bool {
        FEATURE_HANDLERS.iter().any(|(f, _)| *f == feature)
    }

    /// Apply a descriptor and return the resulting state.
    pub fn translate(&mut self, desc: &StateDescriptor, ctx: &TranslateContext) -> RenderStateSnapshot {
        let mut remaining = desc.features;
        for (feature, handler) in FEATURE_HANDLERS {
            if remaining.contains(*feature) {
                remaining.remove(*feature);
                let on = desc.options.contains(*feature);
                tracing::trace!("{:?} -> option: {}", feature, on);
                handler(self, on, desc, ctx);
            }
        }
        if !remaining.is_empty() {
            tracing::trace!("ignoring unhandled features {:?}", remaining);
        }
        self.state
    }

    /// State `translate` would produce, without committing it.
    pub fn preview(&self, desc: &StateDescriptor, ctx: &TranslateContext) -> RenderStateSnapshot {
        self.clone().translate(desc, ctx)
    }

    /// Set a single state from a numeric value.
    ///
    /// Boolean states treat any non-zero value as on. Texture binding and
    /// blending need a full descriptor and are ignored here.
    pub fn apply_single(&mut self, feature: RenderFeatures, value: u32, ctx: &TranslateContext) -> RenderStateSnapshot {
        if feature.intersects(DESCRIPTOR_ONLY) || feature.bits().count_ones() != 1 {
            tracing::trace!("ignoring single state {:?} = {}", feature, value);
            return self.state;
        }
        let desc = StateDescriptor {
            features: feature,
            options: if value != 0 { feature } else { RenderFeatures::empty() },
            alpha_func: value,
            alpha_ref: value.min(255) as u8,
            ..Default::default()
        };
        self.translate(&desc, ctx)
    }

    /// Current accumulated state.
    pub fn state(&self) -> RenderStateSnapshot {
        self.state
    }

    /// Rebind the current texture outside of a descriptor (palette switches).
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.state.texture = texture;
    }

    /// Drop all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::new(self.filtering_enabled);
    }

    fn winding_cull(&self) -> CullMode {
        if self.cull_clockwise {
            CullMode::Back
        } else {
            CullMode::Front
        }
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(true)
    }
}
