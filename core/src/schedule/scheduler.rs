//! Immediate vs. deferred submission and deferred replay

use glam::Mat4;

use crate::state::{RenderFeatures, RenderStateSnapshot, StateDescriptor, TranslateContext, Translator};
use crate::surface::DrawSurface;
use crate::vertex::GroupGeometry;

use super::record::{DeferredDrawRecord, DeferredTransform, GroupDraw, GroupTransform, TransformPolicy};

/// Per-frame scheduling conditions set by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// The host is running its alpha-sorted pass
    pub alpha_sort_pass: bool,
    /// Draw blended groups immediately instead of deferring them
    pub suppress_immediate: bool,
}

/// Outcome of [`Scheduler::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Drawn on the surface before returning
    Immediate,
    /// Captured for the deferred pass
    Enqueued,
}

/// Deferred draw scheduler.
///
/// The deferred list lives for one frame: it is cleared at frame start and
/// emptied by [`drain`](Self::drain).
#[derive(Debug, Default)]
pub struct Scheduler {
    deferred: Vec<DeferredDrawRecord>,
    flags: FrameFlags,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FrameFlags) {
        self.flags = flags;
    }

    /// Start a frame, dropping records a previous frame never replayed.
    pub fn begin_frame(&mut self) {
        if !self.deferred.is_empty() {
            tracing::warn!("dropping {} unreplayed deferred draws", self.deferred.len());
        }
        self.deferred.clear();
    }

    /// Whether a group with this state goes to the deferred pass.
    pub fn should_defer(&self, state: &StateDescriptor) -> bool {
        let z_sorted = self.flags.alpha_sort_pass && state.z_sort;
        let blended = !self.flags.suppress_immediate && state.features.intersects(RenderFeatures::DEFERRING);
        z_sorted || blended
    }

    /// Draw `draw` now or capture it for the deferred pass.
    ///
    /// Deferred records snapshot the state at submit time from the live
    /// translator session; replaying one record never changes the state
    /// seen by the records after it.
    pub fn submit<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        translator: &mut Translator,
        ctx: &TranslateContext,
        draw: &GroupDraw<'_>,
    ) -> Submission {
        if self.should_defer(&draw.state) {
            let mut state = translator.preview(&draw.state, ctx);
            state.topology = draw.topology;
            state.pretransformed = draw.pretransformed;
            self.enqueue(draw, state);
            return Submission::Enqueued;
        }

        let mut state = translator.translate(&draw.state, ctx);
        state.topology = draw.topology;
        state.pretransformed = draw.pretransformed;

        match &draw.transform {
            GroupTransform::None => draw_group(surface, &state, None, draw.geometry),
            GroupTransform::World(world) => draw_group(surface, &state, Some(*world), draw.geometry),
            GroupTransform::Instanced {
                policy,
                camera,
                instances,
            } => {
                for instance in instances.iter() {
                    let world = policy.apply(instance.matrix.get(), *camera);
                    draw_group(surface, &state, Some(world), draw.geometry);
                }
            }
        }
        Submission::Immediate
    }

    fn enqueue(&mut self, draw: &GroupDraw<'_>, state: RenderStateSnapshot) {
        let record = |transform| DeferredDrawRecord {
            group: draw.group,
            state,
            transform,
            palette_aux: draw.palette_aux.cloned(),
            geometry: draw.geometry.clone(),
        };

        match &draw.transform {
            GroupTransform::None => self.deferred.push(record(DeferredTransform::None)),
            GroupTransform::World(world) => self.deferred.push(record(DeferredTransform::Matrix(*world))),
            GroupTransform::Instanced {
                policy,
                camera,
                instances,
            } => {
                for instance in instances.iter() {
                    let transform = match policy {
                        TransformPolicy::MatrixPointer => {
                            DeferredTransform::Pointer(instance.matrix.clone())
                        }
                        TransformPolicy::CameraProduct => {
                            DeferredTransform::Matrix(policy.apply(instance.matrix.get(), *camera))
                        }
                    };
                    self.deferred.push(record(transform));
                }
            }
        }
        tracing::trace!("deferred group {} ({} queued)", draw.group, self.deferred.len());
    }

    /// Replay every deferred record in submission order, then forget them.
    ///
    /// Returns the number of records replayed.
    pub fn drain<S: DrawSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let records = std::mem::take(&mut self.deferred);
        for record in &records {
            draw_group(surface, &record.state, record.transform.resolve(), &record.geometry);
        }
        records.len()
    }

    /// Records waiting for the deferred pass.
    pub fn deferred(&self) -> &[DeferredDrawRecord] {
        &self.deferred
    }

    pub fn len(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deferred.is_empty()
    }
}

fn draw_group<S: DrawSurface + ?Sized>(
    surface: &mut S,
    state: &RenderStateSnapshot,
    world: Option<Mat4>,
    geometry: &GroupGeometry,
) {
    surface.set_state(state);
    surface.bind_texture(state.texture.unwrap_or_default(), 0);
    if let Some(world) = world {
        surface.set_world_view(&world);
    }
    surface.set_vertex_data(&geometry.vertices);
    surface.set_index_data(&geometry.indices);
    surface.submit_draw();
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::schedule::{InstanceTransform, PaletteAux};
    use crate::state::BlendMode;
    use crate::test_utils::{RecordingSurface, SurfaceCall};
    use crate::texture::TextureHandle;
    use crate::vertex::Vertex;

    fn geometry(tag: f32) -> Rc<GroupGeometry> {
        Rc::new(GroupGeometry::new(
            vec![
                Vertex::new([tag, 0.0, 0.0], 0xFFFF_FFFF, [0.0, 0.0]),
                Vertex::new([tag, 1.0, 0.0], 0xFFFF_FFFF, [0.0, 1.0]),
                Vertex::new([tag, 0.0, 1.0], 0xFFFF_FFFF, [1.0, 0.0]),
            ],
            vec![0, 1, 2],
        ))
    }

    fn blended(mode: u32) -> StateDescriptor {
        StateDescriptor {
            features: RenderFeatures::ALPHA_BLEND | RenderFeatures::TEXTURE,
            options: RenderFeatures::ALPHA_BLEND,
            blend_mode: mode,
            texture: Some(TextureHandle(7)),
            ..Default::default()
        }
    }

    fn opaque() -> StateDescriptor {
        StateDescriptor {
            features: RenderFeatures::TEXTURE | RenderFeatures::DEPTH_TEST,
            options: RenderFeatures::DEPTH_TEST,
            texture: Some(TextureHandle(3)),
            ..Default::default()
        }
    }

    #[test]
    fn test_opaque_group_is_immediate() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);

        let result = scheduler.submit(
            &mut surface,
            &mut translator,
            &TranslateContext::default(),
            &GroupDraw::new(0, opaque(), &geo),
        );

        assert_eq!(result, Submission::Immediate);
        assert!(scheduler.is_empty());
        assert_eq!(surface.draw_count(), 1);
        assert_eq!(surface.draws[0].textures[0], TextureHandle(3));
    }

    #[test]
    fn test_blended_group_is_deferred_unless_suppressed() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let ctx = TranslateContext::default();
        let geo = geometry(0.0);

        let result = scheduler.submit(&mut surface, &mut translator, &ctx, &GroupDraw::new(1, blended(1), &geo));
        assert_eq!(result, Submission::Enqueued);
        assert_eq!(surface.draw_count(), 0);

        scheduler.set_flags(FrameFlags {
            suppress_immediate: true,
            ..Default::default()
        });
        let result = scheduler.submit(&mut surface, &mut translator, &ctx, &GroupDraw::new(2, blended(1), &geo));
        assert_eq!(result, Submission::Immediate);
        assert_eq!(surface.draw_count(), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_texture_modulated_blend_defers() {
        let scheduler = Scheduler::new();
        let state = StateDescriptor {
            features: RenderFeatures::TMAP_BLEND,
            ..Default::default()
        };
        assert!(scheduler.should_defer(&state));
    }

    #[test]
    fn test_z_sorted_group_defers_during_alpha_sort_pass() {
        let mut scheduler = Scheduler::new();
        scheduler.set_flags(FrameFlags {
            alpha_sort_pass: true,
            suppress_immediate: true,
        });
        let state = StateDescriptor {
            z_sort: true,
            ..opaque()
        };
        assert!(scheduler.should_defer(&state));
        assert!(!scheduler.should_defer(&opaque()));

        scheduler.set_flags(FrameFlags {
            alpha_sort_pass: false,
            suppress_immediate: true,
        });
        assert!(!scheduler.should_defer(&state));
    }

    #[test]
    fn test_z_sorted_blended_group_enqueues_once_and_replays() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);
        scheduler.set_flags(FrameFlags {
            alpha_sort_pass: true,
            ..Default::default()
        });
        let state = StateDescriptor {
            z_sort: true,
            ..blended(2)
        };

        let result = scheduler.submit(
            &mut surface,
            &mut translator,
            &TranslateContext::default(),
            &GroupDraw::new(5, state, &geo),
        );
        assert_eq!(result, Submission::Enqueued);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.deferred()[0].group, 5);
        assert_eq!(scheduler.deferred()[0].state.blend_mode, BlendMode::Subtractive);
        assert_eq!(surface.draw_count(), 0);

        assert_eq!(scheduler.drain(&mut surface), 1);
        assert_eq!(surface.draw_count(), 1);
        let replayed = surface.draws[0].state.unwrap();
        assert_eq!(replayed.blend_mode, BlendMode::Subtractive);
    }

    #[test]
    fn test_drain_replays_fifo() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let ctx = TranslateContext::default();
        let (a, b, c) = (geometry(1.0), geometry(2.0), geometry(3.0));

        for (group, geo) in [(10, &a), (11, &b), (12, &c)] {
            scheduler.submit(&mut surface, &mut translator, &ctx, &GroupDraw::new(group, blended(0), geo));
        }
        assert_eq!(
            scheduler.deferred().iter().map(|r| r.group).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );

        assert_eq!(scheduler.drain(&mut surface), 3);
        let order: Vec<f32> = surface.draws.iter().map(|d| d.vertices[0].x).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0]);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.drain(&mut surface), 0);
    }

    #[test]
    fn test_deferred_record_snapshot_keeps_declared_blend() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);

        scheduler.submit(
            &mut surface,
            &mut translator,
            &TranslateContext::default(),
            &GroupDraw::new(4, blended(3), &geo),
        );
        let record = &scheduler.deferred()[0];
        assert_eq!(record.state.blend_mode, BlendMode::Quarter);
        assert_eq!(record.state.texture, Some(TextureHandle(7)));
        // the live session is untouched until replay
        assert_eq!(translator.state().blend_mode, BlendMode::None);
    }

    #[test]
    fn test_palette_aux_is_copied() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);
        let mut aux = PaletteAux {
            palette_index: 2,
            ..Default::default()
        };

        scheduler.submit(
            &mut surface,
            &mut translator,
            &TranslateContext::default(),
            &GroupDraw::new(0, blended(1), &geo).with_palette_aux(&aux),
        );
        aux.palette_index = 5;

        assert_eq!(scheduler.deferred()[0].palette_aux.as_ref().unwrap().palette_index, 2);
    }

    #[test]
    fn test_instanced_policies() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let ctx = TranslateContext::default();
        let geo = geometry(0.0);
        let instance = Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0));
        let camera = Mat4::from_scale(glam::Vec3::splat(2.0));
        let instances = [InstanceTransform::new(instance)];

        for policy in [TransformPolicy::MatrixPointer, TransformPolicy::CameraProduct] {
            let draw = GroupDraw::new(0, opaque(), &geo).with_transform(GroupTransform::Instanced {
                policy,
                camera,
                instances: &instances,
            });
            scheduler.submit(&mut surface, &mut translator, &ctx, &draw);
        }

        assert_eq!(surface.draws[0].world_view, Some(instance));
        assert_eq!(surface.draws[1].world_view, Some(camera * instance));
    }

    #[test]
    fn test_deferred_matrix_pointer_reads_at_replay() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);
        let instances = [
            InstanceTransform::new(Mat4::IDENTITY),
            InstanceTransform::new(Mat4::IDENTITY),
        ];

        let draw = GroupDraw::new(0, blended(1), &geo).with_transform(GroupTransform::Instanced {
            policy: TransformPolicy::MatrixPointer,
            camera: Mat4::IDENTITY,
            instances: &instances,
        });
        scheduler.submit(&mut surface, &mut translator, &TranslateContext::default(), &draw);
        assert_eq!(scheduler.len(), 2);

        let moved = Mat4::from_translation(glam::Vec3::Y);
        instances[0].matrix.set(moved);
        scheduler.drain(&mut surface);

        assert_eq!(surface.draws[0].world_view, Some(moved));
        assert_eq!(surface.draws[1].world_view, Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_deferred_world_matrix_is_copied() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);
        let world = Mat4::from_rotation_z(0.5);

        let draw = GroupDraw::new(0, blended(1), &geo).with_transform(GroupTransform::World(world));
        scheduler.submit(&mut surface, &mut translator, &TranslateContext::default(), &draw);
        scheduler.drain(&mut surface);

        assert!(surface.calls.contains(&SurfaceCall::SetWorldView(world)));
    }

    #[test]
    fn test_begin_frame_drops_leftovers() {
        let mut surface = RecordingSurface::new();
        let mut scheduler = Scheduler::new();
        let mut translator = Translator::default();
        let geo = geometry(0.0);
        scheduler.submit(
            &mut surface,
            &mut translator,
            &TranslateContext::default(),
            &GroupDraw::new(0, blended(1), &geo),
        );
        scheduler.begin_frame();
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_transform_policy_from_mode() {
        assert_eq!(TransformPolicy::from_mode(1), Some(TransformPolicy::MatrixPointer));
        assert_eq!(TransformPolicy::from_mode(2), Some(TransformPolicy::CameraProduct));
        assert_eq!(TransformPolicy::from_mode(0), None);
    }
}
