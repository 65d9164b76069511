//! Integration tests for the fixedfn engine
//!
//! Drives [`Engine`] through whole frames against a recording surface:
//! texture loading, immediate and deferred group submission, paletted
//! draws and movie playback.

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Mat4;

    use crate::config::EngineConfig;
    use crate::engine::{Engine, PalettedShapes};
    use crate::movie::{MovieFrame, MoviePlane};
    use crate::pixel::{ALPHA_KEY, PixelFormat};
    use crate::schedule::{FrameFlags, GroupDraw, GroupTransform, InstanceTransform, Submission, TransformPolicy};
    use crate::state::{BlendMode, RenderFeatures, StateDescriptor, TranslateContext};
    use crate::surface::TextureKind;
    use crate::test_utils::{RecordingSurface, SurfaceCall};
    use crate::texture::{Palette, SourceId, TextureSource};
    use crate::vertex::GroupGeometry;

    // ============================================================================
    // Helpers
    // ============================================================================

    fn engine() -> Engine<RecordingSurface> {
        Engine::new(EngineConfig::default(), RecordingSurface::new())
    }

    fn triangle(x: f32) -> Rc<GroupGeometry> {
        Rc::new(GroupGeometry::from_parts(
            &[[x, 0.0, 0.0], [x, 1.0, 0.0], [x + 1.0, 0.0, 0.0]],
            None,
            None,
            &[[0, 1, 2]],
            None,
        ))
    }

    fn sprite_sheet(palettes: u32) -> TextureSource {
        let colors = (0..palettes * 4).map(|i| 0xFF00_0000 | (i * 0x10)).collect();
        TextureSource::paletted(
            SourceId(7),
            "sprites",
            2,
            2,
            vec![0, 1, 2, 3],
            Palette::new(colors, 4),
        )
    }

    fn opaque(texture: Option<crate::TextureHandle>) -> StateDescriptor {
        StateDescriptor {
            features: RenderFeatures::TEXTURE | RenderFeatures::DEPTH_TEST | RenderFeatures::DEPTH_MASK,
            options: RenderFeatures::TEXTURE | RenderFeatures::DEPTH_TEST | RenderFeatures::DEPTH_MASK,
            texture,
            ..Default::default()
        }
    }

    fn additive(texture: Option<crate::TextureHandle>) -> StateDescriptor {
        StateDescriptor {
            features: RenderFeatures::TEXTURE | RenderFeatures::ALPHA_BLEND | RenderFeatures::DEPTH_MASK,
            options: RenderFeatures::TEXTURE | RenderFeatures::ALPHA_BLEND,
            blend_mode: 1,
            texture,
            ..Default::default()
        }
    }

    // ============================================================================
    // Frame scheduling
    // ============================================================================

    #[test]
    fn test_opaque_then_blended_frame() {
        let mut engine = engine();
        let sheet = sprite_sheet(1);
        let handle = engine.load_texture(&sheet, None).unwrap();
        let (ground, smoke) = (triangle(0.0), triangle(5.0));

        engine.begin_scene();
        let first = engine.draw_group(&GroupDraw::new(0, opaque(Some(handle)), &ground));
        let second = engine.draw_group(&GroupDraw::new(1, additive(Some(handle)), &smoke));
        assert_eq!(first, Some(Submission::Immediate));
        assert_eq!(second, Some(Submission::Enqueued));
        assert_eq!(engine.surface().draw_count(), 1);

        assert_eq!(engine.draw_deferred(), 1);
        engine.end_scene();

        let draws = &engine.surface().draws;
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].vertices[0].x, 0.0);
        assert_eq!(draws[1].vertices[0].x, 5.0);
        let blended = draws[1].state.unwrap();
        assert_eq!(blended.blend_mode, BlendMode::Additive);
        assert!(!blended.depth_write);
        assert_eq!(draws[1].textures[0], handle);
        assert_eq!(engine.surface().calls.last(), Some(&SurfaceCall::EndFrame));
    }

    #[test]
    fn test_end_scene_replays_undrained_groups() {
        let mut engine = engine();
        let geo = triangle(0.0);
        engine.begin_scene();
        engine.draw_group(&GroupDraw::new(0, additive(None), &geo));
        engine.end_scene();

        assert_eq!(engine.surface().draw_count(), 1);
        assert!(engine.scheduler().is_empty());
    }

    #[test]
    fn test_suppressed_frame_draws_blended_groups_in_order() {
        let mut engine = engine();
        engine.set_frame_flags(FrameFlags {
            suppress_immediate: true,
            ..Default::default()
        });
        let (a, b) = (triangle(1.0), triangle(2.0));

        engine.begin_scene();
        assert_eq!(
            engine.draw_group(&GroupDraw::new(0, additive(None), &a)),
            Some(Submission::Immediate)
        );
        assert_eq!(
            engine.draw_group(&GroupDraw::new(1, opaque(None), &b)),
            Some(Submission::Immediate)
        );
        engine.end_scene();

        let xs: Vec<f32> = engine.surface().draws.iter().map(|d| d.vertices[0].x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_per_aux_blend_without_current_aux() {
        let mut engine = engine();
        engine.set_context(TranslateContext {
            per_aux_blend: true,
            current_aux: false,
            no_filter: false,
        });
        let geo = triangle(0.0);

        engine.begin_scene();
        engine.draw_group(&GroupDraw::new(0, additive(None), &geo));
        engine.draw_deferred();
        engine.end_scene();

        assert_eq!(engine.surface().draws[0].state.unwrap().blend_mode, BlendMode::None);
    }

    #[test]
    fn test_instanced_camera_product_deferred() {
        let mut engine = engine();
        let geo = triangle(0.0);
        let camera = Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -5.0));
        let instances = [
            InstanceTransform::new(Mat4::from_translation(glam::Vec3::X)),
            InstanceTransform::new(Mat4::from_translation(glam::Vec3::Y)),
        ];

        engine.begin_scene();
        let draw = GroupDraw::new(3, additive(None), &geo).with_transform(GroupTransform::Instanced {
            policy: TransformPolicy::CameraProduct,
            camera,
            instances: &instances,
        });
        engine.draw_group(&draw);
        // later edits to instance matrices do not affect copied products
        instances[0].matrix.set(Mat4::IDENTITY);
        engine.draw_deferred();
        engine.end_scene();

        let worlds: Vec<_> = engine.surface().draws.iter().map(|d| d.world_view).collect();
        assert_eq!(
            worlds,
            vec![
                Some(camera * Mat4::from_translation(glam::Vec3::X)),
                Some(camera * Mat4::from_translation(glam::Vec3::Y)),
            ]
        );
    }

    // ============================================================================
    // Textures
    // ============================================================================

    #[test]
    fn test_resolve_is_idempotent_across_frames() {
        let mut engine = engine();
        let sheet = sprite_sheet(2);
        for _ in 0..3 {
            engine.begin_scene();
            engine.palette_changed(&sheet, 1).unwrap();
            engine.end_scene();
        }
        assert_eq!(engine.surface().created_textures(), 1);
    }

    #[test]
    fn test_palette_reload_rebuilds_once() {
        let mut engine = engine();
        let two = sprite_sheet(2);
        engine.load_texture(&two, Some(0)).unwrap();
        engine.load_texture(&two, Some(1)).unwrap();

        let three = sprite_sheet(3);
        engine.load_texture(&three, Some(2)).unwrap();
        assert_eq!(engine.surface().destroyed().len(), 2);
        assert_eq!(engine.cache().capacity(three.id), Some(6));

        engine.load_texture(&three, Some(0)).unwrap();
        assert_eq!(engine.surface().destroyed().len(), 2);
    }

    #[test]
    fn test_framebuffer_source_is_never_converted() {
        let mut engine = engine();
        let fb = TextureSource::framebuffer(SourceId(99), "fb", 320, 240);
        engine.begin_scene();
        engine.load_texture(&fb, None).unwrap();
        engine.end_scene();
        assert_eq!(engine.surface().created_textures(), 0);
        assert!(engine.surface().calls.contains(&SurfaceCall::FramebufferTexture(320, 240)));
    }

    #[test]
    fn test_color_key_and_alpha_key_uploads() {
        let mut engine = engine();
        let palette = Palette::new(vec![0xFF11_2233, 0xFF44_5566, (ALPHA_KEY << 24) | 0x12_3456], 3);
        let keyed = TextureSource::paletted(SourceId(3), "keyed", 3, 1, vec![0, 1, 2], palette)
            .with_color_key(true)
            .with_reference_alpha(0x40);
        engine.load_texture(&keyed, None).unwrap();

        let upload = engine.surface().last_upload().unwrap();
        let texels: &[u32] = bytemuck::cast_slice(&upload.pixels);
        assert_eq!(texels[0], 0);
        assert_eq!(texels[1], 0xFF44_5566);
        assert_eq!(texels[2], 0x4012_3456);
        assert_eq!(upload.kind, TextureKind::Bgra);
    }

    #[test]
    fn test_unsupported_source_leaves_no_texture() {
        let mut engine = engine();
        let mut format = PixelFormat::BGRA8;
        format.bytes_per_pixel = 5;
        let bad = TextureSource::new(SourceId(4), "bad", 1, 1, format, vec![0; 5]);
        assert!(engine.load_texture(&bad, None).is_err());
        assert_eq!(engine.cache().live_handles(bad.id), 0);
        assert_eq!(engine.surface().created_textures(), 0);
    }

    #[test]
    fn test_paletted_list_after_palette_write() {
        let mut engine = engine();
        let mut sheet = sprite_sheet(2);
        let quad_geo = GroupGeometry::from_parts(
            &[[0.0; 3]; 6],
            None,
            None,
            &[[0, 1, 2], [3, 4, 5]],
            None,
        );

        engine.begin_scene();
        let shapes = PalettedShapes {
            geometry: &quad_geo,
            palettes: &[1, 1],
            vertices_per_shape: 3,
            indices_per_shape: 3,
            pretransformed: false,
        };
        assert_eq!(engine.draw_paletted(&sheet, &shapes), 1);

        engine.write_palette(&mut sheet, 4, &[0xFFFF_0000; 4]);
        assert_eq!(engine.draw_paletted(&sheet, &shapes), 1);
        engine.end_scene();

        assert_eq!(engine.surface().created_textures(), 2);
        let draws = &engine.surface().draws;
        assert_ne!(draws[0].textures[0], draws[1].textures[0]);
        let upload = engine.surface().last_upload().unwrap();
        let texels: &[u32] = bytemuck::cast_slice(&upload.pixels);
        assert!(texels.iter().all(|&t| t == 0xFFFF_0000));
    }

    // ============================================================================
    // Movies
    // ============================================================================

    #[test]
    fn test_movie_playback_releases_frames() {
        let mut engine = engine();
        let frame = MovieFrame::Bgra(MoviePlane::new(vec![0x80; 4 * 4 * 4], 4, 4, 16));

        for _ in 0..3 {
            engine.begin_scene();
            engine.upload_movie_frame(&frame).unwrap();
            engine.end_scene();
        }
        assert_eq!(engine.surface().live_textures(), 1);
        engine.stop_movie();
        assert_eq!(engine.surface().live_textures(), 0);
        assert_eq!(engine.surface().draw_count(), 3);
    }
}
