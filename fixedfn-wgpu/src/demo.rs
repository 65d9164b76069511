//! Built-in test scene for the offline renderer
//!
//! Exercises the engine end to end: a pre-transformed backdrop, a paletted
//! sprite strip that cycles palettes, an alpha-tested cutout, an additive
//! glow routed through the deferred pass and (optionally) a YUV movie frame
//! in the corner of the screen.

use std::rc::Rc;

use fixedfn_core::{
    DrawSurface, Engine, GroupDraw, GroupGeometry, MovieFrame, MoviePlane, Palette, PalettedShapes, RenderFeatures,
    ResolveError, SourceId, StateDescriptor, TextureSource, Vertex,
};

const SHEET_SIZE: u32 = 8;
const SHEET_PALETTES: u32 = 3;
const SHEET_ENTRIES: u32 = 4;

/// Four-vertex quad in 640x480 screen coordinates, two triangles.
fn quad(x: f32, y: f32, w: f32, h: f32, colors: [u32; 4]) -> GroupGeometry {
    GroupGeometry::from_parts(
        &[[x, y, 0.0], [x + w, y, 0.0], [x + w, y + h, 0.0], [x, y + h, 0.0]],
        Some(&colors),
        Some(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
        &[[0, 1, 2], [0, 2, 3]],
        None,
    )
}

/// Concatenate quads into one fixed-size shape list.
fn strip(quads: &[GroupGeometry]) -> GroupGeometry {
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices = Vec::new();
    for q in quads {
        let base = vertices.len() as u16;
        vertices.extend_from_slice(&q.vertices);
        indices.extend(q.indices.iter().map(|i| i + base));
    }
    GroupGeometry::new(vertices, indices)
}

/// 8x8 checkerboard of palette indices 0..4 with one palette per theme.
fn sprite_sheet() -> TextureSource {
    let indices = (0..SHEET_SIZE * SHEET_SIZE)
        .map(|i| {
            let (x, y) = (i % SHEET_SIZE, i / SHEET_SIZE);
            (((x / 2) + (y / 2)) % SHEET_ENTRIES) as u8
        })
        .collect();
    let colors = vec![
        // warm
        0xFFE0_4020, 0xFFF0_A030, 0xFFFF_E070, 0xFF80_2010,
        // cold
        0xFF20_40E0, 0xFF30_A0F0, 0xFF70_E0FF, 0xFF10_2080,
        // mono
        0xFF20_2020, 0xFF60_6060, 0xFFA0_A0A0, 0xFFF0_F0F0,
    ];
    TextureSource::paletted(
        SourceId(1),
        "demo-sheet",
        SHEET_SIZE,
        SHEET_SIZE,
        indices,
        Palette::new(colors, SHEET_ENTRIES),
    )
}

/// Round cutout: opaque disc on a color-keyed (black) background.
fn cutout() -> TextureSource {
    let size = 16u32;
    let indices = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as f32 - 7.5, (i / size) as f32 - 7.5);
            u8::from(x * x + y * y < 49.0)
        })
        .collect();
    TextureSource::paletted(
        SourceId(2),
        "demo-cutout",
        size,
        size,
        indices,
        Palette::new(vec![0xFF00_0000, 0xFFFF_FFFF], 2),
    )
    .with_color_key(true)
}

/// BT.601 video-range color bars as three planes (4:2:0).
pub fn color_bars(width: u32, height: u32) -> MovieFrame {
    const BARS: [(u8, u8, u8); 4] = [(180, 128, 128), (162, 44, 142), (131, 156, 44), (84, 184, 198)];
    let bar = |x: u32, w: u32| BARS[(x * BARS.len() as u32 / w.max(1)) as usize];

    let y = (0..width * height).map(|i| bar(i % width, width).0).collect();
    let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
    let u = (0..cw * ch).map(|i| bar(i % cw, cw).1).collect();
    let v = (0..cw * ch).map(|i| bar(i % cw, cw).2).collect();
    MovieFrame::Yuv {
        y: MoviePlane::new(y, width, height, width),
        u: MoviePlane::new(u, cw, ch, cw),
        v: MoviePlane::new(v, cw, ch, cw),
        full_range: false,
    }
}

/// Geometry and sources of the demo scene, built once.
pub struct DemoScene {
    sheet: TextureSource,
    cutout: TextureSource,
    backdrop: Rc<GroupGeometry>,
    sprites: GroupGeometry,
    disc: Rc<GroupGeometry>,
    glow: Rc<GroupGeometry>,
    movie: Option<MovieFrame>,
}

impl DemoScene {
    pub fn new(with_movie: bool) -> Self {
        let sprites: Vec<GroupGeometry> = (0..6)
            .map(|i| quad(40.0 + i as f32 * 96.0, 300.0, 80.0, 80.0, [0xFFFF_FFFF; 4]))
            .collect();
        Self {
            sheet: sprite_sheet(),
            cutout: cutout(),
            backdrop: Rc::new(quad(
                0.0,
                0.0,
                640.0,
                480.0,
                [0xFF10_1830, 0xFF10_1830, 0xFF40_2850, 0xFF40_2850],
            )),
            sprites: strip(&sprites),
            disc: Rc::new(quad(260.0, 80.0, 120.0, 120.0, [0xFFFF_FFFF; 4])),
            glow: Rc::new(quad(200.0, 40.0, 240.0, 200.0, [0xFF30_2010; 4])),
            movie: with_movie.then(|| color_bars(64, 48)),
        }
    }

    /// Render frame number `frame`. Palette assignments rotate per frame.
    pub fn render<S: DrawSurface>(&self, engine: &mut Engine<S>, frame: u32) -> Result<(), ResolveError> {
        engine.begin_scene();
        engine.set_background([0.05, 0.05, 0.1]);
        engine.clear(true, true);
        engine.set_viewport(0, 0, 640, 480);

        let untextured = StateDescriptor::default();
        engine.draw_group(&GroupDraw::new(0, untextured, &self.backdrop).pretransformed(true));

        let textured = StateDescriptor {
            features: RenderFeatures::TEXTURE | RenderFeatures::LINEAR_FILTER,
            options: RenderFeatures::TEXTURE,
            ..Default::default()
        };
        engine.set_render_state(&textured);
        let palettes: Vec<u8> = (0..6).map(|i| ((i / 2 + frame) % SHEET_PALETTES) as u8).collect();
        engine.draw_paletted(
            &self.sheet,
            &PalettedShapes {
                geometry: &self.sprites,
                palettes: &palettes,
                vertices_per_shape: 4,
                indices_per_shape: 6,
                pretransformed: true,
            },
        );

        let disc = engine.load_texture(&self.cutout, None)?;
        let cutout_state = StateDescriptor {
            features: RenderFeatures::TEXTURE
                | RenderFeatures::ALPHA_TEST
                | RenderFeatures::ALPHA_FUNC
                | RenderFeatures::ALPHA_REF,
            options: RenderFeatures::TEXTURE | RenderFeatures::ALPHA_TEST,
            alpha_func: 6,
            alpha_ref: 0,
            texture: Some(disc),
            ..Default::default()
        };
        engine.draw_group(&GroupDraw::new(1, cutout_state, &self.disc).pretransformed(true));

        let additive = StateDescriptor {
            features: RenderFeatures::TEXTURE | RenderFeatures::ALPHA_BLEND,
            options: RenderFeatures::ALPHA_BLEND,
            blend_mode: 1,
            ..Default::default()
        };
        engine.draw_group(&GroupDraw::new(2, additive, &self.glow).pretransformed(true));

        if let Some(movie) = &self.movie {
            engine.upload_movie_frame(movie)?;
        }

        engine.draw_deferred();
        engine.end_scene();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_rebases_indices() {
        let strip = strip(&[
            quad(0.0, 0.0, 1.0, 1.0, [0; 4]),
            quad(2.0, 0.0, 1.0, 1.0, [0; 4]),
        ]);
        assert_eq!(strip.vertices.len(), 8);
        assert_eq!(&strip.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_sprite_sheet_indices_fit_palette() {
        let sheet = sprite_sheet();
        assert!(sheet.pixels.iter().all(|&i| u32::from(i) < SHEET_ENTRIES));
        assert_eq!(sheet.pixels.len(), (SHEET_SIZE * SHEET_SIZE) as usize);
    }

    #[test]
    fn test_color_bars_plane_sizes() {
        let MovieFrame::Yuv { y, u, v, full_range } = color_bars(7, 5) else {
            panic!("expected a YUV frame");
        };
        assert!(!full_range);
        assert_eq!(y.data.len(), 35);
        assert_eq!((u.width, u.height), (4, 3));
        assert_eq!(u.data.len(), v.data.len());
        assert_eq!(y.data[0], 180);
        assert_eq!(y.data[6], 84);
    }
}
