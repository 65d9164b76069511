//! Host-facing driver operations
//!
//! [`Engine`] owns the translation session, texture cache, deferred
//! scheduler and the backend surface, and exposes the operations the host
//! calls while rendering a frame. All calls happen on one thread.

use glam::Mat4;

use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::movie::{MovieFrame, MoviePlayer};
use crate::schedule::{FrameFlags, GroupDraw, Scheduler, Submission};
use crate::state::{
    BlendModeEntry, BlendModeTable, RenderFeatures, RenderStateSnapshot, StateDescriptor, TranslateContext,
    Translator,
};
use crate::surface::DrawSurface;
use crate::texture::{SourceId, TextureCache, TextureHandle, TextureSource};
use crate::vertex::GroupGeometry;
use crate::viewport::{InternalResolution, ViewportEmulation};

/// Number of context auxiliaries the host can switch between
pub const CONTEXT_AUXILIARIES: usize = 5;

/// Matrix slot addressed by [`Engine::set_matrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSlot {
    World = 0,
    View = 1,
    Projection = 2,
}

impl MatrixSlot {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(MatrixSlot::World),
            1 => Some(MatrixSlot::View),
            2 => Some(MatrixSlot::Projection),
            _ => None,
        }
    }
}

/// Host screen mode, which alters a few driver calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneMode {
    #[default]
    Default,
    /// Every clear also clears color
    Menu,
    /// Viewports keep a vertical scale of 1
    Battle,
}

/// Shapes of one paletted primitive list, one palette index per shape
#[derive(Debug, Clone, Copy)]
pub struct PalettedShapes<'a> {
    pub geometry: &'a GroupGeometry,
    pub palettes: &'a [u8],
    pub vertices_per_shape: usize,
    pub indices_per_shape: usize,
    pub pretransformed: bool,
}

/// Split a per-shape palette list into runs of equal palette index.
///
/// Yields `(palette_index, first_shape, shape_count)`.
pub fn palette_runs(palettes: &[u8]) -> impl Iterator<Item = (u32, usize, usize)> + '_ {
    palettes
        .chunk_by(|a, b| a == b)
        .scan(0usize, |first, run| {
            let start = *first;
            *first += run.len();
            Some((u32::from(run[0]), start, run.len()))
        })
}

/// Legacy render driver on top of a [`DrawSurface`]
pub struct Engine<S: DrawSurface> {
    surface: S,
    config: EngineConfig,
    translator: Translator,
    context: TranslateContext,
    cache: TextureCache,
    scheduler: Scheduler,
    viewport: ViewportEmulation,
    movie: MoviePlayer,
    matrices: [Mat4; 3],
    auxiliaries: [Option<StateDescriptor>; CONTEXT_AUXILIARIES],
    mode: SceneMode,
    scene_depth: u32,
}

impl<S: DrawSurface> Engine<S> {
    pub fn new(config: EngineConfig, surface: S) -> Self {
        let resolution = InternalResolution::from_config(&config.video);
        tracing::info!(
            "Engine: {}x{} view {}x{} (filtering: {})",
            config.video.width,
            config.video.height,
            resolution.view_width,
            resolution.view_height,
            config.video.texture_filtering
        );
        Self {
            surface,
            translator: Translator::new(config.video.texture_filtering),
            config,
            context: TranslateContext::default(),
            cache: TextureCache::new(),
            scheduler: Scheduler::new(),
            viewport: ViewportEmulation::new(resolution),
            movie: MoviePlayer::new(),
            matrices: [Mat4::IDENTITY; 3],
            auxiliaries: [None; CONTEXT_AUXILIARIES],
            mode: SceneMode::default(),
            scene_depth: 0,
        }
    }

    // ---------------------------------------------------------------
    // Scene
    // ---------------------------------------------------------------

    /// Enter a scene. Only the outermost call starts a frame.
    pub fn begin_scene(&mut self) {
        self.scene_depth += 1;
        if self.scene_depth == 1 {
            self.translator.reset();
            self.scheduler.begin_frame();
            self.surface.begin_frame();
        }
    }

    /// Leave a scene. The outermost call replays any deferred draws the
    /// host did not drain and presents the frame.
    pub fn end_scene(&mut self) {
        match self.scene_depth {
            0 => tracing::warn!("end_scene without begin_scene"),
            1 => {
                if !self.scheduler.is_empty() {
                    tracing::debug!("draining {} deferred draws at end of scene", self.scheduler.len());
                    self.scheduler.drain(&mut self.surface);
                }
                self.surface.end_frame();
                self.scene_depth = 0;
            }
            _ => self.scene_depth -= 1,
        }
    }

    pub fn in_scene(&self) -> bool {
        self.scene_depth > 0
    }

    pub fn set_scene_mode(&mut self, mode: SceneMode) {
        self.mode = mode;
    }

    pub fn scene_mode(&self) -> SceneMode {
        self.mode
    }

    pub fn clear(&mut self, color: bool, depth: bool) {
        self.surface.clear(color || self.mode == SceneMode::Menu, depth);
    }

    /// Set the clear color from normalized RGB.
    pub fn set_background(&mut self, rgb: [f32; 3]) {
        let rgb = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
        tracing::trace!("background {:?}", rgb);
        self.surface.set_clear_color(rgb);
    }

    /// Set the viewport in 640x480 host coordinates.
    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let (view, rect) = self
            .viewport
            .emulate(x, y, width, height, self.mode == SceneMode::Battle);
        self.surface.set_viewport(rect);
        self.surface.set_d3d_view(&view);
    }

    pub fn set_matrix(&mut self, slot: MatrixSlot, matrix: Mat4) {
        self.matrices[slot as usize] = matrix;
        if slot == MatrixSlot::Projection {
            self.surface.set_projection(&matrix);
        }
    }

    pub fn matrix(&self, slot: MatrixSlot) -> Mat4 {
        self.matrices[slot as usize]
    }

    // ---------------------------------------------------------------
    // Textures
    // ---------------------------------------------------------------

    /// Convert and upload `source` for a palette (the selected one when
    /// `None`).
    pub fn load_texture(
        &mut self,
        source: &TextureSource,
        palette_index: Option<u32>,
    ) -> Result<TextureHandle, ResolveError> {
        self.cache
            .resolve(&mut self.surface, source, palette_index)
            .inspect_err(|e| tracing::warn!("failed to load texture {}: {}", source.name, e))
    }

    pub fn unload_texture(&mut self, source: SourceId) {
        self.cache.unload(&mut self.surface, source);
    }

    /// Switch `source` to another palette and make it the current texture.
    pub fn palette_changed(
        &mut self,
        source: &TextureSource,
        palette_index: u32,
    ) -> Result<TextureHandle, ResolveError> {
        self.cache.select_palette(source.id, palette_index);
        let handle = self.load_texture(source, Some(palette_index))?;
        self.translator.set_texture(Some(handle));
        Ok(handle)
    }

    /// Write palette colors at `dest_offset` (in colors).
    ///
    /// Returns `false` when the source has no palette or nothing changed.
    /// Palettes whose colors changed are reconverted on their next use.
    pub fn write_palette(&mut self, source: &mut TextureSource, dest_offset: usize, colors: &[u32]) -> bool {
        let Some(palette) = source.palette.as_mut() else {
            return false;
        };
        let entries = palette.entries() as usize;
        if colors.len() / entries > 1 {
            tracing::warn!("UNEXPECTED: multi-palette write to {}", source.name);
        }
        if colors.is_empty() || !palette.write(dest_offset, colors) {
            return false;
        }

        let first = dest_offset / entries;
        let last = (dest_offset + colors.len() - 1) / entries;
        for palette_index in first..=last {
            self.cache
                .invalidate_palette(&mut self.surface, source.id, palette_index as u32);
        }
        true
    }

    // ---------------------------------------------------------------
    // Render state
    // ---------------------------------------------------------------

    pub fn blend_mode(&self, index: u32) -> Option<&'static BlendModeEntry> {
        BlendModeTable::lookup(index)
    }

    /// Apply a state descriptor to the current session.
    pub fn set_render_state(&mut self, desc: &StateDescriptor) -> RenderStateSnapshot {
        self.translator.translate(desc, &self.context)
    }

    pub fn set_single_state(&mut self, feature: RenderFeatures, value: u32) -> RenderStateSnapshot {
        self.translator.apply_single(feature, value, &self.context)
    }

    /// Store one of the host's context auxiliaries.
    pub fn set_auxiliary(&mut self, index: usize, desc: Option<StateDescriptor>) {
        match self.auxiliaries.get_mut(index) {
            Some(slot) => *slot = desc,
            None => tracing::warn!("auxiliary index {} out of range", index),
        }
    }

    /// Apply a stored context auxiliary. Out-of-range or empty slots are
    /// ignored.
    pub fn apply_auxiliary(&mut self, index: usize) -> Option<RenderStateSnapshot> {
        let desc = self.auxiliaries.get(index).copied().flatten()?;
        Some(self.set_render_state(&desc))
    }

    pub fn set_context(&mut self, context: TranslateContext) {
        self.context = context;
    }

    pub fn context(&self) -> TranslateContext {
        self.context
    }

    pub fn set_frame_flags(&mut self, flags: FrameFlags) {
        self.scheduler.set_flags(flags);
    }

    // ---------------------------------------------------------------
    // Drawing
    // ---------------------------------------------------------------

    /// Submit a group. Returns `None` outside of a scene.
    pub fn draw_group(&mut self, draw: &GroupDraw<'_>) -> Option<Submission> {
        if !self.in_scene() {
            tracing::trace!("group {} submitted outside of a scene", draw.group);
            return None;
        }
        Some(
            self.scheduler
                .submit(&mut self.surface, &mut self.translator, &self.context, draw),
        )
    }

    /// Draw a paletted shape list with the current state, one draw per run
    /// of shapes sharing a palette.
    ///
    /// Runs whose texture cannot be resolved are skipped. Returns the
    /// number of runs drawn.
    pub fn draw_paletted(&mut self, source: &TextureSource, shapes: &PalettedShapes<'_>) -> usize {
        if !self.in_scene() {
            return 0;
        }
        let mut drawn = 0;
        for (palette_index, first, count) in palette_runs(shapes.palettes) {
            if self.palette_changed(source, palette_index).is_err() {
                continue;
            }
            let Some(run) = shapes
                .geometry
                .shapes(first, count, shapes.vertices_per_shape, shapes.indices_per_shape)
            else {
                continue;
            };
            if run.is_empty() {
                continue;
            }

            let mut state = self.translator.state();
            state.pretransformed = shapes.pretransformed;
            self.surface.set_state(&state);
            self.surface.bind_texture(state.texture.unwrap_or_default(), 0);
            self.surface.set_vertex_data(&run.vertices);
            self.surface.set_index_data(&run.indices);
            self.surface.submit_draw();
            drawn += 1;
        }
        drawn
    }

    /// Replay the deferred pass. Returns the number of draws replayed.
    pub fn draw_deferred(&mut self) -> usize {
        self.scheduler.drain(&mut self.surface)
    }

    pub fn upload_movie_frame(&mut self, frame: &MovieFrame) -> Result<(), ResolveError> {
        self.movie.present(&mut self.surface, frame)
    }

    pub fn stop_movie(&mut self) {
        self.movie.stop(&mut self.surface);
    }

    /// Release every backend resource the engine created.
    pub fn shutdown(&mut self) {
        tracing::info!("Engine shutdown");
        self.movie.stop(&mut self.surface);
        self.cache.shutdown(&mut self.surface);
        self.scheduler.begin_frame();
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn resolution(&self) -> &InternalResolution {
        &self.viewport.resolution
    }
}
