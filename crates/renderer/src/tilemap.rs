use model::{MapData, MapDataError, TilesetFlags};
use render_protocol::{RasterSurface, TilesetBindings, TilesetImage};
use tiles::{AnimationPhase, TileSize};
use tracing::{debug, warn};
use view::{LayerSegment, ScrollViewport, ViewportError};

use crate::buffer_painter::BufferPainter;
use crate::change::{ChangeDetector, FrameSignature, Observation};
use crate::clock::AnimationClock;
use crate::config::{TilemapConfig, TilemapConfigError};
use crate::gpu::{TileAnimUniform, tile_anim_offset};
use crate::painter::{CellPaint, CellPainter, PassContext, PassStats, TilePainter};
use crate::quad_batch::QuadBatchPainter;
use crate::stack::{CellStacks, NoOverpass, OverpassHook, TileStackResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintState {
    Clean,
    Dirty,
    Repainting,
}

/// Layered autotile map driven by a scroll origin and an animation clock.
///
/// `render` runs a pass only when the visible window, the tileset bindings,
/// an explicit refresh or (for painters that bake animation into their
/// output) the animation frame changed since the previous pass.
pub struct Tilemap<P> {
    config: TilemapConfig,
    tile_size: TileSize,
    viewport: ScrollViewport,
    map: MapData,
    flags: TilesetFlags,
    clock: AnimationClock,
    overpass: Box<dyn OverpassHook>,
    painter: P,
    detector: ChangeDetector<FrameSignature>,
    refresh_epoch: u64,
    state: RepaintState,
    stacks: CellStacks,
    last_stats: PassStats,
}

impl<S: RasterSurface> Tilemap<BufferPainter<S>> {
    pub fn software(config: TilemapConfig) -> Result<Self, TilemapConfigError> {
        Self::with_painter(config, BufferPainter::new)
    }
}

impl Tilemap<QuadBatchPainter> {
    pub fn quads(config: TilemapConfig) -> Result<Self, TilemapConfigError> {
        Self::with_painter(config, |_, _| QuadBatchPainter::new())
    }

    /// Uniform for `tile_quad.wgsl` at the current origin and frame.
    pub fn tile_anim(&self, tileset_width: u32, tileset_height: u32) -> TileAnimUniform {
        let (offset_x, offset_y) = self.viewport.layer_offset();
        let (screen_width, screen_height) = self.viewport.screen_size();
        TileAnimUniform {
            layer_offset: [offset_x as f32, offset_y as f32],
            screen_size: [screen_width as f32, screen_height as f32],
            anim_offset: self.anim_offset(),
            tileset_size: [tileset_width as f32, tileset_height as f32],
        }
    }

    pub fn anim_offset(&self) -> [f32; 2] {
        tile_anim_offset(self.clock.frame(), self.tile_size)
    }
}

impl<P> Tilemap<P> {
    pub fn with_painter(
        config: TilemapConfig,
        make_painter: impl FnOnce(&ScrollViewport, TileSize) -> P,
    ) -> Result<Self, TilemapConfigError> {
        let (tile_size, viewport) = config.validate().inspect_err(|error| {
            warn!(%error, "tilemap configuration rejected");
        })?;
        let painter = make_painter(&viewport, tile_size);
        let mut map = MapData::default();
        map.set_wrap(config.horizontal_wrap, config.vertical_wrap);
        Ok(Self {
            config,
            tile_size,
            viewport,
            map,
            flags: TilesetFlags::default(),
            clock: AnimationClock::new(),
            overpass: Box::new(NoOverpass),
            painter,
            detector: ChangeDetector::new(),
            refresh_epoch: 0,
            state: RepaintState::Dirty,
            stacks: CellStacks::default(),
            last_stats: PassStats::default(),
        })
    }

    pub fn config(&self) -> &TilemapConfig {
        &self.config
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn viewport(&self) -> &ScrollViewport {
        &self.viewport
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn flags(&self) -> &TilesetFlags {
        &self.flags
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    pub fn repaint_state(&self) -> RepaintState {
        self.state
    }

    /// Statistics of the most recent pass.
    pub fn last_stats(&self) -> PassStats {
        self.last_stats
    }

    pub fn set_data(&mut self, width: u32, height: u32, data: Vec<u32>) -> Result<(), MapDataError> {
        self.map.set_data(width, height, data)?;
        self.refresh();
        Ok(())
    }

    pub fn set_flags(&mut self, flags: TilesetFlags) {
        self.flags = flags;
        self.refresh();
    }

    pub fn set_wrap(&mut self, horizontal_wrap: bool, vertical_wrap: bool) {
        self.config.horizontal_wrap = horizontal_wrap;
        self.config.vertical_wrap = vertical_wrap;
        self.map.set_wrap(horizontal_wrap, vertical_wrap);
        self.refresh();
    }

    pub fn set_overpass_hook(&mut self, hook: impl OverpassHook + 'static) {
        self.overpass = Box::new(hook);
        self.refresh();
    }

    pub fn set_origin(&mut self, x: f64, y: f64) -> Result<(), ViewportError> {
        let previous_start = self.viewport.start_cell();
        self.viewport.set_origin(x, y)?;
        if self.viewport.start_cell() != previous_start {
            self.state = RepaintState::Dirty;
        }
        Ok(())
    }

    pub fn origin(&self) -> (i32, i32) {
        self.viewport.origin()
    }

    /// Forces the next `render` to repaint every visible cell.
    pub fn refresh(&mut self) {
        self.refresh_epoch = self
            .refresh_epoch
            .checked_add(1)
            .expect("refresh epoch overflow");
        self.state = RepaintState::Dirty;
    }

    /// True once every bound tileset has finished loading.
    pub fn is_ready<S: TilesetImage>(&self, tilesets: &TilesetBindings<S>) -> bool {
        tilesets.is_ready()
    }

    /// Where the software backing buffer lands on the layer this frame.
    pub fn layer_segments(&self) -> Vec<LayerSegment> {
        self.viewport.wrap_segments()
    }

    /// Screen position of quad space this frame.
    pub fn layer_offset(&self) -> (i32, i32) {
        self.viewport.layer_offset()
    }

    /// Advances the animation clock by one tick. A new frame only dirties
    /// painters that bake animation into their output.
    pub fn update(&mut self)
    where
        P: TilePainter,
    {
        if self.clock.tick() && P::REPAINTS_ON_ANIMATION {
            self.state = RepaintState::Dirty;
        }
    }

    pub fn set_animation_ticks(&mut self, ticks: u64)
    where
        P: TilePainter,
    {
        let previous_frame = self.clock.frame();
        self.clock.set_ticks(ticks);
        if self.clock.frame() != previous_frame && P::REPAINTS_ON_ANIMATION {
            self.state = RepaintState::Dirty;
        }
    }

    /// Runs a pass when anything visible changed; returns whether one ran.
    pub fn render<S>(&mut self, tilesets: &TilesetBindings<S>) -> bool
    where
        S: TilesetImage,
        P: CellPainter<S>,
    {
        let start_cell = self.viewport.start_cell();
        let signature = FrameSignature {
            start_cell,
            tileset_generation: tilesets.generation(),
            ready_mask: tilesets.ready_mask(),
            refresh_epoch: self.refresh_epoch,
            animation_frame: P::REPAINTS_ON_ANIMATION.then(|| self.clock.frame()),
        };
        let (frame_updated, full_repaint) = match self.detector.observe(signature) {
            Observation::Unchanged => {
                self.state = RepaintState::Clean;
                return false;
            }
            Observation::First => (true, true),
            Observation::Changed { previous } => (
                previous.animation_frame != signature.animation_frame,
                signature.invalidates_cache(&previous),
            ),
        };

        self.state = RepaintState::Repainting;
        let phase = if P::REPAINTS_ON_ANIMATION {
            self.clock.phase()
        } else {
            AnimationPhase::STILL
        };
        let context = PassContext {
            start_cell,
            phase,
            frame_updated,
            full_repaint,
            tile_size: self.tile_size,
            flags: &self.flags,
        };
        let resolver = TileStackResolver::new(&self.map, &self.flags, &*self.overpass);
        let (start_x, start_y) = start_cell;

        self.painter.begin_pass(&context);
        for row in 0..self.viewport.visible_rows() {
            for column in 0..self.viewport.visible_columns() {
                let map_x = start_x + column as i32;
                let map_y = start_y + row as i32;
                resolver.resolve_into(map_x, map_y, &mut self.stacks);
                let (buffer_x, buffer_y) = self.viewport.buffer_position(map_x, map_y);
                let cell = CellPaint {
                    map_x,
                    map_y,
                    column,
                    row,
                    buffer_x,
                    buffer_y,
                    stacks: &self.stacks,
                };
                self.painter.paint_cell(&context, &cell, tilesets);
            }
        }
        self.last_stats = self.painter.finish_pass();
        self.state = RepaintState::Clean;

        debug!(
            start_x,
            start_y,
            frame_updated,
            full_repaint,
            visited = self.last_stats.visited_cells,
            repainted = self.last_stats.repainted_cells,
            draws = self.last_stats.draws(),
            skipped = self.last_stats.skipped_draws,
            "tilemap pass"
        );
        true
    }
}
