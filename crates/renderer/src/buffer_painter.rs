//! Software compositor.
//!
//! Paints into two persistent backing buffers (lower and upper stratum) that
//! wrap toroidally around the visible grid. Each buffer cell remembers the
//! stack it last painted; a pass only touches cells whose stack changed, plus
//! lower cells holding A1 tiles when the animation frame moved on.

use bitvec::prelude::{BitVec, Lsb0};
use render_protocol::{PixelRect, RasterSurface, Rgba8, TilesetBindings};
use tiles::{DrawOp, TileSize};
use view::ScrollViewport;

use crate::painter::{
    CellPaint, CellPainter, PassContext, PassStats, TilePainter, log_missing_tileset, plan_stack,
};
use crate::stack::{Stratum, TileStack};

pub struct BufferPainter<S> {
    lower: S,
    upper: S,
    columns: u32,
    rows: u32,
    tile_size: TileSize,
    /// Last painted stack per `(stratum, buffer row, buffer column)`.
    painted: Vec<Option<TileStack>>,
    repainted: [BitVec<usize, Lsb0>; 2],
    ops: Vec<DrawOp>,
    stats: PassStats,
}

impl<S: RasterSurface> BufferPainter<S> {
    pub fn new(viewport: &ScrollViewport, tile_size: TileSize) -> Self {
        let columns = viewport.visible_columns();
        let rows = viewport.visible_rows();
        let (width, height) = viewport.backing_size();
        let cell_count = (columns as usize)
            .checked_mul(rows as usize)
            .expect("backing grid size overflow");
        Self {
            lower: S::blank(width, height),
            upper: S::blank(width, height),
            columns,
            rows,
            tile_size,
            painted: vec![None; cell_count * Stratum::ALL.len()],
            repainted: [
                BitVec::repeat(false, cell_count),
                BitVec::repeat(false, cell_count),
            ],
            ops: Vec::new(),
            stats: PassStats::default(),
        }
    }

    pub fn lower(&self) -> &S {
        &self.lower
    }

    pub fn upper(&self) -> &S {
        &self.upper
    }

    pub fn layer(&self, stratum: Stratum) -> &S {
        match stratum {
            Stratum::Lower => &self.lower,
            Stratum::Upper => &self.upper,
        }
    }

    pub fn grid_size(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Buffer cells rebuilt by the last pass, row-major over the backing grid.
    pub fn repainted(&self, stratum: Stratum) -> &BitVec<usize, Lsb0> {
        &self.repainted[stratum.index()]
    }

    pub fn was_repainted(&self, stratum: Stratum, buffer_column: u32, buffer_row: u32) -> bool {
        self.repainted[stratum.index()]
            .get(self.grid_index(buffer_column, buffer_row))
            .is_some_and(|bit| *bit)
    }

    /// Drops every remembered stack so the next pass repaints all cells.
    pub fn invalidate(&mut self) {
        self.painted.fill(None);
    }

    fn grid_index(&self, buffer_column: u32, buffer_row: u32) -> usize {
        buffer_row as usize * self.columns as usize + buffer_column as usize
    }

    fn cache_index(&self, stratum: Stratum, grid_index: usize) -> usize {
        stratum.index() * self.columns as usize * self.rows as usize + grid_index
    }

    fn paint_stratum(
        &mut self,
        stratum: Stratum,
        context: &PassContext<'_>,
        cell: &CellPaint<'_>,
        tilesets: &TilesetBindings<S>,
    ) {
        let stack = cell.stacks.stratum(stratum);
        let grid_index = self.grid_index(
            cell.buffer_x / self.tile_size.width(),
            cell.buffer_y / self.tile_size.height(),
        );
        let cache_index = self.cache_index(stratum, grid_index);
        let unchanged = self.painted[cache_index].as_ref() == Some(stack);
        let animates =
            stratum == Stratum::Lower && context.frame_updated && cell.stacks.lower_has_a1();
        if unchanged && !animates {
            return;
        }

        let cell_rect = PixelRect::new(
            cell.buffer_x,
            cell.buffer_y,
            self.tile_size.width(),
            self.tile_size.height(),
        );
        let mut ops = std::mem::take(&mut self.ops);
        ops.clear();
        plan_stack(
            stack,
            context,
            context.phase,
            cell.buffer_x,
            cell.buffer_y,
            &mut ops,
            &mut self.stats,
        );

        let target = match stratum {
            Stratum::Lower => &mut self.lower,
            Stratum::Upper => &mut self.upper,
        };
        target.clear_rect(cell_rect);
        self.stats.clears += 1;
        for op in &ops {
            match *op {
                DrawOp::Blit {
                    tileset,
                    source,
                    dest,
                    ..
                } => match tilesets.ready(tileset) {
                    Some(image) => {
                        target.blit(image, source, dest.x, dest.y);
                        self.stats.blits += 1;
                    }
                    None => {
                        log_missing_tileset(tileset, self.tile_size, cell.buffer_x, cell.buffer_y);
                        self.stats.skipped_draws += 1;
                    }
                },
                DrawOp::Shadow { dest } => {
                    target.blend_fill_rect(dest, Rgba8::SHADOW);
                    self.stats.fills += 1;
                }
            }
        }
        self.ops = ops;

        self.painted[cache_index] = Some(stack.clone());
        self.repainted[stratum.index()].set(grid_index, true);
        self.stats.repainted_cells += 1;
    }
}

impl<S: RasterSurface> TilePainter for BufferPainter<S> {
    const REPAINTS_ON_ANIMATION: bool = true;

    fn begin_pass(&mut self, context: &PassContext<'_>) {
        if context.full_repaint {
            self.invalidate();
        }
        for bits in &mut self.repainted {
            bits.fill(false);
        }
        self.stats = PassStats::default();
    }

    fn finish_pass(&mut self) -> PassStats {
        std::mem::take(&mut self.stats)
    }
}

impl<S: RasterSurface> CellPainter<S> for BufferPainter<S> {
    fn paint_cell(
        &mut self,
        context: &PassContext<'_>,
        cell: &CellPaint<'_>,
        tilesets: &TilesetBindings<S>,
    ) {
        self.stats.visited_cells += 1;
        for stratum in Stratum::ALL {
            self.paint_stratum(stratum, context, cell, tilesets);
        }
    }
}
