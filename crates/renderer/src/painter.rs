use model::TilesetFlags;
use render_protocol::TilesetBindings;
use tiles::{AnimationPhase, DrawOp, TileSize, plan_shadow, plan_table_edge, plan_tile};
use tracing::trace;

use crate::stack::{CellStacks, StackEntry};

/// Inputs shared by every cell of one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub start_cell: (i32, i32),
    pub phase: AnimationPhase,
    /// The animation frame differs from the previous pass.
    pub frame_updated: bool,
    /// Cached cell state from earlier passes must not be trusted.
    pub full_repaint: bool,
    pub tile_size: TileSize,
    pub flags: &'a TilesetFlags,
}

/// One visible cell handed to a painter.
#[derive(Debug, Clone, Copy)]
pub struct CellPaint<'a> {
    pub map_x: i32,
    pub map_y: i32,
    /// Position inside the visible grid, starting at the start cell.
    pub column: u32,
    pub row: u32,
    /// Top-left pixel of the cell inside the wrapping backing buffer.
    pub buffer_x: u32,
    pub buffer_y: u32,
    pub stacks: &'a CellStacks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassStats {
    pub visited_cells: u32,
    /// Stratum cells whose output was rebuilt; a cell counts once per stratum.
    pub repainted_cells: u32,
    pub clears: u32,
    pub blits: u32,
    pub fills: u32,
    /// Draws dropped because their tileset was missing or not ready, or the
    /// shape had no table entry.
    pub skipped_draws: u32,
}

impl PassStats {
    pub fn draws(&self) -> u32 {
        self.blits + self.fills
    }
}

/// Pass lifecycle shared by both backends.
pub trait TilePainter {
    /// Whether a new animation frame alone requires a pass.
    const REPAINTS_ON_ANIMATION: bool;

    fn begin_pass(&mut self, context: &PassContext<'_>);

    fn finish_pass(&mut self) -> PassStats;
}

pub trait CellPainter<S>: TilePainter {
    fn paint_cell(
        &mut self,
        context: &PassContext<'_>,
        cell: &CellPaint<'_>,
        tilesets: &TilesetBindings<S>,
    );
}

/// Expands a stack into draw ops anchored at `(dest_x, dest_y)`, evaluating
/// animated autotiles at `phase`.
pub(crate) fn plan_stack<'a>(
    entries: impl IntoIterator<Item = &'a StackEntry>,
    context: &PassContext<'_>,
    phase: AnimationPhase,
    dest_x: u32,
    dest_y: u32,
    ops: &mut Vec<DrawOp>,
    stats: &mut PassStats,
) {
    let tile_size = context.tile_size;
    for entry in entries {
        match *entry {
            StackEntry::Tile(tile_id) => {
                if let Err(error) = plan_tile(
                    tile_id,
                    context.flags,
                    phase,
                    tile_size,
                    dest_x,
                    dest_y,
                    ops,
                ) {
                    trace!(%error, "autotile draw skipped");
                    stats.skipped_draws += 1;
                }
            }
            StackEntry::Shadow(bits) => {
                plan_shadow((bits & 0x0f) as u8, tile_size, dest_x, dest_y, ops);
            }
            StackEntry::TableEdge(upper_tile_id) => {
                plan_table_edge(upper_tile_id, tile_size, dest_x, dest_y, ops);
            }
        }
    }
}

pub(crate) fn log_missing_tileset(tileset: usize, tile_size: TileSize, dest_x: u32, dest_y: u32) {
    trace!(
        tileset,
        cell_x = dest_x / tile_size.width(),
        cell_y = dest_y / tile_size.height(),
        "tileset missing or not ready; draw skipped"
    );
}
