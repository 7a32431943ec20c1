//! Quad batch compositor.
//!
//! Records one textured quad per draw op instead of touching pixels. Animated
//! autotiles are planned at the still phase; each quad keeps its animation
//! step and the shader adds `step * anim_offset` to the source position, so
//! ticking the clock never rebuilds the batch.

use render_protocol::{PixelRect, TILESET_COUNT, TilesetBindings, TilesetImage};
use serde::Serialize;
use tiles::{AnimStep, AnimationPhase, DrawOp};

use crate::painter::{
    CellPaint, CellPainter, PassContext, PassStats, TilePainter, log_missing_tileset, plan_stack,
};
use crate::stack::Stratum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TilesetSlot {
    Image(u8),
    /// Untextured half-transparent black quad.
    Shadow,
}

/// `dest` is in quad space, whose origin is the start cell's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuadRecord {
    pub slot: TilesetSlot,
    #[serde(serialize_with = "serialize_rect")]
    pub source: PixelRect,
    #[serde(serialize_with = "serialize_rect")]
    pub dest: PixelRect,
    #[serde(serialize_with = "serialize_anim")]
    pub anim: AnimStep,
}

/// Quads of one stratum in draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuadLayer {
    records: Vec<QuadRecord>,
}

impl QuadLayer {
    pub fn records(&self) -> &[QuadRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tileset(&self, index: usize) -> impl Iterator<Item = &QuadRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| record.slot == TilesetSlot::Image(index as u8))
    }

    pub fn shadows(&self) -> impl Iterator<Item = &QuadRecord> + '_ {
        self.records
            .iter()
            .filter(|record| record.slot == TilesetSlot::Shadow)
    }

    /// Quad count per tileset index.
    pub fn tileset_counts(&self) -> [usize; TILESET_COUNT] {
        let mut counts = [0; TILESET_COUNT];
        for record in &self.records {
            if let TilesetSlot::Image(index) = record.slot {
                counts[index as usize] += 1;
            }
        }
        counts
    }

    fn clear(&mut self) {
        self.records.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuadBatchPainter {
    layers: [QuadLayer; 2],
    ops: Vec<DrawOp>,
    stats: PassStats,
    /// Bumps every pass so GPU uploads can skip unchanged batches.
    revision: u64,
}

impl QuadBatchPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, stratum: Stratum) -> &QuadLayer {
        &self.layers[stratum.index()]
    }

    pub fn lower(&self) -> &QuadLayer {
        self.layer(Stratum::Lower)
    }

    pub fn upper(&self) -> &QuadLayer {
        self.layer(Stratum::Upper)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn record_stratum<S: TilesetImage>(
        &mut self,
        stratum: Stratum,
        context: &PassContext<'_>,
        cell: &CellPaint<'_>,
        tilesets: &TilesetBindings<S>,
    ) {
        let dest_x = cell.column * context.tile_size.width();
        let dest_y = cell.row * context.tile_size.height();
        let mut ops = std::mem::take(&mut self.ops);
        ops.clear();
        plan_stack(
            cell.stacks.stratum(stratum),
            context,
            AnimationPhase::STILL,
            dest_x,
            dest_y,
            &mut ops,
            &mut self.stats,
        );
        if !ops.is_empty() {
            self.stats.repainted_cells += 1;
        }

        let layer = &mut self.layers[stratum.index()];
        for op in &ops {
            match *op {
                DrawOp::Blit {
                    tileset,
                    source,
                    dest,
                    anim,
                } => {
                    if tilesets.ready(tileset).is_none() {
                        log_missing_tileset(tileset, context.tile_size, dest_x, dest_y);
                        self.stats.skipped_draws += 1;
                        continue;
                    }
                    layer.records.push(QuadRecord {
                        slot: TilesetSlot::Image(tileset as u8),
                        source,
                        dest,
                        anim,
                    });
                    self.stats.blits += 1;
                }
                DrawOp::Shadow { dest } => {
                    layer.records.push(QuadRecord {
                        slot: TilesetSlot::Shadow,
                        source: PixelRect::default(),
                        dest,
                        anim: AnimStep::NONE,
                    });
                    self.stats.fills += 1;
                }
            }
        }
        self.ops = ops;
    }
}

impl TilePainter for QuadBatchPainter {
    const REPAINTS_ON_ANIMATION: bool = false;

    fn begin_pass(&mut self, _context: &PassContext<'_>) {
        for layer in &mut self.layers {
            layer.clear();
        }
        self.stats = PassStats::default();
        self.revision = self.revision.wrapping_add(1);
    }

    fn finish_pass(&mut self) -> PassStats {
        std::mem::take(&mut self.stats)
    }
}

impl<S: TilesetImage> CellPainter<S> for QuadBatchPainter {
    fn paint_cell(
        &mut self,
        context: &PassContext<'_>,
        cell: &CellPaint<'_>,
        tilesets: &TilesetBindings<S>,
    ) {
        self.stats.visited_cells += 1;
        for stratum in Stratum::ALL {
            self.record_stratum(stratum, context, cell, tilesets);
        }
    }
}

fn serialize_rect<Ser: serde::Serializer>(
    rect: &PixelRect,
    serializer: Ser,
) -> Result<Ser::Ok, Ser::Error> {
    [rect.x, rect.y, rect.width, rect.height].serialize(serializer)
}

fn serialize_anim<Ser: serde::Serializer>(
    anim: &AnimStep,
    serializer: Ser,
) -> Result<Ser::Ok, Ser::Error> {
    [anim.x, anim.y].serialize(serializer)
}
