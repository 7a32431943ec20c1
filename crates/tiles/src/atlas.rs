//! Tile id to tileset sub-rectangle planning.
//!
//! Every drawable stack entry is turned into a short list of [`DrawOp`]s that
//! both compositors consume: the software path executes them as blits and
//! fills, the quad path records them as instances.

use std::fmt;

use model::{TileId, TilesetFlags};
use render_protocol::{PixelRect, TILESET_A1, TILESET_A2, TILESET_A3, TILESET_A4, TILESET_A5, TILESET_B};

use crate::TileSize;
use crate::autotile_table::{
    FLOOR_AUTOTILE_TABLE, QuarterOffsets, WALL_AUTOTILE_TABLE, WATERFALL_AUTOTILE_TABLE,
};
use crate::classify::{
    autotile_kind, autotile_shape, is_autotile, is_table_tile, is_tile_a1, is_tile_a2,
    is_tile_a3, is_tile_a4, is_tile_a5, is_visible_tile,
};

pub const WATER_SURFACE_SEQUENCE: [u32; 4] = [0, 1, 2, 1];
pub const WATERFALL_PHASES: u64 = 3;

const TABLE_EDGE_COLUMN: [u8; 4] = [0, 3, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnimationPhase {
    /// Water surface column step, one of `WATER_SURFACE_SEQUENCE`.
    pub water: u32,
    pub waterfall: u32,
}

impl AnimationPhase {
    pub const STILL: Self = Self {
        water: 0,
        waterfall: 0,
    };

    pub fn from_frame(frame: u64) -> Self {
        Self {
            water: WATER_SURFACE_SEQUENCE[(frame % WATER_SURFACE_SEQUENCE.len() as u64) as usize],
            waterfall: (frame % WATERFALL_PHASES) as u32,
        }
    }
}

/// Per-quad animation multiplier in tile units, applied by the quad shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnimStep {
    pub x: u8,
    pub y: u8,
}

impl AnimStep {
    pub const NONE: Self = Self { x: 0, y: 0 };
    pub const WATER: Self = Self { x: 2, y: 0 };
    pub const WATERFALL: Self = Self { x: 0, y: 1 };

    pub const fn is_animated(self) -> bool {
        self.x != 0 || self.y != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawOp {
    Blit {
        tileset: usize,
        source: PixelRect,
        dest: PixelRect,
        anim: AnimStep,
    },
    /// Half-transparent black over `dest`.
    Shadow { dest: PixelRect },
}

impl DrawOp {
    pub fn dest(&self) -> PixelRect {
        match self {
            DrawOp::Blit { dest, .. } | DrawOp::Shadow { dest } => *dest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutotileTableKind {
    Floor,
    Wall,
    Waterfall,
}

impl AutotileTableKind {
    pub fn entry(self, shape: u32) -> Option<&'static QuarterOffsets> {
        let shape = shape as usize;
        match self {
            AutotileTableKind::Floor => FLOOR_AUTOTILE_TABLE.get(shape),
            AutotileTableKind::Wall => WALL_AUTOTILE_TABLE.get(shape),
            AutotileTableKind::Waterfall => WATERFALL_AUTOTILE_TABLE.get(shape),
        }
    }
}

/// Where an autotile kind lives inside its tileset, in whole-tile blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AutotilePlacement {
    pub tileset: usize,
    pub block_x: u32,
    pub block_y: u32,
    pub table: AutotileTableKind,
    pub anim: AnimStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeOutOfTable {
    pub tile_id: TileId,
    pub table: AutotileTableKind,
    pub shape: u32,
}

impl fmt::Display for ShapeOutOfTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "tile {} has shape {} outside the {:?} autotile table",
            self.tile_id.raw(),
            self.shape,
            self.table
        )
    }
}

impl std::error::Error for ShapeOutOfTable {}

/// Returns `None` for ids outside A1..A4.
pub fn autotile_placement(tile_id: TileId, phase: AnimationPhase) -> Option<AutotilePlacement> {
    if !is_autotile(tile_id) {
        return None;
    }
    let kind = autotile_kind(tile_id);
    let tx = kind % 8;
    let ty = kind / 8;

    if is_tile_a1(tile_id) {
        let water_x = phase.water * 2;
        let mut placement = AutotilePlacement {
            tileset: TILESET_A1,
            block_x: 0,
            block_y: 0,
            table: AutotileTableKind::Floor,
            anim: AnimStep::NONE,
        };
        match kind {
            0 => {
                placement.block_x = water_x;
                placement.anim = AnimStep::WATER;
            }
            1 => {
                placement.block_x = water_x;
                placement.block_y = 3;
                placement.anim = AnimStep::WATER;
            }
            2 => placement.block_x = 6,
            3 => {
                placement.block_x = 6;
                placement.block_y = 3;
            }
            _ => {
                placement.block_x = (tx / 4) * 8;
                placement.block_y = ty * 6 + ((tx / 2) % 2) * 3;
                if kind % 2 == 0 {
                    placement.block_x += water_x;
                    placement.anim = AnimStep::WATER;
                } else {
                    placement.block_x += 6;
                    placement.block_y += phase.waterfall;
                    placement.table = AutotileTableKind::Waterfall;
                    placement.anim = AnimStep::WATERFALL;
                }
            }
        }
        return Some(placement);
    }

    let placement = if is_tile_a2(tile_id) {
        AutotilePlacement {
            tileset: TILESET_A2,
            block_x: tx * 2,
            block_y: (ty - 2) * 3,
            table: AutotileTableKind::Floor,
            anim: AnimStep::NONE,
        }
    } else if is_tile_a3(tile_id) {
        AutotilePlacement {
            tileset: TILESET_A3,
            block_x: tx * 2,
            block_y: (ty - 6) * 2,
            table: AutotileTableKind::Wall,
            anim: AnimStep::NONE,
        }
    } else {
        debug_assert!(is_tile_a4(tile_id));
        let odd_row = ty % 2 == 1;
        AutotilePlacement {
            tileset: TILESET_A4,
            block_x: tx * 2,
            // floor(row * 2.5 + 0.5) for odd rows, floor(row * 2.5) otherwise
            block_y: ((ty - 10) * 5 + u32::from(odd_row)) / 2,
            table: if odd_row {
                AutotileTableKind::Wall
            } else {
                AutotileTableKind::Floor
            },
            anim: AnimStep::NONE,
        }
    };
    Some(placement)
}

/// Tileset index and source rectangle of a non-autotile id.
///
/// E-band ids past the first 256 resolve to slots beyond the bound tilesets
/// and end up skipped as missing images.
pub fn normal_tile_source(tile_id: TileId, size: TileSize) -> (usize, PixelRect) {
    let raw = tile_id.raw();
    let tileset = if is_tile_a5(tile_id) {
        TILESET_A5
    } else {
        TILESET_B + (raw / 256) as usize
    };
    let column = ((raw / 128) % 2) * 8 + raw % 8;
    let row = ((raw % 256) / 8) % 16;
    let source = PixelRect::new(
        column * size.width(),
        row * size.height(),
        size.width(),
        size.height(),
    );
    (tileset, source)
}

/// Plans one tile id at cell origin `(dest_x, dest_y)`. Invisible ids plan nothing.
pub fn plan_tile(
    tile_id: TileId,
    flags: &TilesetFlags,
    phase: AnimationPhase,
    size: TileSize,
    dest_x: u32,
    dest_y: u32,
    ops: &mut Vec<DrawOp>,
) -> Result<(), ShapeOutOfTable> {
    if !is_visible_tile(tile_id) {
        return Ok(());
    }
    if is_autotile(tile_id) {
        return plan_autotile(
            tile_id,
            is_table_tile(tile_id, flags),
            phase,
            size,
            dest_x,
            dest_y,
            ops,
        );
    }
    let (tileset, source) = normal_tile_source(tile_id, size);
    ops.push(DrawOp::Blit {
        tileset,
        source,
        dest: PixelRect::new(dest_x, dest_y, size.width(), size.height()),
        anim: AnimStep::NONE,
    });
    Ok(())
}

pub fn plan_autotile(
    tile_id: TileId,
    is_table: bool,
    phase: AnimationPhase,
    size: TileSize,
    dest_x: u32,
    dest_y: u32,
    ops: &mut Vec<DrawOp>,
) -> Result<(), ShapeOutOfTable> {
    let Some(placement) = autotile_placement(tile_id, phase) else {
        return Ok(());
    };
    let shape = autotile_shape(tile_id);
    let quarters = placement.table.entry(shape).ok_or(ShapeOutOfTable {
        tile_id,
        table: placement.table,
        shape,
    })?;

    let quarter_width = size.quarter_width();
    let quarter_height = size.quarter_height();
    let quarter_source = |column: u32, row: u32, height: u32| {
        PixelRect::new(
            (placement.block_x * 2 + column) * quarter_width,
            (placement.block_y * 2 + row) * quarter_height,
            quarter_width,
            height,
        )
    };

    for (index, &(column, row)) in quarters.iter().enumerate() {
        let index = index as u32;
        let quarter_x = dest_x + (index % 2) * quarter_width;
        let quarter_y = dest_y + (index / 2) * quarter_height;
        let (column, row) = (u32::from(column), u32::from(row));
        let source = quarter_source(column, row, quarter_height);

        if is_table && (row == 1 || row == 5) {
            let leg_column = if row == 1 {
                u32::from(TABLE_EDGE_COLUMN[column as usize])
            } else {
                column
            };
            ops.push(DrawOp::Blit {
                tileset: placement.tileset,
                source: quarter_source(leg_column, 3, quarter_height),
                dest: PixelRect::new(quarter_x, quarter_y, quarter_width, quarter_height),
                anim: placement.anim,
            });
            let half = quarter_height / 2;
            ops.push(DrawOp::Blit {
                tileset: placement.tileset,
                source: PixelRect::new(source.x, source.y, quarter_width, half),
                dest: PixelRect::new(quarter_x, quarter_y + half, quarter_width, half),
                anim: placement.anim,
            });
        } else {
            ops.push(DrawOp::Blit {
                tileset: placement.tileset,
                source,
                dest: PixelRect::new(quarter_x, quarter_y, quarter_width, quarter_height),
                anim: placement.anim,
            });
        }
    }
    Ok(())
}

/// Front edge of the table standing in the cell above, drawn over the top half
/// of the current cell. Ids outside A2 plan nothing.
pub fn plan_table_edge(
    upper_tile_id: TileId,
    size: TileSize,
    dest_x: u32,
    dest_y: u32,
    ops: &mut Vec<DrawOp>,
) {
    if !is_tile_a2(upper_tile_id) {
        return;
    }
    let kind = autotile_kind(upper_tile_id);
    let block_x = (kind % 8) * 2;
    let block_y = (kind / 8 - 2) * 3;
    let quarters = &FLOOR_AUTOTILE_TABLE[autotile_shape(upper_tile_id) as usize];

    let quarter_width = size.quarter_width();
    let quarter_height = size.quarter_height();
    let half = quarter_height / 2;
    for (index, &(column, row)) in quarters[2..].iter().enumerate() {
        let index = index as u32;
        ops.push(DrawOp::Blit {
            tileset: TILESET_A2,
            source: PixelRect::new(
                (block_x * 2 + u32::from(column)) * quarter_width,
                (block_y * 2 + u32::from(row)) * quarter_height + half,
                quarter_width,
                half,
            ),
            dest: PixelRect::new(dest_x + index * quarter_width, dest_y, quarter_width, half),
            anim: AnimStep::NONE,
        });
    }
}

/// Bits 0..4 of `shadow_bits` select the quarters to darken.
pub fn plan_shadow(shadow_bits: u8, size: TileSize, dest_x: u32, dest_y: u32, ops: &mut Vec<DrawOp>) {
    let quarter_width = size.quarter_width();
    let quarter_height = size.quarter_height();
    for index in 0..4u32 {
        if shadow_bits & (1 << index) == 0 {
            continue;
        }
        ops.push(DrawOp::Shadow {
            dest: PixelRect::new(
                dest_x + (index % 2) * quarter_width,
                dest_y + (index / 2) * quarter_height,
                quarter_width,
                quarter_height,
            ),
        });
    }
}
