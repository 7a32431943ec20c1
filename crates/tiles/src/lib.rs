use std::fmt;

pub const DEFAULT_TILE_WIDTH: u32 = 48;
pub const DEFAULT_TILE_HEIGHT: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSizeError {
    Zero,
    /// Quarters are half a tile wide.
    WidthNotEven { width: u32 },
    /// Table edges sample a quarter of a quarter, so heights must split in four.
    HeightNotMultipleOfFour { height: u32 },
}

impl fmt::Display for TileSizeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSizeError::Zero => write!(formatter, "tile size must be non-zero"),
            TileSizeError::WidthNotEven { width } => {
                write!(formatter, "tile width {width} must be even")
            }
            TileSizeError::HeightNotMultipleOfFour { height } => {
                write!(formatter, "tile height {height} must be a multiple of 4")
            }
        }
    }
}

impl std::error::Error for TileSizeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSize {
    width: u32,
    height: u32,
}

impl TileSize {
    pub const DEFAULT: Self = Self {
        width: DEFAULT_TILE_WIDTH,
        height: DEFAULT_TILE_HEIGHT,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, TileSizeError> {
        if width == 0 || height == 0 {
            return Err(TileSizeError::Zero);
        }
        if width % 2 != 0 {
            return Err(TileSizeError::WidthNotEven { width });
        }
        if height % 4 != 0 {
            return Err(TileSizeError::HeightNotMultipleOfFour { height });
        }
        Ok(Self { width, height })
    }

    pub const fn width(self) -> u32 {
        self.width
    }

    pub const fn height(self) -> u32 {
        self.height
    }

    pub const fn quarter_width(self) -> u32 {
        self.width / 2
    }

    pub const fn quarter_height(self) -> u32 {
        self.height / 2
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

mod atlas;
mod autotile_table;
mod classify;

pub use atlas::{
    AnimStep, AnimationPhase, AutotilePlacement, AutotileTableKind, DrawOp, ShapeOutOfTable,
    WATER_SURFACE_SEQUENCE, WATERFALL_PHASES, autotile_placement, normal_tile_source,
    plan_autotile, plan_shadow, plan_table_edge, plan_tile,
};
pub use autotile_table::{
    FLOOR_AUTOTILE_TABLE, QuarterOffsets, WALL_AUTOTILE_TABLE, WATERFALL_AUTOTILE_TABLE,
};
pub use classify::{
    AUTOTILE_SHAPES, TileBand, autotile_kind, autotile_shape, is_autotile, is_floor_type_autotile,
    is_ground_tile, is_higher_tile, is_roof_tile, is_same_kind_tile, is_shadowing_tile,
    is_table_tile, is_tile_a1, is_tile_a2, is_tile_a3, is_tile_a4, is_tile_a5, is_visible_tile,
    is_wall_side_tile, is_wall_tile, is_wall_top_tile, is_wall_type_autotile, is_water_tile,
    is_waterfall_tile, is_waterfall_type_autotile, make_autotile_id,
};
