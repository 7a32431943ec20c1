//! Tile id classification.
//!
//! Pure predicates over tile ids. Ids outside every band (0 and anything at or
//! above `TILE_ID_MAX`) classify as non-matching rather than failing.

use model::{
    TILE_ID_A1, TILE_ID_A2, TILE_ID_A3, TILE_ID_A4, TILE_ID_A5, TILE_ID_B, TILE_ID_C, TILE_ID_D,
    TILE_ID_E, TILE_ID_MAX, TileFlags, TileId, TilesetFlags,
};
use static_assertions::{const_assert, const_assert_eq};

pub const AUTOTILE_SHAPES: u32 = 48;

const_assert!(TILE_ID_A5 < TILE_ID_A1);
const_assert!(TILE_ID_A1 < TILE_ID_A2 && TILE_ID_A2 < TILE_ID_A3 && TILE_ID_A3 < TILE_ID_A4);
const_assert!(TILE_ID_A4 < TILE_ID_MAX);
const_assert_eq!((TILE_ID_A2 - TILE_ID_A1) % AUTOTILE_SHAPES, 0);
const_assert_eq!((TILE_ID_A3 - TILE_ID_A1) % AUTOTILE_SHAPES, 0);
const_assert_eq!((TILE_ID_A4 - TILE_ID_A1) % AUTOTILE_SHAPES, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileBand {
    B,
    C,
    D,
    E,
    A5,
    A1,
    A2,
    A3,
    A4,
}

impl TileBand {
    /// Band of a visible id; `None` for id 0 and ids past `TILE_ID_MAX`.
    pub fn of(tile_id: TileId) -> Option<TileBand> {
        if !is_visible_tile(tile_id) {
            return None;
        }
        let raw = tile_id.raw();
        let band = if raw < TILE_ID_C {
            TileBand::B
        } else if raw < TILE_ID_D {
            TileBand::C
        } else if raw < TILE_ID_E {
            TileBand::D
        } else if raw < TILE_ID_A5 {
            TileBand::E
        } else if raw < TILE_ID_A1 {
            TileBand::A5
        } else if raw < TILE_ID_A2 {
            TileBand::A1
        } else if raw < TILE_ID_A3 {
            TileBand::A2
        } else if raw < TILE_ID_A4 {
            TileBand::A3
        } else {
            TileBand::A4
        };
        Some(band)
    }

    pub const fn first_id(self) -> u32 {
        match self {
            TileBand::B => TILE_ID_B,
            TileBand::C => TILE_ID_C,
            TileBand::D => TILE_ID_D,
            TileBand::E => TILE_ID_E,
            TileBand::A5 => TILE_ID_A5,
            TileBand::A1 => TILE_ID_A1,
            TileBand::A2 => TILE_ID_A2,
            TileBand::A3 => TILE_ID_A3,
            TileBand::A4 => TILE_ID_A4,
        }
    }

    pub const fn is_autotile(self) -> bool {
        matches!(
            self,
            TileBand::A1 | TileBand::A2 | TileBand::A3 | TileBand::A4
        )
    }
}

pub fn is_visible_tile(tile_id: TileId) -> bool {
    tile_id.raw() > 0 && tile_id.raw() < TILE_ID_MAX
}

pub fn is_autotile(tile_id: TileId) -> bool {
    tile_id.raw() >= TILE_ID_A1 && tile_id.raw() < TILE_ID_MAX
}

/// Autotile kind; only meaningful when `is_autotile` holds.
pub fn autotile_kind(tile_id: TileId) -> u32 {
    tile_id.raw().saturating_sub(TILE_ID_A1) / AUTOTILE_SHAPES
}

/// Autotile shape in `0..48`; only meaningful when `is_autotile` holds.
pub fn autotile_shape(tile_id: TileId) -> u32 {
    tile_id.raw().saturating_sub(TILE_ID_A1) % AUTOTILE_SHAPES
}

pub fn make_autotile_id(kind: u32, shape: u32) -> TileId {
    TileId(TILE_ID_A1 + kind * AUTOTILE_SHAPES + shape)
}

pub fn is_same_kind_tile(first: TileId, second: TileId) -> bool {
    if is_autotile(first) && is_autotile(second) {
        autotile_kind(first) == autotile_kind(second)
    } else {
        first == second
    }
}

pub fn is_tile_a1(tile_id: TileId) -> bool {
    (TILE_ID_A1..TILE_ID_A2).contains(&tile_id.raw())
}

pub fn is_tile_a2(tile_id: TileId) -> bool {
    (TILE_ID_A2..TILE_ID_A3).contains(&tile_id.raw())
}

pub fn is_tile_a3(tile_id: TileId) -> bool {
    (TILE_ID_A3..TILE_ID_A4).contains(&tile_id.raw())
}

pub fn is_tile_a4(tile_id: TileId) -> bool {
    (TILE_ID_A4..TILE_ID_MAX).contains(&tile_id.raw())
}

pub fn is_tile_a5(tile_id: TileId) -> bool {
    (TILE_ID_A5..TILE_ID_A1).contains(&tile_id.raw())
}

/// A1 tiles except the fixed kinds 2 and 3 (deep water decorations).
pub fn is_water_tile(tile_id: TileId) -> bool {
    is_tile_a1(tile_id)
        && !(TILE_ID_A1 + 96..TILE_ID_A1 + 192).contains(&tile_id.raw())
}

pub fn is_waterfall_tile(tile_id: TileId) -> bool {
    (TILE_ID_A1 + 192..TILE_ID_A2).contains(&tile_id.raw()) && autotile_kind(tile_id) % 2 == 1
}

pub fn is_ground_tile(tile_id: TileId) -> bool {
    is_tile_a1(tile_id) || is_tile_a2(tile_id) || is_tile_a5(tile_id)
}

pub fn is_shadowing_tile(tile_id: TileId) -> bool {
    is_tile_a3(tile_id) || is_tile_a4(tile_id)
}

pub fn is_roof_tile(tile_id: TileId) -> bool {
    is_tile_a3(tile_id) && autotile_kind(tile_id) % 16 < 8
}

pub fn is_wall_top_tile(tile_id: TileId) -> bool {
    is_tile_a4(tile_id) && autotile_kind(tile_id) % 16 < 8
}

pub fn is_wall_side_tile(tile_id: TileId) -> bool {
    (is_tile_a3(tile_id) || is_tile_a4(tile_id)) && autotile_kind(tile_id) % 16 >= 8
}

pub fn is_wall_tile(tile_id: TileId) -> bool {
    is_wall_top_tile(tile_id) || is_wall_side_tile(tile_id)
}

pub fn is_floor_type_autotile(tile_id: TileId) -> bool {
    (is_tile_a1(tile_id) && !is_waterfall_tile(tile_id))
        || is_tile_a2(tile_id)
        || is_wall_top_tile(tile_id)
}

pub fn is_wall_type_autotile(tile_id: TileId) -> bool {
    is_roof_tile(tile_id) || is_wall_side_tile(tile_id)
}

pub fn is_waterfall_type_autotile(tile_id: TileId) -> bool {
    is_waterfall_tile(tile_id)
}

pub fn is_higher_tile(tile_id: TileId, flags: &TilesetFlags) -> bool {
    flags.is_higher(tile_id)
}

pub fn is_table_tile(tile_id: TileId, flags: &TilesetFlags) -> bool {
    is_tile_a2(tile_id) && flags.get(tile_id).contains(TileFlags::TABLE)
}
