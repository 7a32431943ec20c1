//! Quarter offset tables.
//!
//! Each entry lists the `(column, row)` of the four quarter tiles (top-left,
//! top-right, bottom-left, bottom-right) inside an autotile's block, in units
//! of half a tile.

use static_assertions::const_assert_eq;

pub type QuarterOffsets = [(u8, u8); 4];

pub const FLOOR_AUTOTILE_TABLE: [QuarterOffsets; 48] = [
    [(2, 4), (1, 4), (2, 3), (1, 3)],
    [(2, 0), (1, 4), (2, 3), (1, 3)],
    [(2, 4), (3, 0), (2, 3), (1, 3)],
    [(2, 0), (3, 0), (2, 3), (1, 3)],
    [(2, 4), (1, 4), (2, 3), (3, 1)],
    [(2, 0), (1, 4), (2, 3), (3, 1)],
    [(2, 4), (3, 0), (2, 3), (3, 1)],
    [(2, 0), (3, 0), (2, 3), (3, 1)],
    [(2, 4), (1, 4), (2, 1), (1, 3)],
    [(2, 0), (1, 4), (2, 1), (1, 3)],
    [(2, 4), (3, 0), (2, 1), (1, 3)],
    [(2, 0), (3, 0), (2, 1), (1, 3)],
    [(2, 4), (1, 4), (2, 1), (3, 1)],
    [(2, 0), (1, 4), (2, 1), (3, 1)],
    [(2, 4), (3, 0), (2, 1), (3, 1)],
    [(2, 0), (3, 0), (2, 1), (3, 1)],
    [(0, 4), (1, 4), (0, 3), (1, 3)],
    [(0, 4), (3, 0), (0, 3), (1, 3)],
    [(0, 4), (1, 4), (0, 3), (3, 1)],
    [(0, 4), (3, 0), (0, 3), (3, 1)],
    [(2, 2), (1, 2), (2, 3), (1, 3)],
    [(2, 2), (1, 2), (2, 3), (3, 1)],
    [(2, 2), (1, 2), (2, 1), (1, 3)],
    [(2, 2), (1, 2), (2, 1), (3, 1)],
    [(2, 4), (3, 4), (2, 3), (3, 3)],
    [(2, 4), (3, 4), (2, 1), (3, 3)],
    [(2, 0), (3, 4), (2, 3), (3, 3)],
    [(2, 0), (3, 4), (2, 1), (3, 3)],
    [(2, 4), (1, 4), (2, 5), (1, 5)],
    [(2, 0), (1, 4), (2, 5), (1, 5)],
    [(2, 4), (3, 0), (2, 5), (1, 5)],
    [(2, 0), (3, 0), (2, 5), (1, 5)],
    [(0, 4), (3, 4), (0, 3), (3, 3)],
    [(2, 2), (1, 2), (2, 5), (1, 5)],
    [(0, 2), (1, 2), (0, 3), (1, 3)],
    [(0, 2), (1, 2), (0, 3), (3, 1)],
    [(2, 2), (3, 2), (2, 3), (3, 3)],
    [(2, 2), (3, 2), (2, 1), (3, 3)],
    [(2, 4), (3, 4), (2, 5), (3, 5)],
    [(2, 0), (3, 4), (2, 5), (3, 5)],
    [(0, 4), (1, 4), (0, 5), (1, 5)],
    [(0, 4), (3, 0), (0, 5), (1, 5)],
    [(0, 2), (3, 2), (0, 3), (3, 3)],
    [(0, 2), (1, 2), (0, 5), (1, 5)],
    [(0, 4), (3, 4), (0, 5), (3, 5)],
    [(2, 2), (3, 2), (2, 5), (3, 5)],
    [(0, 2), (3, 2), (0, 5), (3, 5)],
    [(0, 0), (1, 0), (0, 1), (1, 1)],
];

pub const WALL_AUTOTILE_TABLE: [QuarterOffsets; 16] = [
    [(2, 2), (1, 2), (2, 1), (1, 1)],
    [(0, 2), (1, 2), (0, 1), (1, 1)],
    [(2, 0), (1, 0), (2, 1), (1, 1)],
    [(0, 0), (1, 0), (0, 1), (1, 1)],
    [(2, 2), (3, 2), (2, 1), (3, 1)],
    [(0, 2), (3, 2), (0, 1), (3, 1)],
    [(2, 0), (3, 0), (2, 1), (3, 1)],
    [(0, 0), (3, 0), (0, 1), (3, 1)],
    [(2, 2), (1, 2), (2, 3), (1, 3)],
    [(0, 2), (1, 2), (0, 3), (1, 3)],
    [(2, 0), (1, 0), (2, 3), (1, 3)],
    [(0, 0), (1, 0), (0, 3), (1, 3)],
    [(2, 2), (3, 2), (2, 3), (3, 3)],
    [(0, 2), (3, 2), (0, 3), (3, 3)],
    [(2, 0), (3, 0), (2, 3), (3, 3)],
    [(0, 0), (3, 0), (0, 3), (3, 3)],
];

pub const WATERFALL_AUTOTILE_TABLE: [QuarterOffsets; 4] = [
    [(2, 0), (1, 0), (2, 1), (1, 1)],
    [(0, 0), (1, 0), (0, 1), (1, 1)],
    [(2, 0), (3, 0), (2, 1), (3, 1)],
    [(0, 0), (3, 0), (0, 1), (3, 1)],
];

const_assert_eq!(FLOOR_AUTOTILE_TABLE.len(), 48);
const_assert_eq!(WALL_AUTOTILE_TABLE.len(), 16);
const_assert_eq!(WATERFALL_AUTOTILE_TABLE.len(), 4);
