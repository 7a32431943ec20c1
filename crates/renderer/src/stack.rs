//! Per-cell tile stacks.
//!
//! Each visible cell splits its five plane values into a lower stratum (under
//! characters) and an upper stratum (over characters). The stacks double as
//! the software painter's change key, so empty ids stay in them.

use model::{MapData, MapPlane, TileId, TilesetFlags};
use smallvec::SmallVec;
use tiles::{is_shadowing_tile, is_table_tile, is_tile_a1};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackEntry {
    Tile(TileId),
    /// Raw shadow plane value; the low four bits pick the darkened quarters.
    Shadow(u32),
    /// Front edge of the table tile standing in the cell above.
    TableEdge(TileId),
}

pub type TileStack = SmallVec<[StackEntry; 6]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stratum {
    Lower,
    Upper,
}

impl Stratum {
    pub const ALL: [Stratum; 2] = [Stratum::Lower, Stratum::Upper];

    pub const fn index(self) -> usize {
        match self {
            Stratum::Lower => 0,
            Stratum::Upper => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStacks {
    pub lower: TileStack,
    pub upper: TileStack,
}

impl CellStacks {
    pub fn clear(&mut self) {
        self.lower.clear();
        self.upper.clear();
    }

    pub fn stratum(&self, stratum: Stratum) -> &TileStack {
        match stratum {
            Stratum::Lower => &self.lower,
            Stratum::Upper => &self.upper,
        }
    }

    /// True when the lower stack holds an animated A1 tile.
    pub fn lower_has_a1(&self) -> bool {
        self.lower
            .iter()
            .any(|entry| matches!(entry, StackEntry::Tile(tile_id) if is_tile_a1(*tile_id)))
    }
}

/// Cells where characters walk under decorations (bridges and the like).
pub trait OverpassHook {
    fn is_overpass(&self, map_x: i32, map_y: i32) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverpass;

impl OverpassHook for NoOverpass {
    fn is_overpass(&self, _map_x: i32, _map_y: i32) -> bool {
        false
    }
}

impl<F> OverpassHook for F
where
    F: Fn(i32, i32) -> bool,
{
    fn is_overpass(&self, map_x: i32, map_y: i32) -> bool {
        self(map_x, map_y)
    }
}

pub struct TileStackResolver<'a> {
    map: &'a MapData,
    flags: &'a TilesetFlags,
    overpass: &'a dyn OverpassHook,
}

impl<'a> TileStackResolver<'a> {
    pub fn new(map: &'a MapData, flags: &'a TilesetFlags, overpass: &'a dyn OverpassHook) -> Self {
        Self {
            map,
            flags,
            overpass,
        }
    }

    pub fn resolve(&self, map_x: i32, map_y: i32) -> CellStacks {
        let mut stacks = CellStacks::default();
        self.resolve_into(map_x, map_y, &mut stacks);
        stacks
    }

    /// The table edge looks at decorA of the cell above. RPG Maker MV reads
    /// groundB there, so maps that keep tables on groundB get no edge.
    pub fn resolve_into(&self, map_x: i32, map_y: i32, stacks: &mut CellStacks) {
        stacks.clear();
        let ground_a = self.map.tile(map_x, map_y, MapPlane::GroundA);
        let ground_b = self.map.tile(map_x, map_y, MapPlane::GroundB);
        let decor_a = self.map.tile(map_x, map_y, MapPlane::DecorA);
        let decor_b = self.map.tile(map_x, map_y, MapPlane::DecorB);
        let shadow_bits = self.map.read(map_x, map_y, MapPlane::ShadowBits);
        let decor_a_above = self.map.tile(map_x, map_y.wrapping_sub(1), MapPlane::DecorA);

        self.push_by_height(stacks, ground_a);
        self.push_by_height(stacks, ground_b);

        stacks.lower.push(StackEntry::Shadow(shadow_bits));

        if is_table_tile(decor_a_above, self.flags)
            && !is_table_tile(decor_a, self.flags)
            && !is_shadowing_tile(ground_a)
        {
            stacks.lower.push(StackEntry::TableEdge(decor_a_above));
        }

        if self.overpass.is_overpass(map_x, map_y) {
            stacks.upper.push(StackEntry::Tile(decor_a));
            stacks.upper.push(StackEntry::Tile(decor_b));
        } else {
            self.push_by_height(stacks, decor_a);
            self.push_by_height(stacks, decor_b);
        }
    }

    fn push_by_height(&self, stacks: &mut CellStacks, tile_id: TileId) {
        if self.flags.is_higher(tile_id) {
            stacks.upper.push(StackEntry::Tile(tile_id));
        } else {
            stacks.lower.push(StackEntry::Tile(tile_id));
        }
    }
}
