use std::fmt;

use bitflags::bitflags;

// Tile id bands, half-open: [TILE_ID_B, TILE_ID_C) is band B and so on.
// A5 sits below A1 on purpose; only A1..A4 are autotiles.
pub const TILE_ID_B: u32 = 0;
pub const TILE_ID_C: u32 = 256;
pub const TILE_ID_D: u32 = 512;
pub const TILE_ID_E: u32 = 768;
pub const TILE_ID_A5: u32 = 1536;
pub const TILE_ID_A1: u32 = 2048;
pub const TILE_ID_A2: u32 = 2816;
pub const TILE_ID_A3: u32 = 4352;
pub const TILE_ID_A4: u32 = 5888;
pub const TILE_ID_MAX: u32 = 8192;

pub const PLANE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    pub const EMPTY: Self = TileId(0);

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for TileId {
    fn from(raw: u32) -> Self {
        TileId(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapPlane {
    GroundA,
    GroundB,
    DecorA,
    DecorB,
    ShadowBits,
}

impl MapPlane {
    pub const ALL: [MapPlane; PLANE_COUNT] = [
        MapPlane::GroundA,
        MapPlane::GroundB,
        MapPlane::DecorA,
        MapPlane::DecorB,
        MapPlane::ShadowBits,
    ];

    pub const fn index(self) -> usize {
        match self {
            MapPlane::GroundA => 0,
            MapPlane::GroundB => 1,
            MapPlane::DecorA => 2,
            MapPlane::DecorB => 3,
            MapPlane::ShadowBits => 4,
        }
    }
}

bitflags! {
    /// Per-tile flag word as stored in the tileset definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TileFlags: u16 {
        const BLOCK_DOWN = 0x0001;
        const BLOCK_LEFT = 0x0002;
        const BLOCK_RIGHT = 0x0004;
        const BLOCK_UP = 0x0008;
        /// Drawn in the upper stratum, above characters.
        const HIGHER = 0x0010;
        const LADDER = 0x0020;
        const BUSH = 0x0040;
        /// Counter/desk tile; only meaningful inside band A2.
        const TABLE = 0x0080;
        const DAMAGE_FLOOR = 0x0100;
        const BOAT_BLOCK = 0x0200;
        const SHIP_BLOCK = 0x0400;
        const AIRSHIP_LAND_BLOCK = 0x0800;
        const TERRAIN_TAG = 0xF000;
    }
}

impl TileFlags {
    pub const fn terrain_tag(self) -> u8 {
        (self.bits() >> 12) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilesetFlags {
    flags: Box<[TileFlags]>,
}

impl TilesetFlags {
    pub fn from_raw(raw_flags: &[u16]) -> Self {
        Self {
            flags: raw_flags
                .iter()
                .map(|raw| TileFlags::from_bits_retain(*raw))
                .collect(),
        }
    }

    /// Ids without an entry report no flags.
    pub fn get(&self, tile_id: TileId) -> TileFlags {
        self.flags
            .get(tile_id.0 as usize)
            .copied()
            .unwrap_or_else(TileFlags::empty)
    }

    pub fn is_higher(&self, tile_id: TileId) -> bool {
        self.get(tile_id).contains(TileFlags::HIGHER)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDataError {
    SizeOverflow,
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for MapDataError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapDataError::SizeOverflow => write!(formatter, "map dimensions overflow"),
            MapDataError::LengthMismatch { expected, actual } => write!(
                formatter,
                "map data length mismatch: expected {expected} values, got {actual}"
            ),
        }
    }
}

impl std::error::Error for MapDataError {}

/// Plane-major map storage: `plane * height * width + y * width + x`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapData {
    width: u32,
    height: u32,
    cells: Box<[u32]>,
    horizontal_wrap: bool,
    vertical_wrap: bool,
}

impl MapData {
    pub fn new(width: u32, height: u32, data: Vec<u32>) -> Result<Self, MapDataError> {
        let mut map = Self::default();
        map.set_data(width, height, data)?;
        Ok(map)
    }

    pub fn set_data(&mut self, width: u32, height: u32, data: Vec<u32>) -> Result<(), MapDataError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|cells| cells.checked_mul(PLANE_COUNT))
            .ok_or(MapDataError::SizeOverflow)?;
        if data.len() != expected {
            return Err(MapDataError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        self.width = width;
        self.height = height;
        self.cells = data.into_boxed_slice();
        Ok(())
    }

    pub fn set_wrap(&mut self, horizontal_wrap: bool, vertical_wrap: bool) {
        self.horizontal_wrap = horizontal_wrap;
        self.vertical_wrap = vertical_wrap;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn horizontal_wrap(&self) -> bool {
        self.horizontal_wrap
    }

    pub fn vertical_wrap(&self) -> bool {
        self.vertical_wrap
    }

    /// Reads one plane value; cells outside the map read as 0 unless the axis wraps.
    pub fn read(&self, x: i32, y: i32, plane: MapPlane) -> u32 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let width = i64::from(self.width);
        let height = i64::from(self.height);
        let mut x = i64::from(x);
        let mut y = i64::from(y);
        if self.horizontal_wrap {
            x = x.rem_euclid(width);
        }
        if self.vertical_wrap {
            y = y.rem_euclid(height);
        }
        if x < 0 || x >= width || y < 0 || y >= height {
            return 0;
        }
        let index = (plane.index() as i64 * height + y) * width + x;
        self.cells[index as usize]
    }

    pub fn tile(&self, x: i32, y: i32, plane: MapPlane) -> TileId {
        TileId(self.read(x, y, plane))
    }
}
