//! Layered autotile map rendering.
//!
//! `Tilemap` owns the map, the scroll viewport and the animation clock, and
//! drives one of two painters over the visible cells:
//! - `BufferPainter`: software compositing into two wrapping backing buffers
//!   with a per-cell memo of the last painted stack.
//! - `QuadBatchPainter`: per-stratum quad lists for `tile_quad.wgsl`, with
//!   animation applied in the shader.
//!
//! `stack` resolves the per-cell lower/upper stacks both painters consume.

mod buffer_painter;
mod change;
mod clock;
mod config;
mod gpu;
mod painter;
mod quad_batch;
mod stack;
mod tilemap;

pub use buffer_painter::BufferPainter;
pub use change::{ChangeDetector, FrameSignature, Observation};
pub use clock::{AnimationClock, TICKS_PER_ANIMATION_FRAME};
pub use config::{DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, TilemapConfig, TilemapConfigError};
pub use gpu::{
    QuadInstanceBuffer, QuadInstanceGpu, SHADOW_TILESET_LAYER, TileAnimUniform, TileQuadPipeline,
    tile_anim_offset,
};
pub use painter::{CellPaint, CellPainter, PassContext, PassStats, TilePainter};
pub use quad_batch::{QuadBatchPainter, QuadLayer, QuadRecord, TilesetSlot};
pub use stack::{
    CellStacks, NoOverpass, OverpassHook, StackEntry, Stratum, TileStack, TileStackResolver,
};
pub use tilemap::{RepaintState, Tilemap};

pub const TILE_QUAD_WGSL: &str = include_str!("tile_quad.wgsl");

#[cfg(test)]
mod tests;
#[cfg(test)]
mod wgsl_tests;
