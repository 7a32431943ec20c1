//! Tilemap pass tests.
//!
//! Both painters run against small in-memory maps; no GPU device is needed.

use model::{MapPlane, PLANE_COUNT, TILE_ID_A1, TILE_ID_A2, TILE_ID_MAX, TilesetFlags};
use pretty_assertions::assert_eq;
use render_protocol::{
    PixelRect, RasterSurface, Rgba8, RgbaSurface, TILESET_A1, TILESET_COUNT, TilesetBindings,
};
use tiles::AnimStep;

use super::*;

const TILESET_COLOR: Rgba8 = Rgba8::new(255, 0, 255, 255);

fn small_config() -> TilemapConfig {
    TilemapConfig {
        screen_width: 96,
        screen_height: 96,
        margin: 0,
        ..TilemapConfig::default()
    }
}

fn ready_tilesets() -> TilesetBindings<RgbaSurface> {
    let mut tilesets = TilesetBindings::new();
    for index in 0..TILESET_COUNT {
        tilesets
            .bind(index, RgbaSurface::filled(768, 768, TILESET_COLOR))
            .expect("bind tileset");
    }
    tilesets
}

fn map_data(width: u32, height: u32, cells: &[(u32, u32, MapPlane, u32)]) -> Vec<u32> {
    let mut data = vec![0; (width * height) as usize * PLANE_COUNT];
    for &(x, y, plane, value) in cells {
        data[(plane.index() * height as usize + y as usize) * width as usize + x as usize] = value;
    }
    data
}

fn software(width: u32, height: u32, cells: &[(u32, u32, MapPlane, u32)]) -> Tilemap<BufferPainter<RgbaSurface>> {
    let mut tilemap = Tilemap::software(small_config()).expect("software tilemap");
    tilemap
        .set_data(width, height, map_data(width, height, cells))
        .expect("set map data");
    tilemap
}

fn quads(width: u32, height: u32, cells: &[(u32, u32, MapPlane, u32)]) -> Tilemap<QuadBatchPainter> {
    let mut tilemap = Tilemap::quads(small_config()).expect("quad tilemap");
    tilemap
        .set_data(width, height, map_data(width, height, cells))
        .expect("set map data");
    tilemap
}

fn flags_with(entries: &[(u32, u16)]) -> TilesetFlags {
    let mut raw = vec![0u16; TILE_ID_MAX as usize];
    for &(tile_id, flag) in entries {
        raw[tile_id as usize] = flag;
    }
    TilesetFlags::from_raw(&raw)
}

/// Half-transparent black; blending may round alpha down by one.
fn assert_shadow(pixel: Rgba8) {
    assert_eq!((pixel.r, pixel.g, pixel.b), (0, 0, 0));
    assert!((127..=128).contains(&pixel.a), "shadow alpha {}", pixel.a);
}

fn quad(tileset: u8, source: (u32, u32, u32, u32), dest: (u32, u32, u32, u32), anim: AnimStep) -> QuadRecord {
    QuadRecord {
        slot: TilesetSlot::Image(tileset),
        source: PixelRect::new(source.0, source.1, source.2, source.3),
        dest: PixelRect::new(dest.0, dest.1, dest.2, dest.3),
        anim,
    }
}

#[test]
fn empty_map_draws_nothing_in_either_backend() {
    let tilesets = ready_tilesets();

    let mut tilemap = software(2, 2, &[]);
    assert!(tilemap.render(&tilesets));
    let stats = tilemap.last_stats();
    assert_eq!(stats.visited_cells, 9);
    assert_eq!(stats.draws(), 0);
    assert_eq!(stats.skipped_draws, 0);
    assert_eq!(tilemap.painter().lower().pixel(0, 0), Rgba8::TRANSPARENT);

    let mut tilemap = quads(2, 2, &[]);
    assert!(tilemap.render(&tilesets));
    assert!(tilemap.painter().lower().is_empty());
    assert!(tilemap.painter().upper().is_empty());
}

#[test]
fn first_a1_tile_draws_four_quarters() {
    let tilesets = ready_tilesets();
    let cells = [(0, 0, MapPlane::GroundA, TILE_ID_A1)];

    let mut tilemap = software(2, 2, &cells);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.last_stats().blits, 4);
    assert_eq!(tilemap.painter().lower().pixel(0, 0), TILESET_COLOR);
    assert_eq!(tilemap.painter().lower().pixel(47, 47), TILESET_COLOR);
    assert_eq!(tilemap.painter().lower().pixel(48, 0), Rgba8::TRANSPARENT);
    assert_eq!(tilemap.painter().upper().pixel(0, 0), Rgba8::TRANSPARENT);

    let mut tilemap = quads(2, 2, &cells);
    tilemap.render(&tilesets);
    assert_eq!(
        tilemap.painter().lower().records(),
        &[
            quad(0, (48, 96, 24, 24), (0, 0, 24, 24), AnimStep::WATER),
            quad(0, (24, 96, 24, 24), (24, 0, 24, 24), AnimStep::WATER),
            quad(0, (48, 72, 24, 24), (0, 24, 24, 24), AnimStep::WATER),
            quad(0, (24, 72, 24, 24), (24, 24, 24, 24), AnimStep::WATER),
        ]
    );
    assert_eq!(tilemap.painter().lower().tileset_counts()[TILESET_A1], 4);
}

#[test]
fn unchanged_inputs_skip_the_second_pass() {
    let tilesets = ready_tilesets();
    let cells = [
        (0, 0, MapPlane::GroundA, TILE_ID_A1),
        (1, 0, MapPlane::DecorA, 17),
        (1, 1, MapPlane::ShadowBits, 0b0110),
    ];

    let mut tilemap = software(2, 2, &cells);
    assert!(tilemap.render(&tilesets));
    let lower_mutations = tilemap.painter().lower().mutation_count();
    let upper_mutations = tilemap.painter().upper().mutation_count();
    assert!(!tilemap.render(&tilesets));
    tilemap.set_origin(10.0, 30.0).expect("origin inside start cell");
    assert!(!tilemap.render(&tilesets));
    assert_eq!(tilemap.painter().lower().mutation_count(), lower_mutations);
    assert_eq!(tilemap.painter().upper().mutation_count(), upper_mutations);

    let mut tilemap = quads(2, 2, &cells);
    tilemap.render(&tilesets);
    let lower = tilemap.painter().lower().clone();
    let revision = tilemap.painter().revision();
    assert!(!tilemap.render(&tilesets));
    assert_eq!(tilemap.painter().lower(), &lower);
    assert_eq!(tilemap.painter().revision(), revision);
}

#[test]
fn scrolling_repaints_only_cells_that_changed() {
    let tilesets = ready_tilesets();
    let mut tilemap = software(4, 3, &[(0, 0, MapPlane::GroundA, TILE_ID_A1)]);
    tilemap.render(&tilesets);

    tilemap.set_origin(48.0, 0.0).expect("origin");
    assert!(tilemap.render(&tilesets));
    let stats = tilemap.last_stats();
    assert_eq!(stats.visited_cells, 9);
    // Map column 3 lands on the buffer column that held column 0.
    assert_eq!(stats.repainted_cells, 1);
    assert!(tilemap.painter().was_repainted(Stratum::Lower, 0, 0));
    assert_eq!(tilemap.painter().lower().pixel(0, 0), Rgba8::TRANSPARENT);
}

#[test]
fn table_above_draws_edge_in_top_half() {
    let tilesets = ready_tilesets();
    let table = TILE_ID_A2;
    let mut tilemap = quads(1, 2, &[(0, 0, MapPlane::DecorA, table)]);
    tilemap.set_flags(flags_with(&[(table, 0x80)]));
    tilemap.render(&tilesets);

    let edge: Vec<QuadRecord> = tilemap
        .painter()
        .lower()
        .tileset(1)
        .filter(|record| record.dest.y >= 48)
        .copied()
        .collect();
    assert_eq!(
        edge,
        vec![
            quad(1, (48, 84, 24, 12), (0, 48, 24, 12), AnimStep::NONE),
            quad(1, (24, 84, 24, 12), (24, 48, 24, 12), AnimStep::NONE),
        ]
    );

    let mut tilemap = software(1, 2, &[(0, 0, MapPlane::DecorA, table)]);
    tilemap.set_flags(flags_with(&[(table, 0x80)]));
    tilemap.render(&tilesets);
    let lower = tilemap.painter().lower();
    assert_eq!(lower.pixel(0, 48), TILESET_COLOR);
    assert_eq!(lower.pixel(47, 59), TILESET_COLOR);
    assert_eq!(lower.pixel(0, 60), Rgba8::TRANSPARENT);
}

#[test]
fn animation_frame_repaints_only_a1_cells() {
    let tilesets = ready_tilesets();
    let mut tilemap = software(
        3,
        3,
        &[
            (0, 0, MapPlane::GroundA, TILE_ID_A1),
            (1, 1, MapPlane::GroundA, TILE_ID_A1 + 48),
            (2, 2, MapPlane::GroundA, 40),
        ],
    );
    tilemap.render(&tilesets);

    for _ in 0..TICKS_PER_ANIMATION_FRAME - 1 {
        tilemap.update();
    }
    assert!(!tilemap.render(&tilesets));

    tilemap.update();
    assert_eq!(tilemap.repaint_state(), RepaintState::Dirty);
    assert!(tilemap.render(&tilesets));
    let stats = tilemap.last_stats();
    assert_eq!(stats.repainted_cells, 2);
    assert_eq!(stats.blits, 8);
    assert!(tilemap.painter().was_repainted(Stratum::Lower, 0, 0));
    assert!(tilemap.painter().was_repainted(Stratum::Lower, 1, 1));
    assert!(!tilemap.painter().was_repainted(Stratum::Lower, 2, 2));
    assert!(!tilemap.painter().was_repainted(Stratum::Upper, 0, 0));
}

#[test]
fn quad_batch_ignores_animation_ticks() {
    let tilesets = ready_tilesets();
    let mut tilemap = quads(1, 1, &[(0, 0, MapPlane::GroundA, TILE_ID_A1)]);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.anim_offset(), [0.0, 0.0]);

    for _ in 0..TICKS_PER_ANIMATION_FRAME {
        tilemap.update();
    }
    assert_eq!(tilemap.repaint_state(), RepaintState::Clean);
    tilemap.set_animation_ticks(TICKS_PER_ANIMATION_FRAME * 5);
    assert_eq!(tilemap.repaint_state(), RepaintState::Clean);
    tilemap.set_animation_ticks(TICKS_PER_ANIMATION_FRAME);
    assert!(!tilemap.render(&tilesets));
    assert_eq!(tilemap.anim_offset(), [48.0, 48.0]);
    let uniform = tilemap.tile_anim(768, 768);
    assert_eq!(uniform.anim_offset, [48.0, 48.0]);
    assert_eq!(uniform.screen_size, [96.0, 96.0]);
}

#[test]
fn horizontal_wrap_repeats_map_columns() {
    let tilesets = ready_tilesets();
    let cells = [(0, 0, MapPlane::GroundA, TILE_ID_A1)];

    let mut tilemap = software(2, 1, &cells);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.last_stats().blits, 4);

    let mut tilemap = software(2, 1, &cells);
    tilemap.set_wrap(true, false);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.last_stats().blits, 8);
    assert_eq!(tilemap.painter().lower().pixel(96, 0), TILESET_COLOR);
}

#[test]
fn unready_tileset_is_retried_once_loaded() {
    let mut tilesets = ready_tilesets();
    tilesets
        .get_mut(TILESET_A1)
        .expect("a1 bound")
        .set_ready(false);
    let cells = [(0, 0, MapPlane::GroundA, TILE_ID_A1)];

    let mut tilemap = software(1, 1, &cells);
    assert!(!tilemap.is_ready(&tilesets));
    tilemap.render(&tilesets);
    assert_eq!(tilemap.last_stats().blits, 0);
    assert_eq!(tilemap.last_stats().skipped_draws, 4);

    tilesets
        .get_mut(TILESET_A1)
        .expect("a1 bound")
        .set_ready(true);
    assert!(tilemap.is_ready(&tilesets));
    assert!(tilemap.render(&tilesets));
    assert_eq!(tilemap.last_stats().blits, 4);
    assert_eq!(tilemap.painter().lower().pixel(0, 0), TILESET_COLOR);

    let mut tilemap = quads(1, 1, &cells);
    tilesets
        .get_mut(TILESET_A1)
        .expect("a1 bound")
        .set_ready(false);
    tilemap.render(&tilesets);
    assert!(tilemap.painter().lower().is_empty());
    tilesets
        .get_mut(TILESET_A1)
        .expect("a1 bound")
        .set_ready(true);
    assert!(tilemap.render(&tilesets));
    assert_eq!(tilemap.painter().lower().len(), 4);
}

#[test]
fn rebinding_a_tileset_repaints_everything() {
    let mut tilesets = ready_tilesets();
    let mut tilemap = software(1, 1, &[(0, 0, MapPlane::GroundA, TILE_ID_A1)]);
    tilemap.render(&tilesets);

    let blue = Rgba8::new(0, 0, 255, 255);
    tilesets
        .bind(TILESET_A1, RgbaSurface::filled(768, 768, blue))
        .expect("rebind");
    assert!(tilemap.render(&tilesets));
    assert_eq!(tilemap.last_stats().repainted_cells, 18);
    assert_eq!(tilemap.painter().lower().pixel(0, 0), blue);
}

#[test]
fn refresh_repaints_every_stratum_cell() {
    let tilesets = ready_tilesets();
    let mut tilemap = software(2, 2, &[]);
    tilemap.render(&tilesets);

    tilemap.refresh();
    assert!(tilemap.render(&tilesets));
    let stats = tilemap.last_stats();
    assert_eq!(stats.visited_cells, 9);
    assert_eq!(stats.repainted_cells, 18);
    assert_eq!(stats.clears, 18);
}

#[test]
fn repaint_state_follows_origin_and_passes() {
    let tilesets = ready_tilesets();
    let mut tilemap = software(2, 2, &[]);
    assert_eq!(tilemap.repaint_state(), RepaintState::Dirty);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.repaint_state(), RepaintState::Clean);

    tilemap.set_origin(47.0, 0.0).expect("origin");
    assert_eq!(tilemap.repaint_state(), RepaintState::Clean);
    tilemap.set_origin(48.0, 0.0).expect("origin");
    assert_eq!(tilemap.repaint_state(), RepaintState::Dirty);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.repaint_state(), RepaintState::Clean);
    assert_eq!(tilemap.layer_offset(), (0, 0));
}

#[test]
fn overpass_hook_lifts_decorations() {
    let tilesets = ready_tilesets();
    let mut tilemap = quads(2, 1, &[(0, 0, MapPlane::DecorA, 5)]);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.painter().lower().tileset_counts()[5], 1);

    tilemap.set_overpass_hook(|map_x: i32, map_y: i32| map_x == 0 && map_y == 0);
    assert!(tilemap.render(&tilesets));
    assert_eq!(tilemap.painter().lower().tileset_counts()[5], 0);
    assert_eq!(tilemap.painter().upper().tileset_counts()[5], 1);
}

#[test]
fn shadow_bits_darken_quarters() {
    let tilesets = ready_tilesets();
    let cells = [(0, 0, MapPlane::ShadowBits, 0b1001)];

    let mut tilemap = software(1, 1, &cells);
    tilemap.render(&tilesets);
    assert_eq!(tilemap.last_stats().fills, 2);
    let lower = tilemap.painter().lower();
    assert_shadow(lower.pixel(0, 0));
    assert_eq!(lower.pixel(24, 0), Rgba8::TRANSPARENT);
    assert_shadow(lower.pixel(47, 47));

    let mut tilemap = quads(1, 1, &cells);
    tilemap.render(&tilesets);
    let shadows: Vec<PixelRect> = tilemap
        .painter()
        .lower()
        .shadows()
        .map(|record| record.dest)
        .collect();
    assert_eq!(
        shadows,
        vec![PixelRect::new(0, 0, 24, 24), PixelRect::new(24, 24, 24, 24)]
    );
}

#[test]
fn set_data_rejects_wrong_length() {
    let mut tilemap = Tilemap::quads(small_config()).expect("quad tilemap");
    assert!(tilemap.set_data(2, 2, vec![0; 3]).is_err());
}

#[test]
fn invalid_config_is_rejected() {
    let config = TilemapConfig {
        tile_width: 47,
        ..small_config()
    };
    assert!(Tilemap::quads(config).is_err());

    let oversized = TilemapConfig {
        screen_width: u32::MAX - 8,
        ..TilemapConfig::default()
    };
    assert!(Tilemap::quads(oversized).is_err());
    assert!(Tilemap::<BufferPainter<RgbaSurface>>::software(oversized).is_err());
}

#[test]
fn layer_segments_follow_origin() {
    let mut tilemap = software(1, 1, &[]);
    tilemap.set_origin(100.0, 0.0).expect("origin");
    let segments = tilemap.layer_segments();
    let area: u32 = segments
        .iter()
        .map(|segment| segment.width * segment.height)
        .sum();
    assert_eq!(area, 96 * 96);
    assert_eq!(segments[0].source_x, 100);
}

#[test]
fn quad_dump_serializes_records() {
    let tilesets = ready_tilesets();
    let mut tilemap = quads(1, 1, &[(0, 0, MapPlane::GroundA, 1)]);
    tilemap.render(&tilesets);
    let json = serde_json::to_value(tilemap.painter().lower()).expect("serialize quads");
    assert_eq!(
        json,
        serde_json::json!({
            "records": [{
                "slot": { "Image": 5 },
                "source": [48, 0, 48, 48],
                "dest": [0, 0, 48, 48],
                "anim": [0, 0],
            }]
        })
    );
}

#[test]
fn blank_surface_matches_backing_size() {
    let tilemap = software(1, 1, &[]);
    assert_eq!(tilemap.painter().grid_size(), (3, 3));
    let blank = RgbaSurface::blank(144, 144);
    assert_eq!(tilemap.painter().lower().as_bytes().len(), blank.as_bytes().len());
    assert_eq!(tilemap.painter().lower().image().dimensions(), (144, 144));
}
