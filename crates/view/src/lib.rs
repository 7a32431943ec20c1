pub const DEFAULT_MARGIN: u32 = 20;

/// Largest accepted scroll origin magnitude, in pixels.
pub const MAX_ORIGIN: f64 = (1u32 << 30) as f64;

/// Scroll state of a tile layer: which map cells are visible and where the
/// fixed-size backing buffer lands on the layer.
///
/// The layer extends `margin` pixels past every screen edge so partially
/// visible cells are always painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollViewport {
    screen_width: u32,
    screen_height: u32,
    margin: u32,
    tile_width: u32,
    tile_height: u32,
    layer_width: u32,
    layer_height: u32,
    columns: u32,
    rows: u32,
    origin_x: i32,
    origin_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportError {
    ZeroTileSize,
    ZeroViewport,
    NonFiniteOrigin,
    OriginOutOfRange,
    /// Layer or backing buffer does not fit in `i32` pixels.
    TooLarge,
}

impl std::fmt::Display for ViewportError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewportError::ZeroTileSize => write!(formatter, "tile size must be non-zero"),
            ViewportError::ZeroViewport => write!(formatter, "screen size must be non-zero"),
            ViewportError::NonFiniteOrigin => write!(formatter, "scroll origin must be finite"),
            ViewportError::OriginOutOfRange => {
                write!(formatter, "scroll origin exceeds {MAX_ORIGIN} pixels")
            }
            ViewportError::TooLarge => {
                write!(formatter, "screen, margin and tile size give an oversized layer")
            }
        }
    }
}

impl std::error::Error for ViewportError {}

/// One piece of the toroidally split backing buffer.
///
/// `dest_*` is relative to the layer's top-left corner, which sits at
/// `(-margin, -margin)` on screen; `source_*` addresses the backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSegment {
    pub dest_x: u32,
    pub dest_y: u32,
    pub source_x: u32,
    pub source_y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScrollViewport {
    pub fn new(
        screen_width: u32,
        screen_height: u32,
        margin: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, ViewportError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(ViewportError::ZeroTileSize);
        }
        if screen_width == 0 || screen_height == 0 {
            return Err(ViewportError::ZeroViewport);
        }
        let margins = margin.checked_mul(2).ok_or(ViewportError::TooLarge)?;
        let (layer_width, columns) = layer_extent(screen_width, margins, tile_width)?;
        let (layer_height, rows) = layer_extent(screen_height, margins, tile_height)?;
        Ok(Self {
            screen_width,
            screen_height,
            margin,
            tile_width,
            tile_height,
            layer_width,
            layer_height,
            columns,
            rows,
            origin_x: 0,
            origin_y: 0,
        })
    }

    /// Floors the origin to whole pixels.
    pub fn set_origin(&mut self, x: f64, y: f64) -> Result<(), ViewportError> {
        let origin_x = floor_origin(x)?;
        let origin_y = floor_origin(y)?;
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        Ok(())
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    /// Screen plus the margin on both sides.
    pub fn layer_size(&self) -> (u32, u32) {
        (self.layer_width, self.layer_height)
    }

    pub fn visible_columns(&self) -> u32 {
        self.columns
    }

    pub fn visible_rows(&self) -> u32 {
        self.rows
    }

    /// Checked against `i32::MAX` at construction.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            self.columns * self.tile_width,
            self.rows * self.tile_height,
        )
    }

    /// Map cell drawn at the layer's top-left corner.
    pub fn start_cell(&self) -> (i32, i32) {
        let margin = i64::from(self.margin);
        let start_x = (i64::from(self.origin_x) - margin).div_euclid(i64::from(self.tile_width));
        let start_y = (i64::from(self.origin_y) - margin).div_euclid(i64::from(self.tile_height));
        (start_x as i32, start_y as i32)
    }

    /// Map cells covered this frame, row by row.
    pub fn visible_cells(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (start_x, start_y) = self.start_cell();
        let columns = self.visible_columns() as i32;
        let rows = self.visible_rows() as i32;
        (0..rows).flat_map(move |row| {
            (0..columns).map(move |column| (start_x + column, start_y + row))
        })
    }

    /// Pixel position of a map cell inside the wrapping backing buffer.
    pub fn buffer_position(&self, map_x: i32, map_y: i32) -> (u32, u32) {
        let (backing_width, backing_height) = self.backing_size();
        let x =
            (i64::from(map_x) * i64::from(self.tile_width)).rem_euclid(i64::from(backing_width));
        let y =
            (i64::from(map_y) * i64::from(self.tile_height)).rem_euclid(i64::from(backing_height));
        (x as u32, y as u32)
    }

    /// Column/row of a map cell inside the backing buffer grid.
    pub fn buffer_cell(&self, map_x: i32, map_y: i32) -> (u32, u32) {
        let (x, y) = self.buffer_position(map_x, map_y);
        (x / self.tile_width, y / self.tile_height)
    }

    /// Backing-buffer pixel shown at the layer's top-left corner.
    pub fn buffer_offset(&self) -> (u32, u32) {
        let (backing_width, backing_height) = self.backing_size();
        let margin = i64::from(self.margin);
        let x = (i64::from(self.origin_x) - margin).rem_euclid(i64::from(backing_width));
        let y = (i64::from(self.origin_y) - margin).rem_euclid(i64::from(backing_height));
        (x as u32, y as u32)
    }

    /// Splits the layer into at most four pieces that together show the
    /// backing buffer as a torus. Empty pieces are omitted.
    pub fn wrap_segments(&self) -> Vec<LayerSegment> {
        let (layer_width, layer_height) = self.layer_size();
        let (backing_width, backing_height) = self.backing_size();
        let (offset_x, offset_y) = self.buffer_offset();

        let first_width = (backing_width - offset_x).min(layer_width);
        let first_height = (backing_height - offset_y).min(layer_height);
        let second_width = layer_width - first_width;
        let second_height = layer_height - first_height;

        let candidates = [
            LayerSegment {
                dest_x: 0,
                dest_y: 0,
                source_x: offset_x,
                source_y: offset_y,
                width: first_width,
                height: first_height,
            },
            LayerSegment {
                dest_x: first_width,
                dest_y: 0,
                source_x: 0,
                source_y: offset_y,
                width: second_width,
                height: first_height,
            },
            LayerSegment {
                dest_x: 0,
                dest_y: first_height,
                source_x: offset_x,
                source_y: 0,
                width: first_width,
                height: second_height,
            },
            LayerSegment {
                dest_x: first_width,
                dest_y: first_height,
                source_x: 0,
                source_y: 0,
                width: second_width,
                height: second_height,
            },
        ];
        candidates
            .into_iter()
            .filter(|segment| segment.width > 0 && segment.height > 0)
            .collect()
    }

    /// Screen position of quad space, whose origin is the start cell's corner.
    pub fn layer_offset(&self) -> (i32, i32) {
        let (start_x, start_y) = self.start_cell();
        let x = i64::from(start_x) * i64::from(self.tile_width) - i64::from(self.origin_x);
        let y = i64::from(start_y) * i64::from(self.tile_height) - i64::from(self.origin_y);
        (x as i32, y as i32)
    }
}

/// Layer length along one axis and the cell count covering it plus one
/// spare cell; the backing length must stay addressable as `i32`.
fn layer_extent(screen: u32, margins: u32, tile: u32) -> Result<(u32, u32), ViewportError> {
    let layer = screen.checked_add(margins).ok_or(ViewportError::TooLarge)?;
    let cells = layer
        .div_ceil(tile)
        .checked_add(1)
        .ok_or(ViewportError::TooLarge)?;
    let backing = cells.checked_mul(tile).ok_or(ViewportError::TooLarge)?;
    i32::try_from(backing).map_err(|_| ViewportError::TooLarge)?;
    Ok((layer, cells))
}

fn floor_origin(value: f64) -> Result<i32, ViewportError> {
    if !value.is_finite() {
        return Err(ViewportError::NonFiniteOrigin);
    }
    let floored = value.floor();
    if floored.abs() > MAX_ORIGIN {
        return Err(ViewportError::OriginOutOfRange);
    }
    Ok(floored as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> ScrollViewport {
        ScrollViewport::new(816, 624, DEFAULT_MARGIN, 48, 48).expect("viewport")
    }

    #[test]
    fn grid_covers_layer_plus_one_cell() {
        let viewport = viewport();
        assert_eq!(viewport.layer_size(), (856, 664));
        assert_eq!(viewport.visible_columns(), 19);
        assert_eq!(viewport.visible_rows(), 15);
        assert_eq!(viewport.backing_size(), (912, 720));
        assert_eq!(viewport.visible_cells().count(), 19 * 15);
    }

    #[test]
    fn start_cell_floors_toward_negative_infinity() {
        let mut viewport = viewport();
        assert_eq!(viewport.start_cell(), (-1, -1));

        viewport.set_origin(20.0, 67.9).expect("origin");
        assert_eq!(viewport.origin(), (20, 67));
        assert_eq!(viewport.start_cell(), (0, 0));

        viewport.set_origin(-0.5, 116.0).expect("origin");
        assert_eq!(viewport.start_cell(), (-1, 2));
    }

    #[test]
    fn buffer_position_wraps_negative_cells() {
        let viewport = viewport();
        assert_eq!(viewport.buffer_position(0, 0), (0, 0));
        assert_eq!(viewport.buffer_position(19, 15), (0, 0));
        assert_eq!(viewport.buffer_position(-1, -1), (864, 672));
        assert_eq!(viewport.buffer_cell(-1, 16), (18, 1));
    }

    #[test]
    fn segments_cover_layer_exactly() {
        let mut viewport = viewport();
        viewport.set_origin(500.0, 300.0).expect("origin");
        let segments = viewport.wrap_segments();
        assert_eq!(segments.len(), 4);
        let area: u32 = segments
            .iter()
            .map(|segment| segment.width * segment.height)
            .sum();
        assert_eq!(area, 856 * 664);

        let first = segments[0];
        assert_eq!((first.source_x, first.source_y), (480, 280));
        assert_eq!((first.width, first.height), (432, 440));
        let last = segments[3];
        assert_eq!((last.dest_x, last.dest_y), (432, 440));
        assert_eq!((last.source_x, last.source_y), (0, 0));
    }

    #[test]
    fn aligned_origin_needs_single_segment() {
        let mut viewport = viewport();
        viewport.set_origin(20.0, 20.0).expect("origin");
        let segments = viewport.wrap_segments();
        assert_eq!(
            segments,
            vec![LayerSegment {
                dest_x: 0,
                dest_y: 0,
                source_x: 0,
                source_y: 0,
                width: 856,
                height: 664,
            }]
        );
    }

    #[test]
    fn layer_offset_is_start_corner_minus_origin() {
        let mut viewport = viewport();
        viewport.set_origin(100.0, 10.0).expect("origin");
        assert_eq!(viewport.start_cell(), (1, -1));
        assert_eq!(viewport.layer_offset(), (-52, -58));
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert_eq!(
            ScrollViewport::new(816, 624, 20, 0, 48),
            Err(ViewportError::ZeroTileSize)
        );
        assert_eq!(
            ScrollViewport::new(0, 624, 20, 48, 48),
            Err(ViewportError::ZeroViewport)
        );
        assert_eq!(
            ScrollViewport::new(u32::MAX - 8, 624, 20, 48, 48),
            Err(ViewportError::TooLarge)
        );
        assert_eq!(
            ScrollViewport::new(816, 624, u32::MAX / 2 + 1, 48, 48),
            Err(ViewportError::TooLarge)
        );
        assert_eq!(
            ScrollViewport::new(816, i32::MAX as u32 - 100, 20, 48, 48),
            Err(ViewportError::TooLarge)
        );
        let mut viewport = viewport();
        assert_eq!(
            viewport.set_origin(f64::NAN, 0.0),
            Err(ViewportError::NonFiniteOrigin)
        );
        assert_eq!(
            viewport.set_origin(0.0, 1.0e12),
            Err(ViewportError::OriginOutOfRange)
        );
    }
}
