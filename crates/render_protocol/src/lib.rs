use std::fmt;

use image::{GenericImageView, Pixel, Rgba, RgbaImage, imageops};

pub const TILESET_COUNT: usize = 9;

pub const TILESET_A1: usize = 0;
pub const TILESET_A2: usize = 1;
pub const TILESET_A3: usize = 2;
pub const TILESET_A4: usize = 3;
pub const TILESET_A5: usize = 4;
/// B, C, D and E occupy consecutive slots starting here.
pub const TILESET_B: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Quarter-tile shadow colour.
    pub const SHADOW: Self = Self::new(0, 0, 0, 128);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Anything that can be bound as a tileset image.
pub trait TilesetImage {
    /// False while the image is still decoding; draws from it are skipped.
    fn is_ready(&self) -> bool;

    fn size(&self) -> (u32, u32);
}

/// Passive pixel buffer the software compositor paints into.
pub trait RasterSurface: TilesetImage {
    fn blank(width: u32, height: u32) -> Self
    where
        Self: Sized;

    fn clear_rect(&mut self, rect: PixelRect);

    /// Source-over copy of `source_rect` to `(dest_x, dest_y)`, clipped to both surfaces.
    fn blit(&mut self, source: &Self, source_rect: PixelRect, dest_x: u32, dest_y: u32)
    where
        Self: Sized;

    fn blend_fill_rect(&mut self, rect: PixelRect, color: Rgba8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceError {
    BufferLengthMismatch { width: u32, height: u32, actual: usize },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::BufferLengthMismatch {
                width,
                height,
                actual,
            } => write!(
                formatter,
                "surface buffer of {actual} bytes does not hold {width}x{height} rgba8 pixels"
            ),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Straight-alpha RGBA8 surface backed by an `image::RgbaImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaSurface {
    image: RgbaImage,
    ready: bool,
    mutation_count: u64,
}

impl RgbaSurface {
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image,
            ready: true,
            mutation_count: 0,
        }
    }

    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SurfaceError> {
        let actual = pixels.len();
        RgbaImage::from_raw(width, height, pixels)
            .map(Self::from_image)
            .ok_or(SurfaceError::BufferLengthMismatch {
                width,
                height,
                actual,
            })
    }

    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, color.into()))
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Panics outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        (*self.image.get_pixel(x, y)).into()
    }

    /// Panics outside the surface.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        self.image.put_pixel(x, y, color.into());
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Number of clear/blit/fill calls that touched at least one pixel.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    fn clip(&self, rect: PixelRect) -> PixelRect {
        let (width, height) = self.image.dimensions();
        let x = rect.x.min(width);
        let y = rect.y.min(height);
        let right = rect.x.saturating_add(rect.width).min(width);
        let bottom = rect.y.saturating_add(rect.height).min(height);
        PixelRect::new(x, y, right - x, bottom - y)
    }
}

impl From<Rgba8> for Rgba<u8> {
    fn from(color: Rgba8) -> Self {
        Rgba([color.r, color.g, color.b, color.a])
    }
}

impl From<Rgba<u8>> for Rgba8 {
    fn from(Rgba([r, g, b, a]): Rgba<u8>) -> Self {
        Self::new(r, g, b, a)
    }
}

impl TilesetImage for RgbaSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl RasterSurface for RgbaSurface {
    fn blank(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    fn clear_rect(&mut self, rect: PixelRect) {
        let rect = self.clip(rect);
        if rect.is_empty() {
            return;
        }
        let blank = RgbaImage::new(rect.width, rect.height);
        imageops::replace(&mut self.image, &blank, i64::from(rect.x), i64::from(rect.y));
        self.mutation_count += 1;
    }

    fn blit(&mut self, source: &Self, source_rect: PixelRect, dest_x: u32, dest_y: u32) {
        let source_rect = source.clip(source_rect);
        let clipped_dest = self.clip(PixelRect::new(
            dest_x,
            dest_y,
            source_rect.width,
            source_rect.height,
        ));
        if clipped_dest.is_empty() {
            return;
        }
        let view = source.image.view(
            source_rect.x,
            source_rect.y,
            source_rect.width,
            source_rect.height,
        );
        imageops::overlay(&mut self.image, &*view, i64::from(dest_x), i64::from(dest_y));
        self.mutation_count += 1;
    }

    fn blend_fill_rect(&mut self, rect: PixelRect, color: Rgba8) {
        let rect = self.clip(rect);
        if rect.is_empty() {
            return;
        }
        let color = Rgba::from(color);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.image.get_pixel_mut(x, y).blend(&color);
            }
        }
        self.mutation_count += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilesetBindError {
    IndexOutOfRange { index: usize },
}

impl fmt::Display for TilesetBindError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilesetBindError::IndexOutOfRange { index } => write!(
                formatter,
                "tileset index {index} out of range (max {})",
                TILESET_COUNT - 1
            ),
        }
    }
}

impl std::error::Error for TilesetBindError {}

/// Indexed tileset images. The generation bumps on every bind or unbind.
#[derive(Debug, Clone)]
pub struct TilesetBindings<S> {
    images: [Option<S>; TILESET_COUNT],
    generation: u64,
}

impl<S> Default for TilesetBindings<S> {
    fn default() -> Self {
        Self {
            images: std::array::from_fn(|_| None),
            generation: 0,
        }
    }
}

impl<S: TilesetImage> TilesetBindings<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, index: usize, image: S) -> Result<Option<S>, TilesetBindError> {
        let slot = self
            .images
            .get_mut(index)
            .ok_or(TilesetBindError::IndexOutOfRange { index })?;
        let previous = slot.replace(image);
        self.generation = self
            .generation
            .checked_add(1)
            .expect("tileset binding generation overflow");
        Ok(previous)
    }

    pub fn unbind(&mut self, index: usize) -> Option<S> {
        let previous = self.images.get_mut(index)?.take();
        if previous.is_some() {
            self.generation = self
                .generation
                .checked_add(1)
                .expect("tileset binding generation overflow");
        }
        previous
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.images.get(index)?.as_ref()
    }

    /// Mutable access does not bump the generation; readiness changes are
    /// observed through `ready_mask`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut S> {
        self.images.get_mut(index)?.as_mut()
    }

    /// The image at `index` when it is bound and fully decoded.
    pub fn ready(&self, index: usize) -> Option<&S> {
        self.get(index).filter(|image| image.is_ready())
    }

    pub fn ready_mask(&self) -> u16 {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, image)| image.as_ref().is_some_and(TilesetImage::is_ready))
            .fold(0, |mask, (index, _)| mask | (1 << index))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when every bound image is ready.
    pub fn is_ready(&self) -> bool {
        self.images.iter().flatten().all(TilesetImage::is_ready)
    }
}
