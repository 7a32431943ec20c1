//! Unwraps a toroidal backing buffer into a screen image.

use image::{GenericImageView, RgbaImage, imageops};
use render_protocol::RgbaSurface;
use view::{LayerSegment, ScrollViewport};

/// Copies the wrap segments of `buffer` into a layer-sized image, then crops
/// away the margin so the result matches the screen.
pub fn screen_image(buffer: &RgbaSurface, viewport: &ScrollViewport) -> RgbaImage {
    let (layer_width, layer_height) = viewport.layer_size();
    let mut layer = RgbaImage::new(layer_width, layer_height);
    for segment in viewport.wrap_segments() {
        copy_segment(buffer, &segment, &mut layer);
    }
    let margin = viewport.margin();
    let (screen_width, screen_height) = viewport.screen_size();
    imageops::crop_imm(&layer, margin, margin, screen_width, screen_height).to_image()
}

fn copy_segment(buffer: &RgbaSurface, segment: &LayerSegment, layer: &mut RgbaImage) {
    let view = buffer.image().view(
        segment.source_x,
        segment.source_y,
        segment.width,
        segment.height,
    );
    imageops::replace(
        layer,
        &*view,
        i64::from(segment.dest_x),
        i64::from(segment.dest_y),
    );
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use render_protocol::{RasterSurface, Rgba8};

    use super::*;

    #[test]
    fn wrapped_buffer_unrolls_to_screen() {
        let mut viewport = ScrollViewport::new(4, 2, 0, 2, 2).expect("viewport");
        let (width, height) = viewport.backing_size();
        let mut buffer = RgbaSurface::blank(width, height);
        let red = Rgba8::new(255, 0, 0, 255);
        buffer.put_pixel(0, 0, red);

        viewport.set_origin(4.0, 0.0).expect("origin");
        let image = screen_image(&buffer, &viewport);
        assert_eq!(image.dimensions(), (4, 2));
        // The buffer is 6 wide; columns 4..6 fill x 0..2, then column 0 wraps to x 2.
        assert_eq!(image.get_pixel(2, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }
}
