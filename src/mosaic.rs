//! Two-tone block stamp used to paint redactions.

use image::Rgba;
use kurbo::{Point, Rect, Size};
use rand::Rng;

use crate::surface::{PixelBounds, Surface, pixel_bounds};

pub const MOSAIC_DARK: Rgba<u8> = Rgba([58, 58, 58, 255]);
pub const MOSAIC_LIGHT: Rgba<u8> = Rgba([150, 150, 150, 255]);

/// Blocks per side of one stamp.
pub const STAMP_GRID: u32 = 2;

/// Square of side `size` centered on `center`.
pub fn stamp_rect(center: Point, size: f64) -> Rect {
    Rect::from_center_size(center, Size::new(size, size))
}

/// Fills a `size` x `size` square around `center` with a grid of blocks, each
/// independently one of [`MOSAIC_DARK`] or [`MOSAIC_LIGHT`].
///
/// Pixels outside the square are never written; the square is clipped at surface edges.
/// Non-finite or non-positive sizes stamp nothing.
pub fn stamp<R: Rng + ?Sized>(
    surface: &mut Surface,
    center: Point,
    size: f64,
    rng: &mut R,
) -> Option<PixelBounds> {
    if !size.is_finite() || size <= 0.0 || !center.is_finite() {
        return None;
    }

    let outer = stamp_rect(center, size);
    let block = size / f64::from(STAMP_GRID);
    for row in 0..STAMP_GRID {
        for col in 0..STAMP_GRID {
            let x0 = outer.x0 + f64::from(col) * block;
            let y0 = outer.y0 + f64::from(row) * block;
            let x1 = if col + 1 == STAMP_GRID { outer.x1 } else { x0 + block };
            let y1 = if row + 1 == STAMP_GRID { outer.y1 } else { y0 + block };
            let color = if rng.gen_bool(0.5) {
                MOSAIC_DARK
            } else {
                MOSAIC_LIGHT
            };
            surface.fill_rect(Rect::new(x0, y0, x1, y1), color);
        }
    }

    pixel_bounds(outer, surface.width(), surface.height())
}

pub fn is_mosaic_pixel(pixel: Rgba<u8>) -> bool {
    pixel == MOSAIC_DARK || pixel == MOSAIC_LIGHT
}
