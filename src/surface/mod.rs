//! Pixel surfaces and the per-page base/overlay pair.

use image::{Rgba, RgbaImage};
use kurbo::Rect;

use crate::backend::RgbaFrame;
use crate::error::{AppError, AppResult};

mod label;
mod page;

pub use label::{LABEL_COLOR, draw_page_label, page_label_text};
pub use page::{PageEntry, PageState};

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Clipped pixel span `[x0, x1) x [y0, y1)` of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Snaps `rect` to pixel edges and clips it to a `width` x `height` surface.
///
/// Returns `None` when the rect is non-finite or does not overlap the surface.
pub fn pixel_bounds(rect: Rect, width: u32, height: u32) -> Option<PixelBounds> {
    if !rect.is_finite() {
        return None;
    }
    let rect = rect.abs();
    let clamp = |value: f64, limit: u32| value.round().clamp(0.0, f64::from(limit)) as u32;
    let bounds = PixelBounds {
        x0: clamp(rect.x0, width),
        y0: clamp(rect.y0, height),
        x1: clamp(rect.x1, width),
        y1: clamp(rect.y1, height),
    };
    (!bounds.is_empty()).then_some(bounds)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    image: RgbaImage,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_allocated(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Reallocates the surface; previous content is discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Returns the touched span, or `None` when nothing was written.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) -> Option<PixelBounds> {
        let bounds = pixel_bounds(rect, self.width(), self.height())?;
        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                self.image.put_pixel(x, y, color);
            }
        }
        Some(bounds)
    }

    pub fn clear_rect(&mut self, rect: Rect) -> Option<PixelBounds> {
        self.fill_rect(rect, TRANSPARENT)
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.image.pixels().all(|pixel| pixel[3] == 0)
    }

    /// Copies a rendered frame into the top-left corner; pixels outside the surface are dropped.
    pub fn blit_frame(&mut self, frame: &RgbaFrame) -> AppResult<()> {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.byte_len() != expected {
            return Err(AppError::invalid_argument(
                "rgba frame pixels length does not match dimensions",
            ));
        }

        let width = frame.width.min(self.width()) as usize;
        let height = frame.height.min(self.height()) as usize;
        let src_stride = frame.width as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let dst: &mut [u8] = &mut self.image;
        for row in 0..height {
            let src_start = row * src_stride;
            let dst_start = row * dst_stride;
            dst[dst_start..dst_start + width * 4]
                .copy_from_slice(&frame.pixels[src_start..src_start + width * 4]);
        }
        Ok(())
    }

    /// Source-over composite of `top` onto `self`, aligned at the origin.
    pub fn draw_over(&mut self, top: &Surface) {
        let width = self.width().min(top.width());
        let height = self.height().min(top.height());
        for y in 0..height {
            for x in 0..width {
                let src = *top.image.get_pixel(x, y);
                let dst = self.image.get_pixel_mut(x, y);
                *dst = source_over(src, *dst);
            }
        }
    }
}

fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let src_a = u32::from(src[3]);
    match src_a {
        0 => return dst,
        255 => return src,
        _ => {}
    }

    let dst_a = u32::from(dst[3]) * (255 - src_a) / 255;
    let out_a = src_a + dst_a;
    if out_a == 0 {
        return TRANSPARENT;
    }
    let channel = |i: usize| {
        ((u32::from(src[i]) * src_a + u32::from(dst[i]) * dst_a) / out_a).min(255) as u8
    };
    Rgba([channel(0), channel(1), channel(2), out_a.min(255) as u8])
}
