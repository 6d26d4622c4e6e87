use image::Rgba;
use kurbo::Rect;

use super::Surface;

pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

pub fn page_label_text(index: usize, page_count: usize) -> String {
    format!("Page {} of {page_count}", index + 1)
}

/// Draws `text` with its baseline `offset[1]` pixels above the bottom edge and its left
/// edge `offset[0]` pixels from the left. Unknown characters advance without drawing.
pub fn draw_page_label(
    surface: &mut Surface,
    text: &str,
    offset: [u32; 2],
    scale: u32,
    color: Rgba<u8>,
) {
    let scale = scale.max(1);
    let baseline = f64::from(surface.height()) - f64::from(offset[1]);
    let top = baseline - f64::from(GLYPH_HEIGHT.saturating_mul(scale));
    let cell = f64::from(scale);

    let mut left = f64::from(offset[0]);
    for ch in text.chars() {
        if let Some(rows) = glyph_rows(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let x = left + f64::from(col) * cell;
                    let y = top + row as f64 * cell;
                    surface.fill_rect(Rect::new(x, y, x + cell, y + cell), color);
                }
            }
        }
        left += f64::from(GLYPH_ADVANCE.saturating_mul(scale));
    }
}

fn glyph_rows(ch: char) -> Option<[u8; GLYPH_HEIGHT as usize]> {
    let rows = match ch {
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'g' => [0b00000, 0b01111, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        'o' => [0b00000, 0b00000, 0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
        'f' => [0b00110, 0b01001, 0b01000, 0b11100, 0b01000, 0b01000, 0b01000],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        _ => return None,
    };
    Some(rows)
}
