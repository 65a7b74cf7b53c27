//! Built-in bitmap font, the last link of the font fallback chain.
//!
//! Uses the Spleen family so that text always renders, even on machines
//! without the template's fonts installed. Spleen is monospaced, which also
//! keeps MRZ lines aligned when no OCR font is available.

use image::{Rgba, RgbaImage};
use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

use crate::render::canvas::blend_pixel;

/// One of the embedded Spleen faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpleenFace {
    S6x12,
    S8x16,
    S12x24,
}

impl SpleenFace {
    pub fn cell(self) -> (u32, u32) {
        match self {
            SpleenFace::S6x12 => (6, 12),
            SpleenFace::S8x16 => (8, 16),
            SpleenFace::S12x24 => (12, 24),
        }
    }

    fn data(self) -> &'static [u8] {
        match self {
            SpleenFace::S6x12 => FONT_6X12,
            SpleenFace::S8x16 => FONT_8X16,
            SpleenFace::S12x24 => FONT_12X24,
        }
    }
}

/// Largest integer magnification applied to the 12x24 face (288px cells).
pub const MAX_MAGNIFICATION: u32 = 12;

/// Pick the face and integer magnification closest to a nominal pixel size.
///
/// - below 14px → 6x12
/// - below 20px → 8x16
/// - otherwise 12x24, magnified by `round(size / 24)`, at most
///   [`MAX_MAGNIFICATION`]
pub fn face_for_size(size: f32) -> (SpleenFace, u32) {
    if size < 14.0 {
        (SpleenFace::S6x12, 1)
    } else if size < 20.0 {
        (SpleenFace::S8x16, 1)
    } else {
        // `as` saturates; NaN becomes 0.
        let mult = ((size / 24.0).round() as u32).clamp(1, MAX_MAGNIFICATION);
        (SpleenFace::S12x24, mult)
    }
}

/// Size of the rendered text block in pixels.
pub fn measure_text(text: &str, size: f32) -> (u32, u32) {
    let (face, mult) = face_for_size(size);
    let (cw, ch) = face.cell();
    let lines: Vec<&str> = text.split('\n').collect();
    let columns = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    let rows = lines.len() as u32;
    (
        columns.saturating_mul(cw * mult),
        rows.saturating_mul(ch * mult),
    )
}

/// Draw text with its top-left corner at `(x, y)`.
pub fn draw_text(image: &mut RgbaImage, x: i64, y: i64, text: &str, size: f32, color: Rgba<u8>) {
    let (face, mult) = face_for_size(size);
    let (cell_w, cell_h) = face.cell();
    let mut spleen = match PSF2Font::new(face.data()) {
        Ok(font) => font,
        Err(_) => return,
    };

    let (width, height) = (image.width() as i64, image.height() as i64);
    let advance = (cell_w * mult) as i64;
    let line_height = (cell_h * mult) as i64;

    for (line_index, line) in text.split('\n').enumerate() {
        let top = y.saturating_add((line_index as i64).saturating_mul(line_height));
        if top >= height {
            break;
        }
        if top.saturating_add(line_height) <= 0 {
            continue;
        }
        for (col, ch) in line.chars().enumerate() {
            let left = x.saturating_add((col as i64).saturating_mul(advance));
            if left >= width {
                break;
            }
            if left.saturating_add(advance) <= 0 {
                continue;
            }
            let utf8 = ch.to_string();

            let mut pixels = vec![false; (cell_w * cell_h) as usize];
            if let Some(glyph) = spleen.glyph_for_utf8(utf8.as_bytes()) {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        let idx = row_y * cell_w as usize + col_x;
                        if idx < pixels.len() {
                            pixels[idx] = on;
                        }
                    }
                }
            } else {
                draw_box(&mut pixels, cell_w as usize, cell_h as usize);
            }

            for gy in 0..cell_h {
                for gx in 0..cell_w {
                    if !pixels[(gy * cell_w + gx) as usize] {
                        continue;
                    }
                    for dy in 0..mult {
                        for dx in 0..mult {
                            blend_pixel(
                                image,
                                left + (gx * mult + dx) as i64,
                                top + (gy * mult + dy) as i64,
                                color,
                                1.0,
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Hollow box for characters Spleen does not cover.
fn draw_box(pixels: &mut [bool], width: usize, height: usize) {
    for x in 1..width - 1 {
        pixels[2 * width + x] = true;
        pixels[(height - 3) * width + x] = true;
    }
    for y in 2..height - 2 {
        pixels[y * width + 1] = true;
        pixels[y * width + width - 2] = true;
    }
}
