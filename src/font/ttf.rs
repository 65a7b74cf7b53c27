//! Outline font rendering (TTF/OTF) using ab_glyph.
//!
//! Glyphs are rasterized straight onto the RGBA canvas with anti-aliased
//! coverage blending. The text origin is the top-left corner of the first
//! line's ascender, so `(x, y)` matches where a designer measured the box.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::render::canvas::blend_pixel;

/// Extra spacing between lines of multi-line values, in pixels.
const LINE_SPACING: f32 = 4.0;

/// Convert a nominal font size (em size in pixels) to an ab_glyph scale.
fn px_scale(font: &FontArc, size: f32) -> PxScale {
    font.pt_to_px_scale(size).unwrap_or(PxScale::from(size))
}

fn line_height(font: &FontArc, scale: PxScale) -> f32 {
    let scaled = font.as_scaled(scale);
    scaled.ascent() - scaled.descent() + scaled.line_gap() + LINE_SPACING
}

/// Horizontal advance of one line, including kerning.
fn line_width(font: &FontArc, scale: PxScale, line: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut previous = None;
    for ch in line.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, glyph_id);
        }
        caret += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    caret
}

/// Size of the rendered text block in pixels.
pub fn measure_text(font: &FontArc, text: &str, size: f32) -> (f32, f32) {
    let scale = px_scale(font, size);
    let lines: Vec<&str> = text.split('\n').collect();
    let width = lines
        .iter()
        .map(|line| line_width(font, scale, line))
        .fold(0.0f32, f32::max);
    let scaled = font.as_scaled(scale);
    let height = (scaled.ascent() - scaled.descent())
        + line_height(font, scale) * (lines.len().saturating_sub(1)) as f32;
    (width, height)
}

/// Draw text with its top-left corner at `(x, y)`.
pub fn draw_text(
    image: &mut RgbaImage,
    font: &FontArc,
    x: f32,
    y: f32,
    text: &str,
    size: f32,
    color: Rgba<u8>,
) {
    let scale = px_scale(font, size);
    let scaled = font.as_scaled(scale);
    let ascent = scaled.ascent();
    let advance_y = line_height(font, scale);

    for (line_index, line) in text.split('\n').enumerate() {
        let baseline_y = y + ascent + advance_y * line_index as f32;
        let mut caret_x = x;
        let mut previous = None;

        for ch in line.chars() {
            let glyph_id = font.glyph_id(ch);
            if let Some(prev) = previous {
                caret_x += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(caret_x, baseline_y));
            caret_x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let origin_x = bounds.min.x.floor() as i64;
                let origin_y = bounds.min.y.floor() as i64;
                outlined.draw(|px, py, coverage| {
                    blend_pixel(
                        image,
                        origin_x + px as i64,
                        origin_y + py as i64,
                        color,
                        coverage,
                    );
                });
            }
        }
    }
}
