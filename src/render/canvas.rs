//! The raster a document is drawn on.

use image::{Rgba, RgbaImage, imageops};

use crate::color::HexColor;
use crate::font::FontFace;
use crate::template::{Point, TextStyle};

/// Blend `color` into one pixel with the given coverage (0.0–1.0).
/// Out-of-bounds coordinates are ignored.
pub fn blend_pixel(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let src_a = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }

    let dst = image.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let blended = (color[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// RGBA raster owned by one in-flight render.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Solid canvas of one color.
    pub fn filled(width: u32, height: u32, color: HexColor) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, color.to_rgba()))
    }

    /// The background image composited over its fill color.
    pub fn from_background(background: &RgbaImage, fill: HexColor) -> Self {
        let mut canvas = Self::filled(background.width(), background.height(), fill);
        canvas.paste(background, 0, 0);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Alpha-composite `top` with its top-left corner at `(x, y)`.
    pub fn paste(&mut self, top: &RgbaImage, x: i64, y: i64) {
        imageops::overlay(&mut self.image, top, x, y);
    }

    pub fn draw_text(&mut self, face: &FontFace, at: Point, text: &str, style: &TextStyle) {
        face.draw(&mut self.image, at.x, at.y, text, style.size, style.color.to_rgba());
    }
}
