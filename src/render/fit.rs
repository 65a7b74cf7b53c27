//! Cover-fit and rounded-corner masking.
//!
//! Scales an image so it covers the target box (like CSS
//! `background-size: cover`), crops the overflow around the center and
//! masks the corners. Used for photos, the missing-photo placeholder and
//! sized barcodes.

use image::{GrayImage, Luma, RgbaImage, imageops};

use crate::error::FitError;

/// The larger of the two axis ratios, so both axes reach the target.
pub fn cover_scale(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> f64 {
    let sw = dst_w as f64 / src_w as f64;
    let sh = dst_h as f64 / src_h as f64;
    sw.max(sh)
}

/// Scaled dimensions, never smaller than the target on either axis.
pub fn cover_size(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32) {
    let scale = cover_scale(src_w, src_h, dst_w, dst_h);
    let w = ((src_w as f64 * scale).floor() as u32).max(dst_w);
    let h = ((src_h as f64 * scale).floor() as u32).max(dst_h);
    (w, h)
}

/// Hard-edged rounded-rectangle mask: 255 inside, 0 outside.
///
/// A pixel is inside when its center lies inside the shape. The radius is
/// clamped to half the shorter side.
pub fn rounded_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let r = radius.min(width.min(height) / 2) as f32;
    let (w, h) = (width as f32, height as f32);

    GrayImage::from_fn(width, height, |x, y| {
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        let corner_x = if cx < r {
            Some(r)
        } else if cx > w - r {
            Some(w - r)
        } else {
            None
        };
        let corner_y = if cy < r {
            Some(r)
        } else if cy > h - r {
            Some(h - r)
        } else {
            None
        };
        let inside = match (corner_x, corner_y) {
            (Some(ox), Some(oy)) => {
                let (dx, dy) = (cx - ox, cy - oy);
                dx * dx + dy * dy <= r * r
            }
            _ => true,
        };
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Scale `source` to cover `width`×`height`, center-crop and round the corners.
///
/// The result has the source's color channels and the mask as alpha. An odd
/// overflow crops one pixel more from the right/bottom edge.
pub fn fit_cover(source: &RgbaImage, width: u32, height: u32, radius: u32) -> Result<RgbaImage, FitError> {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(FitError::EmptySource {
            width: src_w,
            height: src_h,
        });
    }
    if width == 0 || height == 0 {
        return Err(FitError::EmptyTarget { width, height });
    }

    let (new_w, new_h) = cover_size(src_w, src_h, width, height);
    let scaled = if (new_w, new_h) == (src_w, src_h) {
        source.clone()
    } else {
        imageops::resize(source, new_w, new_h, imageops::FilterType::Lanczos3)
    };

    let left = (new_w - width) / 2;
    let top = (new_h - height) / 2;
    let mut cropped = imageops::crop_imm(&scaled, left, top, width, height).to_image();

    let mask = rounded_mask(width, height, radius);
    for (pixel, alpha) in cropped.pixels_mut().zip(mask.pixels()) {
        pixel[3] = alpha[0];
    }
    Ok(cropped)
}
