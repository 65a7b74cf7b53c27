//! Barcode symbol rendering.
//!
//! Encoding sits behind [`BarcodeEncoder`] so the field renderer does not
//! depend on a particular symbology. The default is Code 128 (character
//! set B) via the barcoders crate.

use barcoders::sym::code128::Code128;
use image::{Rgba, RgbaImage};
use thiserror::Error;

const BAR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const SPACE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarcodeError {
    #[error("cannot encode '{data}': {message}")]
    Unencodable { data: String, message: String },

    #[error("nothing to encode")]
    Empty,
}

/// Turns a data value into a barcode bitmap.
pub trait BarcodeEncoder: Send + Sync {
    fn encode(&self, data: &str) -> Result<RgbaImage, BarcodeError>;
}

/// Code 128 encoder producing black bars on opaque white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code128Encoder {
    /// Width of one module in pixels.
    pub module_width: u32,
    /// Bar height in pixels.
    pub height: u32,
    /// Blank modules on each side.
    pub quiet_zone: u32,
}

impl Default for Code128Encoder {
    fn default() -> Self {
        Self {
            module_width: 2,
            height: 100,
            quiet_zone: 10,
        }
    }
}

impl Code128Encoder {
    /// Encode `data` into modules (1 = bar, 0 = space).
    pub fn modules(&self, data: &str) -> Result<Vec<u8>, BarcodeError> {
        if data.is_empty() {
            return Err(BarcodeError::Empty);
        }
        // Character set B covers upper and lower case, digits and punctuation.
        let prefixed = format!("\u{0181}{}", data);
        let barcode = Code128::new(&prefixed).map_err(|e| BarcodeError::Unencodable {
            data: data.to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(barcode.encode())
    }
}

impl BarcodeEncoder for Code128Encoder {
    fn encode(&self, data: &str) -> Result<RgbaImage, BarcodeError> {
        let modules = self.modules(data)?;
        let module_width = self.module_width.max(1);
        let width = (modules.len() as u32 + 2 * self.quiet_zone) * module_width;
        let height = self.height.max(1);

        let mut image = RgbaImage::from_pixel(width, height, SPACE);
        for (i, &module) in modules.iter().enumerate() {
            if module != 1 {
                continue;
            }
            let x0 = (self.quiet_zone + i as u32) * module_width;
            for x in x0..x0 + module_width {
                for y in 0..height {
                    image.put_pixel(x, y, BAR);
                }
            }
        }
        Ok(image)
    }
}

/// Bitmap used when encoding fails: fully transparent, 200×50.
pub fn blank_barcode() -> RgbaImage {
    RgbaImage::from_pixel(200, 50, Rgba([255, 255, 255, 0]))
}
