//! # Rendering Module
//!
//! Drawing primitives used to assemble one document.
//!
//! ## Modules
//!
//! - [`canvas`]: the RGBA raster and alpha compositing
//! - [`fit`]: cover-fit with rounded-corner mask (photos, sized barcodes)
//! - [`barcode`]: barcode encoding behind the [`barcode::BarcodeEncoder`] seam
//! - [`field`]: per-field dispatch with `Result`-based failure isolation
//! - [`context`]: where diagnostics go
//!
//! ## Usage Example
//!
//! ```
//! use idforge::render::fit::fit_cover;
//! use image::{Rgba, RgbaImage};
//!
//! let photo = RgbaImage::from_pixel(640, 480, Rgba([90, 120, 200, 255]));
//! let fitted = fit_cover(&photo, 300, 380, 12).unwrap();
//! assert_eq!(fitted.dimensions(), (300, 380));
//! // Corners are masked out.
//! assert_eq!(fitted.get_pixel(0, 0)[3], 0);
//! ```

pub mod barcode;
pub mod canvas;
pub mod context;
pub mod field;
pub mod fit;

pub use barcode::{BarcodeEncoder, Code128Encoder};
pub use canvas::Canvas;
pub use context::{LogSink, MemorySink, RenderContext, TracingSink};
pub use field::{FieldOutcome, FieldRenderer};
