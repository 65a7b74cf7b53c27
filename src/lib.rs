//! # idforge - Identity Document Renderer
//!
//! idforge renders identity documents (ID cards, passport information pages)
//! from a JSON or YAML template and a CSV of records. It provides:
//!
//! - **Templates**: schema validation that reports every violation at once
//! - **Rendering**: text, split dates, Code128 barcodes and fitted photos
//! - **MRZ**: machine-readable zone lines with check digits
//! - **Batch output**: parallel rendering, DPI-tagged images, ZIP archives
//!
//! ## Quick Start
//!
//! ```no_run
//! use idforge::{
//!     batch::{BatchOptions, OutputWriter, process_batch},
//!     config::Settings,
//!     data::load_csv,
//!     font::FontCatalog,
//!     pipeline::DocumentGenerator,
//!     render::RenderContext,
//!     template::load_template,
//! };
//! use std::path::Path;
//!
//! let settings = Settings::default();
//! let fonts = FontCatalog::discover(&settings.font_dir);
//! let template = load_template(
//!     Path::new("templates/passport.json"),
//!     &settings.validation_context(fonts.clone()),
//! )?;
//! let rows = load_csv(Path::new("data/people.csv"))?;
//!
//! let writer = OutputWriter::new(&settings.output_root, &template.output);
//! let generator = DocumentGenerator::new(template, &fonts, &settings)?;
//! let report = process_batch(
//!     &generator,
//!     &writer,
//!     &rows,
//!     &BatchOptions::from_settings(&settings),
//!     &RenderContext::tracing(),
//! )?;
//! println!("{}", report);
//!
//! # Ok::<(), idforge::error::IdforgeError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template model, loading and validation |
//! | [`render`] | Canvas, fit-and-mask, barcodes, field drawing |
//! | [`pipeline`] | One record in, one document out |
//! | [`batch`] | Parallel batch runs and output persistence |
//! | [`mrz`] | Machine-readable zone generation |
//! | [`font`] | Font discovery and fallback chain |
//! | [`error`] | Error types |

pub mod batch;
pub mod color;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod font;
pub mod interpolate;
pub mod mrz;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod template;

// Re-exports for convenience
pub use config::Settings;
pub use data::DataRow;
pub use error::IdforgeError;
pub use pipeline::DocumentGenerator;
pub use report::{BatchReport, RecordOutcome};
pub use template::TemplateModel;
