//! # Document Assembly
//!
//! [`DocumentGenerator`] turns one record into one finished image:
//!
//! 1. clone the pre-composited background
//! 2. derive MRZ lines when the template asks for them
//! 3. find, fit and paste the photo (or a placeholder)
//! 4. render every field in declaration order
//!
//! A generator is built once per run and shared read-only by all workers.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::batch::output::sanitize_filename;
use crate::config::Settings;
use crate::data::DataRow;
use crate::error::{IdforgeError, RecordError};
use crate::font::{FontCatalog, FontFace, FontResolver};
use crate::mrz;
use crate::render::barcode::{BarcodeEncoder, Code128Encoder};
use crate::render::canvas::Canvas;
use crate::render::context::RenderContext;
use crate::render::field::FieldRenderer;
use crate::render::fit::fit_cover;
use crate::template::TemplateModel;

/// Photo file extensions tried for each lookup key, in order.
pub const PHOTO_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([200, 200, 200, 255]);
const PLACEHOLDER_INK: Rgba<u8> = Rgba([100, 100, 100, 255]);
const PLACEHOLDER_TEXT: &str = "NO PHOTO";

/// Renders documents for one template.
pub struct DocumentGenerator {
    template: TemplateModel,
    background: Canvas,
    faces: HashMap<String, FontFace>,
    encoder: Box<dyn BarcodeEncoder>,
}

impl DocumentGenerator {
    /// Load the background and resolve a font for every text and date field.
    pub fn new(template: TemplateModel, fonts: &FontCatalog, settings: &Settings) -> Result<Self, IdforgeError> {
        let path = &template.background.image;
        let image = image::open(path)
            .map_err(|e| IdforgeError::Image(format!("cannot load background {}: {}", path.display(), e)))?
            .to_rgba8();
        let background = Canvas::from_background(&image, template.background.color);

        let mut resolver = FontResolver::new(fonts)
            .with_default(settings.default_font.as_deref())
            .with_fallback(settings.fallback_font.as_deref());
        let faces = template
            .fields
            .iter()
            .filter_map(|field| {
                let style = field.kind.style()?;
                Some((field.key.clone(), resolver.resolve(style.family.as_deref())))
            })
            .collect::<HashMap<_, _>>();

        for (key, face) in &faces {
            tracing::debug!(field = %key, font = face.name(), "font resolved");
        }

        Ok(Self {
            template,
            background,
            faces,
            encoder: Box::new(Code128Encoder::default()),
        })
    }

    /// Replace the barcode encoder.
    pub fn with_encoder(mut self, encoder: Box<dyn BarcodeEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn template(&self) -> &TemplateModel {
        &self.template
    }

    /// The background as every document starts out.
    pub fn background(&self) -> &Canvas {
        &self.background
    }

    /// Render one record.
    ///
    /// Field failures are logged and skipped; only photo problems fail the
    /// record.
    pub fn generate(&self, row: &DataRow, ctx: &RenderContext) -> Result<Canvas, RecordError> {
        let row = self.derive_values(row, ctx);
        let mut canvas = self.background.clone();

        let photo = &self.template.photo;
        if photo.enabled {
            let (width, height) = photo.size;
            let source = match self.find_photo(&row) {
                Some(path) => {
                    ctx.debug(format!("using photo {}", path.display()));
                    image::open(&path)
                        .map_err(|e| RecordError::Photo {
                            path: path.clone(),
                            message: e.to_string(),
                        })?
                        .to_rgba8()
                }
                None => {
                    ctx.warn(format!(
                        "no photo found in {} for keys {:?}, using placeholder",
                        photo.folder.display(),
                        photo.match_keys
                    ));
                    placeholder(width, height)
                }
            };
            let fitted = fit_cover(&source, width, height, photo.radius)?;
            canvas.paste(&fitted, photo.position.0, photo.position.1);
        }

        let renderer = FieldRenderer::new(&self.faces, self.encoder.as_ref(), photo.radius, ctx);
        for field in &self.template.fields {
            if let Err(e) = renderer.render(&mut canvas, field, &row) {
                ctx.field_error(&field.key, format!("{} field failed: {}", field.kind.type_name(), e));
            }
        }

        Ok(canvas)
    }

    fn derive_values<'r>(&self, row: &'r DataRow, ctx: &RenderContext) -> Cow<'r, DataRow> {
        let Some(spec) = &self.template.mrz else {
            return Cow::Borrowed(row);
        };
        match mrz::derive(spec, row) {
            Ok(derived) => Cow::Owned(derived),
            Err(e) => {
                ctx.warn(format!("MRZ not generated: {}", e));
                Cow::Borrowed(row)
            }
        }
    }

    /// First existing candidate from [`photo_candidates`].
    fn find_photo(&self, row: &DataRow) -> Option<PathBuf> {
        let photo = &self.template.photo;
        photo_candidates(&photo.folder, &photo.match_keys, row)
            .into_iter()
            .find(|path| path.is_file())
    }
}

/// Photo paths to try for a record: `{value}.{ext}` for each lookup key in
/// order, then each extension. Values are sanitized as file names, so every
/// candidate is a direct child of `folder`.
pub fn photo_candidates(folder: &Path, keys: &[String], row: &DataRow) -> Vec<PathBuf> {
    keys.iter()
        .filter_map(|key| row.value(key))
        .map(sanitize_filename)
        .filter(|stem| !stem.is_empty())
        .flat_map(|stem| {
            PHOTO_EXTENSIONS
                .iter()
                .map(move |ext| folder.join(format!("{}.{}", stem, ext)))
        })
        .collect()
}

/// Gray stand-in for a missing photo with a centered marker.
pub fn placeholder(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, PLACEHOLDER_FILL);
    let face = FontFace::Bitmap;
    let size = [24.0, 16.0, 10.0]
        .into_iter()
        .find(|&size| face.measure(PLACEHOLDER_TEXT, size).0 <= width)
        .unwrap_or(10.0);
    let (tw, th) = face.measure(PLACEHOLDER_TEXT, size);
    let x = (width as f32 - tw as f32) / 2.0;
    let y = (height as f32 - th as f32) / 2.0;
    face.draw(&mut image, x, y, PLACEHOLDER_TEXT, size, PLACEHOLDER_INK);
    image
}
