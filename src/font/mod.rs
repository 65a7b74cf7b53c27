//! # Fonts
//!
//! Font identifiers in templates are either a font *file* name (looked up in
//! the configured font directory) or an installed *family* name (looked up
//! through the system font database).
//!
//! | Step | Where | Result |
//! |------|-------|--------|
//! | validation | [`normalize_font`] | identifier checked against a [`FontCatalog`] |
//! | generator setup | [`FontResolver`] | one [`FontFace`] per field |
//! | drawing | [`FontFace::draw`] | glyphs blended onto the canvas |
//!
//! Resolution never fails: requested font → fallback font file → the
//! built-in Spleen bitmap font.

pub mod bitmap;
pub mod ttf;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::{FontArc, FontVec};
use image::{Rgba, RgbaImage};
use thiserror::Error;

/// File extensions treated as font files rather than family names.
pub const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

/// Errors produced while normalizing a font identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontError {
    #[error("font file '{name}' not found in {dir} (available: {})", .available.join(", "))]
    FileNotFound {
        name: String,
        dir: String,
        available: Vec<String>,
    },

    #[error("font family '{0}' is not installed")]
    FamilyNotInstalled(String),
}

/// True if the identifier names a font file (by extension, case-insensitive).
pub fn is_font_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|f| ext.eq_ignore_ascii_case(f)))
}

// ============================================================================
// Catalog
// ============================================================================

/// Listing of the fonts a template may reference.
#[derive(Clone)]
pub struct FontCatalog {
    font_dir: PathBuf,
    files: BTreeSet<String>,
    families: BTreeSet<String>,
    system: Option<Arc<fontdb::Database>>,
}

impl fmt::Debug for FontCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCatalog")
            .field("font_dir", &self.font_dir)
            .field("files", &self.files)
            .field("families", &self.families.len())
            .finish()
    }
}

impl FontCatalog {
    /// Scan `font_dir` for font files and load the installed system fonts.
    ///
    /// A missing directory yields an empty file listing.
    pub fn discover(font_dir: impl Into<PathBuf>) -> Self {
        let font_dir = font_dir.into();
        let files: BTreeSet<String> = std::fs::read_dir(&font_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.path().is_file())
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .filter(|name| is_font_file(name))
                    .collect()
            })
            .unwrap_or_default();

        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let families: BTreeSet<String> = db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect();

        tracing::debug!(
            dir = %font_dir.display(),
            files = ?files,
            "font catalog discovered"
        );

        Self {
            font_dir,
            files,
            families,
            system: Some(Arc::new(db)),
        }
    }

    /// Build a catalog from explicit listings. Families listed here can be
    /// validated against but not loaded.
    pub fn from_listing<F, S>(font_dir: impl Into<PathBuf>, files: F, families: S) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            font_dir: font_dir.into(),
            files: files.into_iter().map(Into::into).collect(),
            families: families.into_iter().map(Into::into).collect(),
            system: None,
        }
    }

    /// A catalog with no fonts at all; everything renders with the bitmap font.
    pub fn empty() -> Self {
        Self::from_listing(PathBuf::new(), Vec::<String>::new(), Vec::<String>::new())
    }

    pub fn font_dir(&self) -> &Path {
        &self.font_dir
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.families.contains(name)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    fn load_file(&self, name: &str) -> Option<FontArc> {
        if !self.has_file(name) {
            return None;
        }
        let path = self.font_dir.join(name);
        let data = std::fs::read(&path).ok()?;
        FontArc::try_from_vec(data).ok()
    }

    fn load_family(&self, name: &str) -> Option<FontArc> {
        let db = self.system.as_ref()?;
        let families = [fontdb::Family::Name(name)];
        let id = db.query(&fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        })?;
        db.with_face_data(id, |data, index| {
            FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
        })
        .flatten()
        .map(FontArc::new)
    }

    fn load(&self, name: &str) -> Option<FontArc> {
        if is_font_file(name) {
            self.load_file(name)
        } else {
            self.load_family(name)
        }
    }
}

/// Check a template's font identifier against the catalog.
///
/// Returns the identifier unchanged when it is usable.
pub fn normalize_font(input: &str, catalog: &FontCatalog) -> Result<String, FontError> {
    let name = input.trim();
    if is_font_file(name) {
        if catalog.has_file(name) {
            return Ok(name.to_string());
        }
        return Err(FontError::FileNotFound {
            name: name.to_string(),
            dir: catalog.font_dir().display().to_string(),
            available: catalog.files().map(str::to_string).collect(),
        });
    }
    if catalog.has_family(name) {
        Ok(name.to_string())
    } else {
        Err(FontError::FamilyNotInstalled(name.to_string()))
    }
}

// ============================================================================
// Faces
// ============================================================================

/// A font ready for drawing.
#[derive(Clone)]
pub enum FontFace {
    Outline { name: String, font: FontArc },
    Bitmap,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontFace::Outline { name, .. } => write!(f, "Outline({name})"),
            FontFace::Bitmap => write!(f, "Bitmap"),
        }
    }
}

impl FontFace {
    pub fn name(&self) -> &str {
        match self {
            FontFace::Outline { name, .. } => name,
            FontFace::Bitmap => "spleen",
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels outside the
    /// image are clipped.
    pub fn draw(&self, image: &mut RgbaImage, x: f32, y: f32, text: &str, size: f32, color: Rgba<u8>) {
        match self {
            FontFace::Outline { font, .. } => ttf::draw_text(image, font, x, y, text, size, color),
            FontFace::Bitmap => bitmap::draw_text(image, x as i64, y as i64, text, size, color),
        }
    }

    /// Rendered size of `text` in whole pixels.
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            FontFace::Outline { font, .. } => {
                let (w, h) = ttf::measure_text(font, text, size);
                (w.ceil() as u32, h.ceil() as u32)
            }
            FontFace::Bitmap => bitmap::measure_text(text, size),
        }
    }
}

/// Resolves font identifiers to faces, caching loaded fonts by name.
pub struct FontResolver<'a> {
    catalog: &'a FontCatalog,
    default_font: Option<String>,
    fallback_file: Option<String>,
    cache: HashMap<String, Option<FontArc>>,
}

impl<'a> FontResolver<'a> {
    pub fn new(catalog: &'a FontCatalog) -> Self {
        Self {
            catalog,
            default_font: None,
            fallback_file: None,
            cache: HashMap::new(),
        }
    }

    /// Font used when a field does not name one.
    pub fn with_default(mut self, name: Option<&str>) -> Self {
        self.default_font = name.map(str::to_string);
        self
    }

    /// Font file tried when the requested font cannot be loaded.
    pub fn with_fallback(mut self, name: Option<&str>) -> Self {
        self.fallback_file = name.map(str::to_string);
        self
    }

    fn load_cached(&mut self, name: &str) -> Option<FontArc> {
        let catalog = self.catalog;
        self.cache
            .entry(name.to_string())
            .or_insert_with(|| catalog.load(name))
            .clone()
    }

    /// Resolve a field's font. Never fails.
    pub fn resolve(&mut self, requested: Option<&str>) -> FontFace {
        let requested = requested.map(str::to_string).or_else(|| self.default_font.clone());

        if let Some(name) = requested.as_deref() {
            if let Some(font) = self.load_cached(name) {
                return FontFace::Outline {
                    name: name.to_string(),
                    font,
                };
            }
            tracing::warn!(font = name, "font could not be loaded, falling back");
        }

        if let Some(name) = self.fallback_file.clone() {
            if let Some(font) = self.load_cached(&name) {
                return FontFace::Outline { name, font };
            }
            tracing::warn!(font = %name, "fallback font could not be loaded");
        }

        FontFace::Bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FontCatalog {
        FontCatalog::from_listing(
            "/fonts",
            ["OCR-B.ttf", "NotoSans.otf"],
            ["DejaVu Sans", "Liberation Serif"],
        )
    }

    #[test]
    fn test_is_font_file() {
        assert!(is_font_file("a.ttf"));
        assert!(is_font_file("A.OTF"));
        assert!(is_font_file("collection.ttc"));
        assert!(!is_font_file("DejaVu Sans"));
        assert!(!is_font_file("font.woff"));
    }

    #[test]
    fn test_normalize_font_file() {
        assert_eq!(normalize_font("OCR-B.ttf", &catalog()).unwrap(), "OCR-B.ttf");
        let err = normalize_font("Missing.ttf", &catalog()).unwrap_err();
        match err {
            FontError::FileNotFound { name, available, .. } => {
                assert_eq!(name, "Missing.ttf");
                assert_eq!(available, vec!["NotoSans.otf", "OCR-B.ttf"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_font_family() {
        assert_eq!(normalize_font("DejaVu Sans", &catalog()).unwrap(), "DejaVu Sans");
        assert_eq!(
            normalize_font("Comic Sans", &catalog()),
            Err(FontError::FamilyNotInstalled("Comic Sans".into()))
        );
    }

    #[test]
    fn test_resolver_falls_back_to_bitmap() {
        let catalog = catalog();
        let mut resolver = FontResolver::new(&catalog).with_fallback(Some("Nope.ttf"));
        // Listed but not loadable: the catalog has no backing files.
        let face = resolver.resolve(Some("OCR-B.ttf"));
        assert!(matches!(face, FontFace::Bitmap));
        assert_eq!(face.name(), "spleen");
    }

    #[test]
    fn test_bitmap_face_draws() {
        let mut image = RgbaImage::from_pixel(64, 32, Rgba([255, 255, 255, 255]));
        FontFace::Bitmap.draw(&mut image, 0.0, 0.0, "X", 16.0, Rgba([0, 0, 0, 255]));
        assert!(image.pixels().any(|p| p.0 == [0, 0, 0, 255]));
        assert_eq!(FontFace::Bitmap.measure("XY", 16.0), (16, 16));
    }
}
