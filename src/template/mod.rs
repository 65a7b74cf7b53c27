//! # Templates
//!
//! A template describes one document layout: the background, the data
//! fields drawn on it, the photo slot and where outputs go.
//!
//! ```json
//! {
//!   "id": "sample-passport",
//!   "country": "NVX",
//!   "version": "1.0",
//!   "background": { "image": "passport.png", "color": "#ffffff" },
//!   "fields": [
//!     { "key": "name", "type": "text", "position": [120, 40], "data_path": "name" },
//!     { "key": "birth", "type": "date", "position": [[120, 80], [180, 80], [210, 80]],
//!       "data_path": "birth_date", "date_format": "%Y/%m/%d" },
//!     { "key": "code", "type": "barcode", "position": [20, 300], "data_path": "id_number",
//!       "size": [240, 60] }
//!   ],
//!   "photo": { "folder": "photos", "position": [20, 40], "size": [90, 120], "border_radius": 8 },
//!   "output": { "save_to": "{id_number}/passport", "output_file_format": "{id_number}.png" }
//! }
//! ```
//!
//! The same structure may be written in YAML (`.yml` / `.yaml`).
//!
//! [`load_template`] reads and validates a file; [`validate`] works on an
//! already parsed JSON value. Both return every violation at once.

pub mod model;
pub mod raw;
mod validate;

use std::path::{Path, PathBuf};

pub use model::{
    Background, BarcodeField, DateField, FieldDefinition, FieldKind, MrzSpec, OutputPolicy, PhotoSlot, Point,
    TemplateModel, TextField, TextStyle,
};
pub use validate::validate;

use crate::error::SchemaErrors;
use crate::font::FontCatalog;

/// Filesystem and font environment a template is validated against.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Directory background images are resolved against.
    pub asset_root: PathBuf,
    /// Directory photo folders are resolved against.
    pub base_dir: PathBuf,
    pub fonts: FontCatalog,
}

impl ValidationContext {
    pub fn new(asset_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>, fonts: FontCatalog) -> Self {
        Self {
            asset_root: asset_root.into(),
            base_dir: base_dir.into(),
            fonts,
        }
    }
}

/// Template file syntax, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl TemplateFormat {
    /// `.yml` and `.yaml` are YAML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yml" | "yaml") => TemplateFormat::Yaml,
            _ => TemplateFormat::Json,
        }
    }

    /// Parse template text into the JSON value the validator works on.
    pub fn parse(self, text: &str) -> Result<serde_json::Value, String> {
        match self {
            TemplateFormat::Json => serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e)),
            TemplateFormat::Yaml => serde_yaml::from_str(text).map_err(|e| format!("invalid YAML: {}", e)),
        }
    }
}

/// Read a template file and validate it.
///
/// I/O and syntax problems are reported as a single error at `$`.
pub fn load_template(path: &Path, ctx: &ValidationContext) -> Result<TemplateModel, SchemaErrors> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SchemaErrors::single("$", format!("cannot read {}: {}", path.display(), e)))?;
    let value = TemplateFormat::from_path(path)
        .parse(&text)
        .map_err(|message| SchemaErrors::single("$", format!("{} in {}", message, path.display())))?;
    validate(&value, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_template_reports_io_and_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ValidationContext::new(dir.path(), dir.path(), FontCatalog::empty());

        let err = load_template(&dir.path().join("missing.json"), &ctx).unwrap_err();
        assert!(err.contains_path("$"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ \"id\": ").unwrap();
        let err = load_template(&broken, &ctx).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("invalid JSON"));

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "id: [unclosed").unwrap();
        let err = load_template(&broken, &ctx).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("invalid YAML"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TemplateFormat::from_path(Path::new("t/passport.yml")), TemplateFormat::Yaml);
        assert_eq!(TemplateFormat::from_path(Path::new("t/passport.YAML")), TemplateFormat::Yaml);
        assert_eq!(TemplateFormat::from_path(Path::new("t/passport.json")), TemplateFormat::Json);
        assert_eq!(TemplateFormat::from_path(Path::new("t/passport")), TemplateFormat::Json);
    }

    #[test]
    fn test_yaml_and_json_templates_load_alike() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(4, 4).save(dir.path().join("passport_infopage.png")).unwrap();
        std::fs::create_dir_all(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos").join("a.png"), b"x").unwrap();
        let ctx = ValidationContext::new(dir.path(), dir.path(), FontCatalog::empty());

        let json_path = dir.path().join("passport.json");
        let yaml_path = dir.path().join("passport.yml");
        std::fs::write(&json_path, include_str!("../fixtures/sample-passport.json")).unwrap();
        std::fs::write(&yaml_path, include_str!("../fixtures/sample-passport.yml")).unwrap();

        let from_json = load_template(&json_path, &ctx).unwrap();
        let from_yaml = load_template(&yaml_path, &ctx).unwrap();
        assert_eq!(from_yaml.id, "sample-passport");
        assert_eq!(from_yaml.version, "1.0");
        assert_eq!(from_yaml.fields.len(), from_json.fields.len());
        assert_eq!(from_yaml.photo.size, from_json.photo.size);
        assert_eq!(from_yaml.output.dpi, from_json.output.dpi);
        assert!(from_yaml.mrz.is_some());
    }

    #[test]
    fn test_bundled_sample_template_parses() {
        let value: serde_json::Value =
            serde_json::from_str(include_str!("../fixtures/sample-passport.json")).unwrap();
        let raw_fields = value["fields"].as_array().unwrap();
        assert!(raw_fields.iter().all(|f| serde_json::from_value::<raw::RawField>(f.clone()).is_ok()));
    }
}
