//! Photo folder conversion.
//!
//! Converts every non-PNG photo in a folder to a PNG beside it so that
//! photo lookup finds it. Existing PNG targets are never overwritten.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::IdforgeError;

/// Source extensions converted (case-insensitive).
pub const CONVERTIBLE_EXTENSIONS: [&str; 7] = ["webp", "jpeg", "jpg", "bmp", "gif", "tiff", "tif"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub converted: Vec<PathBuf>,
    /// Sources whose PNG already existed.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

fn is_convertible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONVERTIBLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Convert the photos directly inside `dir` (not recursive).
pub fn convert_photos(dir: &Path) -> Result<ConversionReport, IdforgeError> {
    if !dir.is_dir() {
        return Err(IdforgeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("directory {} does not exist", dir.display()),
        )));
    }

    let mut sources = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_convertible(entry.path()))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();
    sources.sort();

    let mut report = ConversionReport::default();
    for source in sources {
        let target = source.with_extension("png");
        if target.exists() {
            tracing::info!(source = %source.display(), "skipped, PNG already exists");
            report.skipped.push(source);
            continue;
        }
        match convert_one(&source, &target) {
            Ok(()) => {
                tracing::info!(source = %source.display(), target = %target.display(), "converted");
                report.converted.push(target);
            }
            Err(message) => {
                tracing::warn!(source = %source.display(), %message, "conversion failed");
                report.failed.push((source, message));
            }
        }
    }
    Ok(report)
}

fn convert_one(source: &Path, target: &Path) -> Result<(), String> {
    let image = image::open(source).map_err(|e| e.to_string())?;
    let result = if image.color().has_alpha() {
        image.to_rgba8().save_with_format(target, image::ImageFormat::Png)
    } else {
        image.to_rgb8().save_with_format(target, image::ImageFormat::Png)
    };
    result.map_err(|e| e.to_string())
}
