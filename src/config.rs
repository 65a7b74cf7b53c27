//! # Run Configuration
//!
//! Directory layout and run options, resolved once by the CLI and passed
//! down explicitly.
//!
//! | Setting | Default | Used for |
//! |---------|---------|----------|
//! | `asset_root` | `templates/` | background images |
//! | `base_dir` | `.` | photo folders, `other_file` patterns |
//! | `font_dir` | `fonts/` | font files named in templates |
//! | `output_root` | `output/` | rendered documents |
//! | `jobs` | CPU cores | worker threads |
//! | log directory | `logs/` | one `idforge_<timestamp>.log` per run |
//!
//! ## Usage
//!
//! ```
//! use idforge::config::Settings;
//!
//! let settings = Settings::default().with_base_dir("/srv/cards");
//! assert_eq!(settings.asset_root, std::path::PathBuf::from("/srv/cards/templates"));
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::font::FontCatalog;
use crate::template::ValidationContext;

pub const DEFAULT_ASSET_DIR: &str = "templates";
pub const DEFAULT_FONT_DIR: &str = "fonts";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_EXTENSION: &str = "log";

/// Stem of the per-run log file, e.g. `idforge_20240131_235959`.
pub fn log_file_prefix(started: NaiveDateTime) -> String {
    format!("idforge_{}", started.format("%Y%m%d_%H%M%S"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory background images are resolved against.
    pub asset_root: PathBuf,
    /// Directory photo folders and auxiliary file patterns are resolved against.
    pub base_dir: PathBuf,
    /// Directory holding font files.
    pub font_dir: PathBuf,
    /// Font used by fields that do not name one.
    pub default_font: Option<String>,
    /// Font file tried when a field's font cannot be loaded.
    pub fallback_font: Option<String>,
    /// Root of all rendered output.
    pub output_root: PathBuf,
    /// Worker threads for batch rendering.
    pub jobs: usize,
    /// Also write `<record dir>.zip` for every record.
    pub zip: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from(DEFAULT_ASSET_DIR),
            base_dir: PathBuf::from("."),
            font_dir: PathBuf::from(DEFAULT_FONT_DIR),
            default_font: None,
            fallback_font: None,
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            jobs: default_jobs(),
            zip: false,
        }
    }
}

/// Number of available CPU cores, or 1 if unknown.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Settings {
    /// Re-root the default directory layout under `dir`.
    pub fn with_base_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            asset_root: dir.join(DEFAULT_ASSET_DIR),
            base_dir: dir.to_path_buf(),
            font_dir: dir.join(DEFAULT_FONT_DIR),
            output_root: dir.join(DEFAULT_OUTPUT_DIR),
            ..self
        }
    }

    /// Validation environment for templates rendered with these settings.
    pub fn validation_context(&self, fonts: FontCatalog) -> ValidationContext {
        ValidationContext::new(&self.asset_root, &self.base_dir, fonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_directory_layout() {
        let settings = Settings::default();
        assert_eq!(settings.asset_root, PathBuf::from("templates"));
        assert_eq!(settings.font_dir, PathBuf::from("fonts"));
        assert_eq!(settings.output_root, PathBuf::from("output"));
        assert!(settings.jobs >= 1);
        assert!(!settings.zip);
    }

    #[test]
    fn test_log_file_prefix_is_timestamped() {
        let started = chrono::NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 5)
            .unwrap();
        assert_eq!(log_file_prefix(started), "idforge_20240131_235905");
    }

    #[test]
    fn test_with_base_dir_keeps_options() {
        let settings = Settings {
            jobs: 3,
            zip: true,
            ..Settings::default()
        }
        .with_base_dir("/data");
        assert_eq!(settings.font_dir, PathBuf::from("/data/fonts"));
        assert_eq!(settings.base_dir, PathBuf::from("/data"));
        assert_eq!(settings.jobs, 3);
        assert!(settings.zip);
    }
}
