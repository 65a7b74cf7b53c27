//! Output path resolution and image persistence.
//!
//! | Extension | Writer | Resolution tag |
//! |-----------|--------|----------------|
//! | `.png` | png crate | `pHYs` chunk (pixels per meter) |
//! | `.jpg` `.jpeg` | image JPEG encoder, quality 95, flattened on white | JFIF density |
//! | `.bmp` `.tif` `.tiff` | image crate | none |
//!
//! Any other name gets `.png` appended. If writing fails the document is
//! written once more as PNG next to the intended file.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};

use crate::data::DataRow;
use crate::error::{PersistenceError, RecordError};
use crate::interpolate::{InterpolationError, interpolate};
use crate::render::canvas::Canvas;
use crate::render::context::RenderContext;
use crate::template::OutputPolicy;

/// Extensions saved as-is (lowercase, without the dot).
pub const KNOWN_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

const JPEG_QUALITY: u8 = 95;
const INCHES_PER_METER: f64 = 1.0 / 0.0254;

/// Characters that are not allowed in output file names.
const FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace forbidden characters with `_` and trim surrounding whitespace.
///
/// `.` and `..` become `_` so the result always names an entry inside its
/// directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string();
    match cleaned.as_str() {
        "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Turn an interpolated `save_to` value into a path that stays below the
/// output root.
///
/// Both `/` and `\` separate components. Empty, `.` and `..` components are
/// dropped, which also strips any leading root, and each remaining component
/// is sanitized like a file name.
pub fn safe_relative_path(path: &str) -> PathBuf {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|part| !matches!(*part, "" | "." | ".."))
        .map(sanitize_filename)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "bmp" => Some(OutputFormat::Bmp),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            _ => None,
        }
    }
}

/// Where one record's document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    /// Record directory (`output root / save_to`).
    pub dir: PathBuf,
    /// Full path of the document file.
    pub file: PathBuf,
    /// `.png` was appended because the name had no known extension.
    pub appended_extension: bool,
}

/// Resolves and writes output files for one template.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    policy: OutputPolicy,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, policy: &OutputPolicy) -> Self {
        Self {
            root: root.into(),
            policy: policy.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &OutputPolicy {
        &self.policy
    }

    pub fn resolve(&self, row: &DataRow) -> Result<ResolvedOutput, InterpolationError> {
        let dir = self.root.join(safe_relative_path(&interpolate(&self.policy.save_to, row)?));
        let mut name = sanitize_filename(&interpolate(&self.policy.output_file_format, row)?);

        let known = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !known {
            name.push_str(".png");
        }

        Ok(ResolvedOutput {
            file: dir.join(&name),
            dir,
            appended_extension: !known,
        })
    }

    /// Resolve the output path, create the record directory and save.
    pub fn persist(&self, canvas: &Canvas, row: &DataRow, ctx: &RenderContext) -> Result<ResolvedOutput, RecordError> {
        let mut resolved = self.resolve(row)?;
        if resolved.appended_extension {
            ctx.warn(format!("output name has no image extension, saving as {}", resolved.file.display()));
        }
        std::fs::create_dir_all(&resolved.dir).map_err(|e| PersistenceError {
            path: resolved.dir.clone(),
            message: e.to_string(),
        })?;
        resolved.file = self.save(canvas.image(), &resolved.file, ctx)?;
        Ok(resolved)
    }

    /// Save in the format implied by the extension, falling back to PNG once.
    /// Returns the path actually written.
    pub fn save(&self, image: &RgbaImage, path: &Path, ctx: &RenderContext) -> Result<PathBuf, PersistenceError> {
        let format = OutputFormat::from_path(path).unwrap_or(OutputFormat::Png);
        match write_image(image, path, format, self.policy.dpi) {
            Ok(()) => {
                ctx.info(format!("saved {}", path.display()));
                Ok(path.to_path_buf())
            }
            Err(message) => {
                ctx.error(format!("failed to save {}: {}, retrying as PNG", path.display(), message));
                let fallback = path.with_extension("png");
                write_png(image, &fallback, self.policy.dpi).map_err(|message| PersistenceError {
                    path: fallback.clone(),
                    message,
                })?;
                ctx.info(format!("saved {} as PNG", fallback.display()));
                Ok(fallback)
            }
        }
    }
}

fn write_image(image: &RgbaImage, path: &Path, format: OutputFormat, dpi: u32) -> Result<(), String> {
    match format {
        OutputFormat::Png => write_png(image, path, dpi),
        OutputFormat::Jpeg => write_jpeg(image, path, dpi),
        OutputFormat::Bmp => image.save_with_format(path, ImageFormat::Bmp).map_err(|e| e.to_string()),
        OutputFormat::Tiff => image.save_with_format(path, ImageFormat::Tiff).map_err(|e| e.to_string()),
    }
}

/// Write an RGBA PNG with a `pHYs` chunk for `dpi`.
pub fn write_png(image: &RgbaImage, path: &Path, dpi: u32) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let ppu = (dpi as f64 * INCHES_PER_METER).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppu,
        yppu: ppu,
        unit: png::Unit::Meter,
    }));

    let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
    writer.write_image_data(image.as_raw()).map_err(|e| e.to_string())?;
    writer.finish().map_err(|e| e.to_string())
}

/// Composite onto white using the alpha channel.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let a = p[3] as u32;
        let mix = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    })
}

/// Write a JPEG (quality 95) with JFIF density set to `dpi`.
pub fn write_jpeg(image: &RgbaImage, path: &Path, dpi: u32) -> Result<(), String> {
    let rgb = flatten_on_white(image);
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(dpi.min(u16::MAX as u32) as u16));
    encoder.encode_image(&rgb).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::HexColor;
    use crate::render::context::MemorySink;
    use image::Rgba;
    use std::sync::Arc;

    fn policy(save_to: &str, name: &str) -> OutputPolicy {
        OutputPolicy {
            dpi: 300,
            save_to: save_to.into(),
            output_file_format: name.into(),
            other_file: Vec::new(),
            id_column: "id_number".into(),
        }
    }

    fn row() -> DataRow {
        DataRow::from_pairs([("id_number", "A100000003"), ("name", "Lin: Ching/An ")])
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(r#" a<b>c:d"e/f\g|h?i*j "#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("plain.png"), "plain.png");
        assert_eq!(sanitize_filename(" .. "), "_");
    }

    #[test]
    fn test_safe_relative_path_drops_traversal() {
        assert_eq!(safe_relative_path("../../etc/cron.d"), PathBuf::from("etc/cron.d"));
        assert_eq!(safe_relative_path("/abs/./x"), PathBuf::from("abs/x"));
        assert_eq!(safe_relative_path(r"..\C:\win"), PathBuf::from("C_/win"));
        assert_eq!(safe_relative_path("../.."), PathBuf::new());
    }

    #[test]
    fn test_resolve_keeps_hostile_values_under_root() {
        let writer = OutputWriter::new("/out", &policy("{id_number}/passport", "{id_number}.png"));
        for id in ["../../etc", "/etc", "..", r"..\..\tmp"] {
            let row = DataRow::from_pairs([("id_number", id)]);
            let resolved = writer.resolve(&row).unwrap();
            assert!(resolved.dir.starts_with("/out"), "{} escaped to {}", id, resolved.dir.display());
            assert!(
                resolved.dir.components().all(|c| c != std::path::Component::ParentDir),
                "{}",
                resolved.dir.display()
            );
            assert_eq!(resolved.file.parent(), Some(resolved.dir.as_path()));
        }
        let row = DataRow::from_pairs([("id_number", "../../etc")]);
        assert_eq!(writer.resolve(&row).unwrap().dir, PathBuf::from("/out/etc/passport"));
    }

    #[test]
    fn test_resolve_interpolates_and_sanitizes() {
        let writer = OutputWriter::new("/out", &policy("{id_number}/passport", "{name}.JPG"));
        let resolved = writer.resolve(&row()).unwrap();
        assert_eq!(resolved.dir, PathBuf::from("/out/A100000003/passport"));
        assert_eq!(resolved.file, PathBuf::from("/out/A100000003/passport/Lin_ Ching_An .JPG"));
        assert!(!resolved.appended_extension);
    }

    #[test]
    fn test_resolve_appends_png() {
        let writer = OutputWriter::new("/out", &policy("{id_number}", "{id_number}_front"));
        let resolved = writer.resolve(&row()).unwrap();
        assert_eq!(resolved.file, PathBuf::from("/out/A100000003/A100000003_front.png"));
        assert!(resolved.appended_extension);

        let writer = OutputWriter::new("/out", &policy("x", "card.webp"));
        assert_eq!(
            writer.resolve(&row()).unwrap().file,
            PathBuf::from("/out/x/card.webp.png")
        );
    }

    #[test]
    fn test_resolve_unknown_key() {
        let writer = OutputWriter::new("/out", &policy("{passport}", "a.png"));
        assert!(matches!(
            writer.resolve(&row()),
            Err(InterpolationError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("a.PNG")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.jpeg")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("a.tif")), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_path(Path::new("a")), None);
    }

    #[test]
    fn test_png_carries_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        let image = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        write_png(&image, &path, 300).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        let dims = reader.info().pixel_dims.unwrap();
        assert_eq!(dims.xppu, 11811);
        assert_eq!(dims.unit, png::Unit::Meter);

        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded, image);
    }

    #[test]
    fn test_jpeg_is_flattened() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_on_white(&image);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.jpg");
        write_jpeg(&image, &path, 300).unwrap();
        assert_eq!(image::open(&path).unwrap().width(), 2);
    }

    #[test]
    fn test_persist_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), &policy("{id_number}/id", "{id_number}.bmp"));
        let sink = Arc::new(MemorySink::new());
        let ctx = RenderContext::new(sink);
        let canvas = Canvas::filled(5, 5, HexColor::WHITE);
        let saved = writer.persist(&canvas, &row(), &ctx).unwrap();
        assert_eq!(saved.file, dir.path().join("A100000003/id/A100000003.bmp"));
        assert!(saved.file.is_file());
    }

    #[test]
    fn test_failed_save_retries_as_png() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the intended file name makes the first write fail.
        let blocked = dir.path().join("card.jpg");
        std::fs::create_dir_all(&blocked).unwrap();

        let writer = OutputWriter::new(dir.path(), &policy("", "card.jpg"));
        let sink = Arc::new(MemorySink::new());
        let ctx = RenderContext::new(sink.clone());
        let image = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let saved = writer.save(&image, &blocked, &ctx).unwrap();
        assert_eq!(saved, dir.path().join("card.png"));
        assert!(saved.is_file());
        assert_eq!(sink.at_least(crate::render::context::Level::Error).len(), 1);
    }
}
