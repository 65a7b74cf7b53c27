//! Auxiliary file copies and per-record ZIP archives.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::data::DataRow;
use crate::error::RecordError;
use crate::interpolate::interpolate;
use crate::render::context::RenderContext;

/// Copy every file matched by the `other_file` patterns into `dest`.
///
/// Patterns are interpolated against the record and resolved relative to
/// `base_dir`. A pattern matching nothing is logged, not an error.
pub fn copy_auxiliary(
    patterns: &[String],
    base_dir: &Path,
    dest: &Path,
    row: &DataRow,
    ctx: &RenderContext,
) -> Result<Vec<PathBuf>, RecordError> {
    let mut copied = Vec::new();
    for pattern in patterns {
        let pattern = interpolate(pattern, row)?;
        let full = base_dir.join(&pattern);
        let full = full.to_string_lossy();
        let matches = glob::glob(&full).map_err(|e| RecordError::Auxiliary(format!("bad pattern '{}': {}", pattern, e)))?;

        let mut found = false;
        for entry in matches {
            let source = entry.map_err(|e| RecordError::Auxiliary(e.to_string()))?;
            if !source.is_file() {
                continue;
            }
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = dest.join(name);
            std::fs::copy(&source, &target)
                .map_err(|e| RecordError::Auxiliary(format!("copy {} failed: {}", source.display(), e)))?;
            ctx.debug(format!("copied {}", source.display()));
            copied.push(target);
            found = true;
        }
        if !found {
            ctx.warn(format!("no files match '{}'", pattern));
        }
    }
    Ok(copied)
}

/// Archive path for a record directory: `<dir>.zip` beside it.
pub fn archive_path(dir: &Path) -> PathBuf {
    let mut name = dir.as_os_str().to_os_string();
    name.push(".zip");
    PathBuf::from(name)
}

/// Zip the contents of `dir` (paths stored relative to it) into `<dir>.zip`.
pub fn zip_directory(dir: &Path) -> Result<PathBuf, RecordError> {
    let target = archive_path(dir);
    write_zip(dir, &target).map_err(|e| RecordError::Auxiliary(format!("zip {} failed: {}", target.display(), e)))?;
    Ok(target)
}

fn write_zip(dir: &Path, target: &Path) -> io::Result<()> {
    let file = File::create(target)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        // Zip entry names always use forward slashes.
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(io::Error::other)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options).map_err(io::Error::other)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::MemorySink;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_archive_path() {
        assert_eq!(archive_path(Path::new("out/A1/passport")), PathBuf::from("out/A1/passport.zip"));
    }

    #[test]
    fn test_copy_auxiliary_interpolates_and_globs() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(base.path().join("docs")).unwrap();
        std::fs::write(base.path().join("docs/A1_visa.pdf"), b"visa").unwrap();
        std::fs::write(base.path().join("docs/A1_note.txt"), b"note").unwrap();
        std::fs::write(base.path().join("docs/B2_visa.pdf"), b"other").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let sink = Arc::new(MemorySink::new());
        let ctx = RenderContext::new(sink.clone());
        let row = DataRow::from_pairs([("id_number", "A1")]);
        let patterns = vec!["docs/{id_number}_*".to_string(), "missing/*.pdf".to_string()];
        let mut copied = copy_auxiliary(&patterns, base.path(), dest.path(), &row, &ctx).unwrap();
        copied.sort();

        assert_eq!(
            copied,
            vec![dest.path().join("A1_note.txt"), dest.path().join("A1_visa.pdf")]
        );
        assert_eq!(std::fs::read(dest.path().join("A1_visa.pdf")).unwrap(), b"visa");
        assert!(!dest.path().join("B2_visa.pdf").exists());
        assert_eq!(sink.at_least(crate::render::context::Level::Warn).len(), 1);
    }

    #[test]
    fn test_copy_auxiliary_unknown_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RenderContext::new(Arc::new(MemorySink::new()));
        let row = DataRow::new();
        let result = copy_auxiliary(&["{passport}.pdf".to_string()], dir.path(), dir.path(), &row, &ctx);
        assert!(matches!(result, Err(RecordError::OutputPath(_))));
    }

    #[test]
    fn test_zip_directory_contents() {
        let root = tempfile::tempdir().unwrap();
        let record = root.path().join("A1");
        std::fs::create_dir_all(record.join("passport")).unwrap();
        std::fs::write(record.join("passport/A1.png"), b"png").unwrap();
        std::fs::write(record.join("visa.pdf"), b"pdf").unwrap();

        let archive = zip_directory(&record).unwrap();
        assert_eq!(archive, root.path().join("A1.zip"));

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names = zip.file_names().map(String::from).collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["passport/", "passport/A1.png", "visa.pdf"]);

        let mut content = String::new();
        io::Read::read_to_string(&mut zip.by_name("visa.pdf").unwrap(), &mut content).unwrap();
        assert_eq!(content, "pdf");
    }
}
