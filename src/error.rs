//! # Error Types
//!
//! This module defines the error taxonomy used throughout idforge.
//!
//! | Type | Scope | Effect |
//! |------|-------|--------|
//! | [`SchemaErrors`] | whole run | template rejected, nothing rendered |
//! | [`FieldRenderError`] | one field of one record | field skipped, record continues |
//! | [`RecordError`] | one record | record reported as failed, batch continues |
//! | [`PersistenceError`] | one record's output file | PNG retry, then record failure |
//! | [`IdforgeError`] | run-level operations | surfaced by the CLI |

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::interpolate::InterpolationError;

/// Main error type for run-level idforge operations.
#[derive(Debug, Error)]
pub enum IdforgeError {
    /// Template failed validation
    #[error("{0}")]
    Schema(#[from] SchemaErrors),

    /// Tabular data could not be read
    #[error("Data error: {0}")]
    Data(String),

    /// Image loading or processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Font loading error
    #[error("Font error: {0}")]
    Font(String),

    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single template violation, scoped to the path of the offending value
/// (e.g. `fields[2].position` or `background.image`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found while validating one template.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![SchemaError::new(path, message)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any error is reported at exactly `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path == path)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template invalid ({} error(s))", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// Failure while drawing one field. Logged with the field key; the
/// remaining fields of the document still render.
#[derive(Debug, Error)]
pub enum FieldRenderError {
    #[error("interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("date pattern '{pattern}' could not be applied")]
    DatePattern { pattern: String },

    #[error("date '{value}' produced {found} part(s), expected 3")]
    DateParts { value: String, found: usize },

    #[error("barcode could not be sized: {0}")]
    Fit(#[from] FitError),
}

/// Failure of the fit-and-mask algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("source image is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("target size must be positive, got {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },
}

/// Failure of one whole record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("photo {path} could not be decoded: {message}")]
    Photo { path: PathBuf, message: String },

    #[error("photo could not be fitted: {0}")]
    PhotoFit(#[from] FitError),

    #[error("output path could not be resolved: {0}")]
    OutputPath(#[from] InterpolationError),

    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    #[error("auxiliary file step failed: {0}")]
    Auxiliary(String),
}

/// Saving an output image failed in its inferred format and again as PNG.
#[derive(Debug, Error)]
#[error("failed to save {path}: {message}")]
pub struct PersistenceError {
    pub path: PathBuf,
    pub message: String,
}

/// Alias used by run-level APIs.
pub type Result<T> = std::result::Result<T, IdforgeError>;
