//! # Batch Rendering
//!
//! Runs every record of a data set through a [`DocumentGenerator`] on a
//! bounded worker pool and collects one [`RecordOutcome`] per record.
//!
//! Per record: generate, save, copy auxiliary files, optionally zip the
//! record directory. A failing record never stops the batch, and the report
//! keeps input order regardless of which worker finished first.

pub mod archive;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::Settings;
use crate::data::DataRow;
use crate::error::{IdforgeError, RecordError};
use crate::pipeline::DocumentGenerator;
use crate::render::context::RenderContext;
use crate::report::{BatchReport, RecordOutcome};

pub use output::{OutputWriter, ResolvedOutput, sanitize_filename};

const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads (at least 1).
    pub jobs: usize,
    /// Write `<record dir>.zip` after each record.
    pub zip: bool,
    /// Directory `other_file` patterns are resolved against.
    pub base_dir: PathBuf,
    /// Once set, records that have not started are reported as cancelled.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            zip: false,
            base_dir: PathBuf::from("."),
            cancel: None,
        }
    }
}

impl BatchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            jobs: settings.jobs.max(1),
            zip: settings.zip,
            base_dir: settings.base_dir.clone(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Render, save and report every row.
///
/// Only failing to start the worker pool is an error; everything that goes
/// wrong for a record ends up in its outcome.
pub fn process_batch(
    generator: &DocumentGenerator,
    writer: &OutputWriter,
    rows: &[DataRow],
    options: &BatchOptions,
    ctx: &RenderContext,
) -> Result<BatchReport, IdforgeError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()
        .map_err(|e| IdforgeError::Pool(e.to_string()))?;

    let id_column = writer.policy().id_column.as_str();
    ctx.info(format!("rendering {} record(s) with {} worker(s)", rows.len(), options.jobs.max(1)));

    let outcomes = pool.install(|| {
        rows.par_iter()
            .map(|row| {
                let id = row.record_id(id_column);
                if options.cancelled() {
                    return RecordOutcome::failed(id, CANCELLED);
                }
                let record_ctx = ctx.for_record(id.as_str());
                match process_record(generator, writer, row, options, &record_ctx) {
                    Ok(path) => RecordOutcome::succeeded(id, path),
                    Err(e) => {
                        record_ctx.error(e.to_string());
                        RecordOutcome::failed(id, e.to_string())
                    }
                }
            })
            .collect::<Vec<_>>()
    });

    let report = BatchReport::new(outcomes);
    ctx.info(format!("{}/{} record(s) succeeded", report.succeeded(), report.total()));
    Ok(report)
}

fn process_record(
    generator: &DocumentGenerator,
    writer: &OutputWriter,
    row: &DataRow,
    options: &BatchOptions,
    ctx: &RenderContext,
) -> Result<PathBuf, RecordError> {
    let canvas = generator.generate(row, ctx)?;
    let saved = writer.persist(&canvas, row, ctx)?;

    let policy = writer.policy();
    if !policy.other_file.is_empty() {
        archive::copy_auxiliary(&policy.other_file, &options.base_dir, &saved.dir, row, ctx)?;
    }
    if options.zip {
        let archive = archive::zip_directory(&saved.dir)?;
        ctx.info(format!("archived {}", archive.display()));
    }
    Ok(saved.file)
}
