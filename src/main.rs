//! # idforge CLI
//!
//! Command-line interface for rendering identity documents.
//!
//! ## Usage
//!
//! ```bash
//! # Check a template without rendering anything
//! idforge validate --template templates/passport.json
//!
//! # Render every record of a CSV
//! idforge render --template templates/passport.json --data data/people.csv
//!
//! # Four workers, ZIP each record directory, verbose logs
//! idforge render -t templates/passport.json -d data/people.csv --jobs 4 --zip --log-level debug
//!
//! # Convert webp/jpg/... photos to PNG beside them
//! idforge convert-photos photos
//!
//! # Templates may also be YAML; keep run logs elsewhere
//! idforge render -t templates/passport.yml -d data/people.csv --log-dir /var/log/idforge
//! ```
//!
//! Every run also writes its log to `logs/idforge_<timestamp>.log` unless
//! `--no-log-file` is given.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use idforge::{
    IdforgeError, Settings,
    config::{DEFAULT_LOG_DIR, LOG_FILE_EXTENSION, log_file_prefix},
    batch::{BatchOptions, OutputWriter, process_batch},
    convert::convert_photos,
    data::load_csv,
    font::FontCatalog,
    pipeline::DocumentGenerator,
    render::RenderContext,
    template::load_template,
};

/// idforge - Template-driven identity document renderer
#[derive(Parser, Debug)]
#[command(name = "idforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Directory the per-run log file is written to
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Only log to the terminal
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one document per CSV record
    Render {
        #[command(flatten)]
        layout: Layout,

        /// CSV file with a header row
        #[arg(long, short = 'd', value_name = "CSV")]
        data: PathBuf,

        /// Output root directory
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<PathBuf>,

        /// Worker threads (defaults to the number of CPU cores)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Also write a ZIP of every record directory
        #[arg(long)]
        zip: bool,
    },

    /// Validate a template and list every problem found
    Validate {
        #[command(flatten)]
        layout: Layout,
    },

    /// Convert photos in a folder to PNG
    ConvertPhotos {
        /// Photo folder
        #[arg(default_value = "photos")]
        dir: PathBuf,
    },
}

/// Template and asset locations shared by `render` and `validate`.
#[derive(Args, Debug)]
struct Layout {
    /// Template file (JSON, or YAML with a .yml/.yaml extension)
    #[arg(long, short = 't', value_name = "FILE")]
    template: PathBuf,

    /// Directory photo folders and auxiliary file patterns are relative to
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Directory background images are resolved against
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Directory holding font files
    #[arg(long, value_name = "DIR")]
    fonts: Option<PathBuf>,

    /// Font used by fields that do not name one
    #[arg(long, value_name = "NAME")]
    default_font: Option<String>,

    /// Font file tried when a field's font cannot be loaded
    #[arg(long, value_name = "FILE")]
    fallback_font: Option<String>,
}

impl Layout {
    fn settings(&self) -> Settings {
        let mut settings = match &self.base_dir {
            Some(dir) => Settings::default().with_base_dir(dir),
            None => Settings::default(),
        };
        if let Some(assets) = &self.assets {
            settings.asset_root = assets.clone();
        }
        if let Some(fonts) = &self.fonts {
            settings.font_dir = fonts.clone();
        }
        settings.default_font = self.default_font.clone();
        settings.fallback_font = self.fallback_font.clone();
        settings
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but something in it failed.
fn run() -> Result<bool, IdforgeError> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli);

    match cli.command {
        Commands::Render {
            layout,
            data,
            output,
            jobs,
            zip,
        } => {
            let mut settings = layout.settings();
            if let Some(output) = output {
                settings.output_root = output;
            }
            if let Some(jobs) = jobs {
                settings.jobs = jobs.max(1);
            }
            settings.zip = zip;

            let fonts = load_fonts(&settings)?;
            let template = load_template(&layout.template, &settings.validation_context(fonts.clone()))?;
            let rows = load_csv(&data)?;
            tracing::info!(template = %template.id, records = rows.len(), "loaded");

            let writer = OutputWriter::new(&settings.output_root, &template.output);
            let generator = DocumentGenerator::new(template, &fonts, &settings)?;
            let report = process_batch(
                &generator,
                &writer,
                &rows,
                &BatchOptions::from_settings(&settings),
                &RenderContext::tracing(),
            )?;

            println!("{}", report);
            Ok(report.all_succeeded())
        }

        Commands::Validate { layout } => {
            let settings = layout.settings();
            let fonts = load_fonts(&settings)?;
            let template = load_template(&layout.template, &settings.validation_context(fonts))?;
            println!(
                "{} ({} {}): valid, {} field(s)",
                template.id,
                template.country,
                template.version,
                template.fields.len()
            );
            Ok(true)
        }

        Commands::ConvertPhotos { dir } => {
            let report = convert_photos(&dir)?;
            for (path, message) in &report.failed {
                eprintln!("failed: {}: {}", path.display(), message);
            }
            println!(
                "Converted {} file(s), skipped {}, failed {}",
                report.converted.len(),
                report.skipped.len(),
                report.failed.len()
            );
            Ok(report.failed.is_empty())
        }
    }
}

/// Terminal logging plus, unless disabled, a timestamped file in `--log-dir`.
///
/// The returned guard flushes the file writer when dropped. A log file that
/// cannot be created is reported and the run continues on the terminal only.
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let mut file_error = None;
    let file = if cli.no_log_file {
        None
    } else {
        match open_log_file(&cli.log_dir) {
            Ok(appender) => Some(tracing_appender::non_blocking(appender)),
            Err(e) => {
                file_error = Some(e);
                None
            }
        }
    };
    let (writer, guard) = match file {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(writer.map(|w| fmt::layer().with_ansi(false).with_target(false).with_writer(w)))
        .init();

    if let Some(e) = file_error {
        tracing::warn!(dir = %cli.log_dir.display(), "log file disabled: {}", e);
    }
    guard
}

fn open_log_file(dir: &std::path::Path) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(log_file_prefix(chrono::Local::now().naive_local()))
        .filename_suffix(LOG_FILE_EXTENSION)
        .build(dir)
        .map_err(|e| e.to_string())
}

/// Discover fonts and make sure an explicitly requested fallback exists.
fn load_fonts(settings: &Settings) -> Result<FontCatalog, IdforgeError> {
    let fonts = FontCatalog::discover(&settings.font_dir);
    if let Some(fallback) = &settings.fallback_font {
        if !fonts.has_file(fallback) {
            return Err(IdforgeError::Font(format!(
                "fallback font '{}' not found in {}",
                fallback,
                settings.font_dir.display()
            )));
        }
    }
    Ok(fonts)
}
