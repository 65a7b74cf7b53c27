//! Validated, immutable template model.
//!
//! Only the validator constructs a [`TemplateModel`]; once built it is shared
//! read-only by every render of the run.

use std::path::PathBuf;

use crate::color::HexColor;

/// Default font size in pixels when a field does not declare one.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Largest accepted font size in pixels.
pub const MAX_FONT_SIZE: f32 = 1000.0;

/// Largest accepted width or height of a barcode box or photo slot.
pub const MAX_BOX_SIDE: i64 = 20_000;

/// Default chrono pattern for date fields.
pub const DEFAULT_DATE_PATTERN: &str = "%Y/%m/%d";

/// Default output resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Default column used to identify a record in reports.
pub const DEFAULT_ID_COLUMN: &str = "id_number";

/// Default columns tried, in order, when looking up a photo file.
pub const DEFAULT_MATCH_KEYS: [&str; 2] = ["name", "id_number"];

#[derive(Debug, Clone)]
pub struct TemplateModel {
    pub id: String,
    pub country: String,
    pub version: String,
    pub background: Background,
    pub fields: Vec<FieldDefinition>,
    pub photo: PhotoSlot,
    pub output: OutputPolicy,
    pub mrz: Option<MrzSpec>,
}

#[derive(Debug, Clone)]
pub struct Background {
    /// Resolved path to the background image.
    pub image: PathBuf,
    pub color: HexColor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: HexColor,
    pub family: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: DEFAULT_FONT_SIZE,
            color: HexColor::BLACK,
            family: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    pub position: Point,
    pub style: TextStyle,
    /// Declared as `number` rather than `text`. Rendered identically.
    pub numeric: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateField {
    /// Year, month and day positions.
    pub positions: [Point; 3],
    pub style: TextStyle,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeField {
    pub position: Point,
    pub size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text(TextField),
    Date(DateField),
    Barcode(BarcodeField),
}

impl FieldKind {
    /// Name used in templates and log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text(t) if t.numeric => "number",
            FieldKind::Text(_) => "text",
            FieldKind::Date(_) => "date",
            FieldKind::Barcode(_) => "barcode",
        }
    }

    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            FieldKind::Text(t) => Some(&t.style),
            FieldKind::Date(d) => Some(&d.style),
            FieldKind::Barcode(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub key: String,
    pub data_path: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct PhotoSlot {
    pub enabled: bool,
    /// Resolved photo folder.
    pub folder: PathBuf,
    pub position: (i64, i64),
    pub size: (u32, u32),
    pub radius: u32,
    pub match_keys: Vec<String>,
}

impl PhotoSlot {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            folder: PathBuf::new(),
            position: (0, 0),
            size: (0, 0),
            radius: 0,
            match_keys: DEFAULT_MATCH_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputPolicy {
    pub dpi: u32,
    pub save_to: String,
    pub output_file_format: String,
    pub other_file: Vec<String>,
    pub id_column: String,
}

/// Column names for the passport machine-readable zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrzSpec {
    pub country: String,
    pub last_name: String,
    pub first_name: String,
    pub document_number: String,
    pub nationality: String,
    pub birth_date: String,
    pub sex: String,
    pub expiry_date: String,
    pub personal_id: Option<String>,
}

/// Format a date with a chrono pattern.
///
/// Returns `None` when the pattern is malformed or asks for fields a date
/// does not have (such as `%H`).
pub fn format_date(date: chrono::NaiveDate, pattern: &str) -> Option<String> {
    use chrono::format::{Item, StrftimeItems};
    use std::fmt::Write;

    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.into_iter())).ok()?;
    Some(out)
}
