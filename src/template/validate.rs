//! Template validation.
//!
//! Every section is parsed independently and every violation is collected,
//! so a template author sees all problems in one pass. A model is returned
//! only when there are none.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ValidationContext;
use super::model::*;
use super::raw::*;
use crate::color::normalize_color;
use crate::error::{SchemaError, SchemaErrors};
use crate::font::normalize_font;
use crate::interpolate::placeholders;

const SECTIONS: [&str; 8] = [
    "id",
    "country",
    "version",
    "background",
    "fields",
    "photo",
    "output",
    "mrz",
];

/// Sample date used to check that a date pattern yields three parts.
const SAMPLE_DATE: (i32, u32, u32) = (2000, 11, 22);

/// Collected violations.
#[derive(Default)]
struct Errors(Vec<SchemaError>);

impl Errors {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(SchemaError::new(path, message));
    }
}

/// Validate a parsed template document.
pub fn validate(raw: &Value, ctx: &ValidationContext) -> Result<TemplateModel, SchemaErrors> {
    let Some(obj) = raw.as_object() else {
        return Err(SchemaErrors::single("$", "template must be a JSON object"));
    };

    let mut errors = Errors::default();
    for key in obj.keys() {
        if !SECTIONS.contains(&key.as_str()) {
            errors.push(key.as_str(), "unknown section");
        }
    }

    let id = required::<String>(obj, "id", &mut errors);
    let country = required::<String>(obj, "country", &mut errors);
    let version = required::<String>(obj, "version", &mut errors);

    let background = required::<RawBackground>(obj, "background", &mut errors)
        .and_then(|raw| check_background(raw, ctx, &mut errors));

    let fields = match obj.get("fields") {
        Some(value) => check_fields(value, ctx, &mut errors),
        None => {
            errors.push("fields", "missing required section");
            None
        }
    };

    let photo = match obj.get("photo") {
        Some(value) => parse::<RawPhoto>(value, "photo", &mut errors)
            .and_then(|raw| check_photo(raw, ctx, &mut errors)),
        None => Some(PhotoSlot::disabled()),
    };

    let output = required::<RawOutput>(obj, "output", &mut errors)
        .and_then(|raw| check_output(raw, &mut errors));

    let mrz = match obj.get("mrz") {
        Some(value) => parse::<RawMrz>(value, "mrz", &mut errors).map(|raw| Some(check_mrz(raw, &mut errors))),
        None => Some(None),
    };

    if !errors.0.is_empty() {
        return Err(SchemaErrors(errors.0));
    }

    match (id, country, version, background, fields, photo, output, mrz) {
        (
            Some(id),
            Some(country),
            Some(version),
            Some(background),
            Some(fields),
            Some(photo),
            Some(output),
            Some(mrz),
        ) => Ok(TemplateModel {
            id,
            country,
            version,
            background,
            fields,
            photo,
            output,
            mrz,
        }),
        _ => Err(SchemaErrors::single("$", "template is incomplete")),
    }
}

// ============================================================================
// Section parsing
// ============================================================================

fn parse<T: DeserializeOwned>(value: &Value, path: &str, errors: &mut Errors) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(path, e.to_string());
            None
        }
    }
}

fn required<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, errors: &mut Errors) -> Option<T> {
    match obj.get(key) {
        Some(value) => parse(value, key, errors),
        None => {
            errors.push(key, "missing required section");
            None
        }
    }
}

fn check_background(raw: RawBackground, ctx: &ValidationContext, errors: &mut Errors) -> Option<Background> {
    let image = ctx.asset_root.join(&raw.image);
    let image_ok = if raw.image.trim().is_empty() {
        errors.push("background.image", "must not be empty");
        false
    } else if !image.is_file() {
        errors.push("background.image", format!("file not found: {}", image.display()));
        false
    } else {
        true
    };

    let color = match normalize_color(&raw.color) {
        Ok(color) => Some(color),
        Err(e) => {
            errors.push("background.color", e.to_string());
            None
        }
    };

    match (image_ok, color) {
        (true, Some(color)) => Some(Background { image, color }),
        _ => None,
    }
}

// ============================================================================
// Fields
// ============================================================================

fn check_fields(value: &Value, ctx: &ValidationContext, errors: &mut Errors) -> Option<Vec<FieldDefinition>> {
    let Some(items) = value.as_array() else {
        errors.push("fields", "expected a list of field definitions");
        return None;
    };

    let before = errors.0.len();
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let path = format!("fields[{}]", i);
        let Some(raw) = parse::<RawField>(item, &path, errors) else {
            continue;
        };
        if !raw.key.is_empty() && !seen.insert(raw.key.clone()) {
            errors.push(format!("{}.key", path), format!("duplicate field key '{}'", raw.key));
        }
        if let Some(field) = check_field(raw, &path, ctx, errors) {
            fields.push(field);
        }
    }

    (errors.0.len() == before).then_some(fields)
}

fn check_field(raw: RawField, path: &str, ctx: &ValidationContext, errors: &mut Errors) -> Option<FieldDefinition> {
    let before = errors.0.len();
    let at = |name: &str| format!("{}.{}", path, name);

    if raw.key.trim().is_empty() {
        errors.push(at("key"), "must not be empty");
    }
    if raw.data_path.trim().is_empty() {
        errors.push(at("data_path"), "must not be empty");
    }

    let is_barcode = raw.kind == "barcode";
    let is_date = raw.kind == "date";
    if !matches!(raw.kind.as_str(), "text" | "number" | "date" | "barcode") {
        errors.push(
            at("type"),
            format!("unknown field type '{}' (expected text, number, date or barcode)", raw.kind),
        );
    }

    if raw.size.is_some() && !is_barcode {
        errors.push(at("size"), "only barcode fields may declare a size");
    }
    if raw.date_format.is_some() && !is_date {
        errors.push(at("date_format"), "only date fields may declare a date_format");
    }

    let size = raw.size.and_then(|[w, h]| {
        match check_box_size(w, h) {
            Ok(size) => Some(size),
            Err(message) => {
                errors.push(at("size"), message);
                None
            }
        }
    });

    let font_size = raw.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    if !(font_size > 0.0 && font_size.is_finite()) {
        errors.push(at("font_size"), format!("font size must be positive, got {}", font_size));
    } else if font_size > MAX_FONT_SIZE {
        errors.push(
            at("font_size"),
            format!("font size must be at most {}, got {}", MAX_FONT_SIZE, font_size),
        );
    }

    let color = match raw.font_color.as_deref().map(normalize_color) {
        None => Some(crate::color::HexColor::BLACK),
        Some(Ok(color)) => Some(color),
        Some(Err(e)) => {
            errors.push(at("font_color"), e.to_string());
            None
        }
    };

    let family = match raw.font_family.as_deref().map(|f| normalize_font(f, &ctx.fonts)) {
        None => None,
        Some(Ok(name)) => Some(name),
        Some(Err(e)) => {
            errors.push(at("font_family"), e.to_string());
            None
        }
    };

    let pattern = raw
        .date_format
        .clone()
        .unwrap_or_else(|| DEFAULT_DATE_PATTERN.to_string());
    if is_date {
        if let Err(message) = check_date_pattern(&pattern) {
            errors.push(at("date_format"), message);
        }
    }

    let position = RawPosition::from_value(&raw.position);
    let position_error = match (&position, is_date) {
        (None, true) => Some(format!(
            "expected a list of 3 [x, y] points (year, month, day), got {}",
            raw.position
        )),
        (None, false) => Some(format!("expected an [x, y] point, got {}", raw.position)),
        (Some(RawPosition::Multi(points)), true) if points.len() == 3 => None,
        (Some(RawPosition::Multi(points)), true) => Some(format!(
            "date fields need exactly 3 positions (year, month, day), got {}",
            points.len()
        )),
        (Some(RawPosition::Single(_)), true) => {
            Some("date fields need exactly 3 positions (year, month, day), got a single point".into())
        }
        (Some(RawPosition::Single(_)), false) => None,
        (Some(RawPosition::Multi(_)), false) => {
            Some(format!("{} fields take a single [x, y] position", raw.kind))
        }
    };
    if let Some(message) = position_error {
        errors.push(at("position"), message);
    }

    if errors.0.len() != before {
        return None;
    }

    let style = TextStyle {
        size: font_size,
        color: color?,
        family,
    };
    let kind = match (raw.kind.as_str(), position?) {
        ("date", RawPosition::Multi(points)) => FieldKind::Date(DateField {
            positions: [
                Point::new(points[0][0], points[0][1]),
                Point::new(points[1][0], points[1][1]),
                Point::new(points[2][0], points[2][1]),
            ],
            style,
            pattern,
        }),
        ("barcode", RawPosition::Single([x, y])) => FieldKind::Barcode(BarcodeField {
            position: Point::new(x, y),
            size,
        }),
        (kind, RawPosition::Single([x, y])) => FieldKind::Text(TextField {
            position: Point::new(x, y),
            style,
            numeric: kind == "number",
        }),
        _ => return None,
    };

    Some(FieldDefinition {
        key: raw.key,
        data_path: raw.data_path,
        kind,
    })
}

fn check_date_pattern(pattern: &str) -> Result<(), String> {
    let (y, m, d) = SAMPLE_DATE;
    let sample = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| "invalid sample date".to_string())?;
    let formatted = format_date(sample, pattern)
        .ok_or_else(|| format!("'{}' is not a valid date pattern", pattern))?;
    let parts = formatted.split('/').count();
    if parts != 3 {
        return Err(format!(
            "'{}' must produce 3 '/'-separated parts (year, month, day), produced {}",
            pattern, parts
        ));
    }
    Ok(())
}

// ============================================================================
// Photo, output, MRZ
// ============================================================================

fn check_photo(raw: RawPhoto, ctx: &ValidationContext, errors: &mut Errors) -> Option<PhotoSlot> {
    let before = errors.0.len();
    let folder = ctx.base_dir.join(&raw.folder);

    // A disabled slot is never drawn, so its geometry is not checked.
    let [w, h] = raw.size;
    let size = match check_box_size(w, h) {
        Ok(size) => size,
        Err(message) => {
            if raw.enabled {
                errors.push("photo.size", message);
            }
            (0, 0)
        }
    };

    if raw.enabled {
        if !folder.is_dir() {
            errors.push("photo.folder", format!("directory not found: {}", folder.display()));
        } else if is_empty_dir(&folder) {
            errors.push("photo.folder", format!("directory is empty: {}", folder.display()));
        }
    }

    let match_keys = match raw.match_keys {
        Some(keys) if keys.is_empty() || keys.iter().any(|k| k.trim().is_empty()) => {
            errors.push("photo.match_keys", "must list at least one non-empty column name");
            Vec::new()
        }
        Some(keys) => keys,
        None => DEFAULT_MATCH_KEYS.iter().map(|k| k.to_string()).collect(),
    };

    (errors.0.len() == before).then(|| PhotoSlot {
        enabled: raw.enabled,
        folder,
        position: (raw.position[0], raw.position[1]),
        size,
        radius: raw.border_radius,
        match_keys,
    })
}

fn check_box_size(w: i64, h: i64) -> Result<(u32, u32), String> {
    if w <= 0 || h <= 0 {
        return Err(format!("size must be positive, got [{}, {}]", w, h));
    }
    if w > MAX_BOX_SIDE || h > MAX_BOX_SIDE {
        return Err(format!("size must be at most {} per side, got [{}, {}]", MAX_BOX_SIDE, w, h));
    }
    Ok((w as u32, h as u32))
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn check_output(raw: RawOutput, errors: &mut Errors) -> Option<OutputPolicy> {
    let before = errors.0.len();

    let dpi = raw.dpi.unwrap_or(DEFAULT_DPI as i64);
    if dpi <= 0 || dpi > u32::MAX as i64 {
        errors.push("output.dpi", format!("dpi must be positive, got {}", dpi));
    }

    if let Err(e) = placeholders(&raw.save_to) {
        errors.push("output.save_to", e.to_string());
    }
    if raw.output_file_format.trim().is_empty() {
        errors.push("output.output_file_format", "must not be empty");
    } else if let Err(e) = placeholders(&raw.output_file_format) {
        errors.push("output.output_file_format", e.to_string());
    }

    for (i, pattern) in raw.other_file.iter().enumerate() {
        let path = format!("output.other_file[{}]", i);
        if let Err(e) = placeholders(pattern) {
            errors.push(path, e.to_string());
        } else if let Err(e) = glob::Pattern::new(pattern) {
            errors.push(path, format!("invalid glob pattern: {}", e));
        }
    }

    let id_column = raw.id_column.unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string());
    if id_column.trim().is_empty() {
        errors.push("output.id_column", "must not be empty");
    }

    (errors.0.len() == before).then(|| OutputPolicy {
        dpi: dpi as u32,
        save_to: raw.save_to,
        output_file_format: raw.output_file_format,
        other_file: raw.other_file,
        id_column,
    })
}

fn check_mrz(raw: RawMrz, errors: &mut Errors) -> MrzSpec {
    let columns = [
        ("country", &raw.country),
        ("last_name", &raw.last_name),
        ("first_name", &raw.first_name),
        ("document_number", &raw.document_number),
        ("nationality", &raw.nationality),
        ("birth_date", &raw.birth_date),
        ("sex", &raw.sex),
        ("expiry_date", &raw.expiry_date),
    ];
    for (name, column) in columns {
        if column.trim().is_empty() {
            errors.push(format!("mrz.{}", name), "must name a data column");
        }
    }

    MrzSpec {
        country: raw.country,
        last_name: raw.last_name,
        first_name: raw.first_name,
        document_number: raw.document_number,
        nationality: raw.nationality,
        birth_date: raw.birth_date,
        sex: raw.sex,
        expiry_date: raw.expiry_date,
        personal_id: raw.personal_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontCatalog;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        ctx: ValidationContext,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("templates");
        std::fs::create_dir_all(&assets).unwrap();
        RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]))
            .save(assets.join("bg.png"))
            .unwrap();
        let photos = dir.path().join("photos");
        std::fs::create_dir_all(&photos).unwrap();
        std::fs::write(photos.join("Lin.png"), b"not really a png").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let ctx = ValidationContext::new(
            assets,
            dir.path(),
            FontCatalog::from_listing(dir.path().join("fonts"), ["OCR-B.ttf"], ["DejaVu Sans"]),
        );
        Fixture { _dir: dir, ctx }
    }

    fn template() -> Value {
        json!({
            "id": "sample-passport",
            "country": "NVX",
            "version": "1.0",
            "background": { "image": "bg.png", "color": "rgb(255,255,255)" },
            "fields": [
                { "key": "name", "type": "text", "position": [10, 10], "data_path": "name",
                  "font_size": 20, "font_color": "cmyk(0%,0%,0%,100%)", "font_family": "OCR-B.ttf" },
                { "key": "birth", "type": "date", "position": [[0, 0], [40, 0], [60, 0]],
                  "data_path": "birth_date" },
                { "key": "code", "type": "barcode", "position": [5.7, 80.2], "data_path": "id_number",
                  "size": [120, 30] }
            ],
            "photo": { "folder": "photos", "position": [100, 10], "size": [60, 80], "border_radius": 6 },
            "output": { "save_to": "{id_number}/passport", "output_file_format": "{id_number}.png" }
        })
    }

    fn paths(err: &SchemaErrors) -> Vec<&str> {
        err.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_valid_template_builds_model() {
        let fx = fixture();
        let model = validate(&template(), &fx.ctx).unwrap();
        assert_eq!(model.id, "sample-passport");
        assert_eq!(model.background.color.to_string(), "#ffffff");
        assert_eq!(model.fields.len(), 3);
        assert_eq!(model.output.dpi, 300);
        assert_eq!(model.output.id_column, "id_number");
        assert_eq!(model.photo.match_keys, vec!["name", "id_number"]);
        assert!(model.mrz.is_none());

        match &model.fields[0].kind {
            FieldKind::Text(text) => {
                assert_eq!(text.style.size, 20.0);
                assert_eq!(text.style.color.to_string(), "#000000");
                assert_eq!(text.style.family.as_deref(), Some("OCR-B.ttf"));
            }
            other => panic!("expected text field, got {other:?}"),
        }
        match &model.fields[1].kind {
            FieldKind::Date(date) => {
                assert_eq!(date.pattern, "%Y/%m/%d");
                assert_eq!(date.positions[2], Point::new(60.0, 0.0));
            }
            other => panic!("expected date field, got {other:?}"),
        }
        match &model.fields[2].kind {
            FieldKind::Barcode(code) => assert_eq!(code.size, Some((120, 30))),
            other => panic!("expected barcode field, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_background_image() {
        let fx = fixture();
        let mut doc = template();
        doc["background"]["image"] = json!("nope.png");
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["background.image"]);
    }

    #[test]
    fn test_date_with_two_positions() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][1]["position"] = json!([[0, 0], [40, 0]]);
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[1].position"]);
    }

    #[test]
    fn test_errors_are_aggregated_across_sections() {
        let fx = fixture();
        let mut doc = template();
        doc["background"]["color"] = json!("notacolor");
        doc["fields"][0]["type"] = json!("signature");
        doc["fields"][2]["font_family"] = json!("Comic Sans");
        doc["photo"]["folder"] = json!("empty");
        doc["output"]["dpi"] = json!(0);
        doc["output"]["save_to"] = json!("{id_number/out");
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(
            paths(&err),
            vec![
                "background.color",
                "fields[0].type",
                "fields[2].font_family",
                "photo.folder",
                "output.dpi",
                "output.save_to",
            ]
        );
    }

    #[test]
    fn test_field_option_placement() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][0]["size"] = json!([10, 10]);
        doc["fields"][2]["date_format"] = json!("%Y/%m/%d");
        doc["fields"][2]["size"] = json!([0, 10]);
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(
            paths(&err),
            vec!["fields[0].size", "fields[2].date_format", "fields[2].size"]
        );
    }

    #[test]
    fn test_date_format_must_split_in_three() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][1]["date_format"] = json!("%Y-%m-%d");
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[1].date_format"]);

        doc["fields"][1]["date_format"] = json!("%d/%m/%Y");
        assert!(validate(&doc, &fx.ctx).is_ok());
    }

    #[test]
    fn test_duplicate_keys_and_bad_shapes() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][2]["key"] = json!("name");
        doc["fields"].as_array_mut().unwrap().push(json!({ "key": "x" }));
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[2].key", "fields[3]"]);
    }

    #[test]
    fn test_disabled_photo_skips_folder_checks() {
        let fx = fixture();
        let mut doc = template();
        doc["photo"]["enabled"] = json!(false);
        doc["photo"]["folder"] = json!("does-not-exist");
        let model = validate(&doc, &fx.ctx).unwrap();
        assert!(!model.photo.enabled);

        doc.as_object_mut().unwrap().remove("photo");
        assert!(!validate(&doc, &fx.ctx).unwrap().photo.enabled);
    }

    #[test]
    fn test_disabled_photo_ignores_size() {
        let fx = fixture();
        let mut doc = template();
        doc["photo"]["size"] = json!([0, 0]);
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["photo.size"]);

        doc["photo"]["enabled"] = json!(false);
        let model = validate(&doc, &fx.ctx).unwrap();
        assert!(!model.photo.enabled);
        assert_eq!(model.photo.size, (0, 0));
    }

    #[test]
    fn test_oversized_font_and_boxes_are_rejected() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][0]["font_size"] = json!(1.0e9);
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[0].font_size"]);

        let mut doc = template();
        doc["fields"][2]["size"] = json!([120, 1_000_000]);
        doc["photo"]["size"] = json!([100_000, 80]);
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[2].size", "photo.size"]);

        let mut doc = template();
        doc["fields"][0]["font_size"] = json!(MAX_FONT_SIZE);
        doc["photo"]["size"] = json!([MAX_BOX_SIDE, MAX_BOX_SIDE]);
        assert!(validate(&doc, &fx.ctx).is_ok());
    }

    #[test]
    fn test_malformed_position_is_reported_at_position() {
        let fx = fixture();
        let mut doc = template();
        doc["fields"][0]["position"] = json!([1, 2, 3]);
        doc["fields"][1]["position"] = json!("top-left");
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["fields[0].position", "fields[1].position"]);
    }

    #[test]
    fn test_missing_sections_and_unknown_keys() {
        let fx = fixture();
        let mut doc = template();
        let obj = doc.as_object_mut().unwrap();
        obj.remove("output");
        obj.remove("id");
        obj.insert("extra".into(), json!(1));
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert!(err.contains_path("extra"));
        assert!(err.contains_path("id"));
        assert!(err.contains_path("output"));
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn test_mrz_section() {
        let fx = fixture();
        let mut doc = template();
        doc["mrz"] = json!({
            "country": "country", "last_name": "last_name", "first_name": "first_name",
            "document_number": "passport_number", "nationality": "nationality",
            "birth_date": "birth_date", "sex": "sex", "expiry_date": "", "personal_id": "id_number"
        });
        let err = validate(&doc, &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["mrz.expiry_date"]);

        doc["mrz"]["expiry_date"] = json!("expiry_date");
        let model = validate(&doc, &fx.ctx).unwrap();
        assert_eq!(model.mrz.unwrap().personal_id.as_deref(), Some("id_number"));
    }

    #[test]
    fn test_non_object_template() {
        let fx = fixture();
        let err = validate(&json!([1, 2]), &fx.ctx).unwrap_err();
        assert_eq!(paths(&err), vec!["$"]);
    }
}
