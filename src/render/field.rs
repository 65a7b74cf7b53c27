//! Field dispatch: draws one template field for one record.
//!
//! | Kind | Value source | Drawing |
//! |------|--------------|---------|
//! | text / number | column value, `{key}` markers interpolated | one text run at the position |
//! | date | `YYYY/MM/DD` column value | formatted, split on `/`, three runs |
//! | barcode | column value | encoded bitmap, optionally cover-fitted, pasted |
//!
//! A field never aborts the document. Missing values are skipped with a
//! warning; anything else that goes wrong comes back as a
//! [`FieldRenderError`] for the caller to log.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::barcode::{BarcodeEncoder, blank_barcode};
use super::canvas::Canvas;
use super::context::RenderContext;
use super::fit::fit_cover;
use crate::data::DataRow;
use crate::error::FieldRenderError;
use crate::font::FontFace;
use crate::interpolate::{has_placeholders, interpolate};
use crate::template::model::format_date;
use crate::template::{BarcodeField, DateField, FieldDefinition, FieldKind, TextField};

/// Format date columns are expected in.
pub const SOURCE_DATE_FORMAT: &str = "%Y/%m/%d";

static BITMAP_FACE: FontFace = FontFace::Bitmap;

/// What happened to a field that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    Drawn,
    Skipped,
}

/// Draws fields of one record.
pub struct FieldRenderer<'a> {
    faces: &'a HashMap<String, FontFace>,
    encoder: &'a dyn BarcodeEncoder,
    barcode_radius: u32,
    ctx: &'a RenderContext,
}

impl<'a> FieldRenderer<'a> {
    /// `faces` maps field keys to their resolved fonts; fields without an
    /// entry use the bitmap font. `barcode_radius` rounds sized barcodes.
    pub fn new(
        faces: &'a HashMap<String, FontFace>,
        encoder: &'a dyn BarcodeEncoder,
        barcode_radius: u32,
        ctx: &'a RenderContext,
    ) -> Self {
        Self {
            faces,
            encoder,
            barcode_radius,
            ctx,
        }
    }

    fn face(&self, key: &str) -> &FontFace {
        self.faces.get(key).unwrap_or(&BITMAP_FACE)
    }

    pub fn render(
        &self,
        canvas: &mut Canvas,
        field: &FieldDefinition,
        row: &DataRow,
    ) -> Result<FieldOutcome, FieldRenderError> {
        let Some(value) = row.value(&field.data_path) else {
            self.ctx.field_warn(
                &field.key,
                format!("no value for data path '{}', field skipped", field.data_path),
            );
            return Ok(FieldOutcome::Skipped);
        };

        match &field.kind {
            FieldKind::Text(text) => self.render_text(canvas, field, text, value, row),
            FieldKind::Date(date) => self.render_date(canvas, field, date, value),
            FieldKind::Barcode(barcode) => self.render_barcode(canvas, field, barcode, value),
        }
    }

    fn render_text(
        &self,
        canvas: &mut Canvas,
        field: &FieldDefinition,
        text: &TextField,
        value: &str,
        row: &DataRow,
    ) -> Result<FieldOutcome, FieldRenderError> {
        let content = if has_placeholders(value) {
            interpolate(value, row)?
        } else {
            value.to_string()
        };
        canvas.draw_text(self.face(&field.key), text.position, &content, &text.style);
        Ok(FieldOutcome::Drawn)
    }

    fn render_date(
        &self,
        canvas: &mut Canvas,
        field: &FieldDefinition,
        date: &DateField,
        value: &str,
    ) -> Result<FieldOutcome, FieldRenderError> {
        let face = self.face(&field.key);

        let parsed = match NaiveDate::parse_from_str(value.trim(), SOURCE_DATE_FORMAT) {
            Ok(parsed) => parsed,
            Err(_) => {
                self.ctx.field_error(
                    &field.key,
                    format!("cannot parse date '{}' (expected YYYY/MM/DD), drawing it unsplit", value),
                );
                canvas.draw_text(face, date.positions[0], value, &date.style);
                return Ok(FieldOutcome::Drawn);
            }
        };

        let formatted = format_date(parsed, &date.pattern).ok_or_else(|| FieldRenderError::DatePattern {
            pattern: date.pattern.clone(),
        })?;
        let parts: Vec<&str> = formatted.split('/').collect();
        if parts.len() != 3 {
            return Err(FieldRenderError::DateParts {
                value: formatted.clone(),
                found: parts.len(),
            });
        }

        for (position, part) in date.positions.iter().zip(parts) {
            canvas.draw_text(face, *position, part, &date.style);
        }
        Ok(FieldOutcome::Drawn)
    }

    fn render_barcode(
        &self,
        canvas: &mut Canvas,
        field: &FieldDefinition,
        barcode: &BarcodeField,
        value: &str,
    ) -> Result<FieldOutcome, FieldRenderError> {
        let mut bitmap = match self.encoder.encode(value) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                self.ctx.field_error(&field.key, format!("barcode encoding failed: {}", e));
                blank_barcode()
            }
        };

        if let Some((width, height)) = barcode.size {
            bitmap = fit_cover(&bitmap, width, height, self.barcode_radius)?;
        }

        canvas.paste(
            &bitmap,
            barcode.position.x.trunc() as i64,
            barcode.position.y.trunc() as i64,
        );
        Ok(FieldOutcome::Drawn)
    }
}
