//! Serde shapes of the template JSON, before validation.
//!
//! Each section is deserialized on its own so that one malformed section
//! does not hide errors in the others. Nothing here is trusted; the
//! validator turns these into the types in [`super::model`].

use serde::Deserialize;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBackground {
    pub image: String,
    pub color: String,
}

/// Either a single `[x, y]` or a list of them (date fields).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPosition {
    Single([f32; 2]),
    Multi(Vec<[f32; 2]>),
}

impl RawPosition {
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawField {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Kept loose so a bad shape is reported at `position` rather than
    /// failing the whole field; see [`RawPosition::from_value`].
    pub position: serde_json::Value,
    pub data_path: String,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub font_color: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub size: Option<[i64; 2]>,
    #[serde(default)]
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPhoto {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub folder: String,
    pub position: [i64; 2],
    pub size: [i64; 2],
    #[serde(default)]
    pub border_radius: u32,
    #[serde(default)]
    pub match_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOutput {
    #[serde(default)]
    pub dpi: Option<i64>,
    pub save_to: String,
    pub output_file_format: String,
    #[serde(default)]
    pub other_file: Vec<String>,
    #[serde(default)]
    pub id_column: Option<String>,
}

/// Column names feeding the machine-readable zone.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMrz {
    pub country: String,
    pub last_name: String,
    pub first_name: String,
    pub document_number: String,
    pub nationality: String,
    pub birth_date: String,
    pub sex: String,
    pub expiry_date: String,
    #[serde(default)]
    pub personal_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_shapes() {
        let single: RawPosition = serde_json::from_value(json!([10, 20.5])).unwrap();
        assert_eq!(single, RawPosition::Single([10.0, 20.5]));

        let multi: RawPosition =
            serde_json::from_value(json!([[1, 2], [3, 4], [5, 6]])).unwrap();
        assert_eq!(multi, RawPosition::Multi(vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]));

        assert!(serde_json::from_value::<RawPosition>(json!("10,20")).is_err());
        assert_eq!(RawPosition::from_value(&json!([1, 2, 3])), None);
        assert_eq!(RawPosition::from_value(&json!([3, 4])), Some(RawPosition::Single([3.0, 4.0])));
    }

    #[test]
    fn test_field_rejects_unknown_keys() {
        let value = json!({
            "key": "name", "type": "text", "position": [0, 0],
            "data_path": "name", "colour": "#000000"
        });
        assert!(serde_json::from_value::<RawField>(value).is_err());
    }

    #[test]
    fn test_photo_defaults() {
        let photo: RawPhoto = serde_json::from_value(json!({
            "folder": "photos", "position": [1, 2], "size": [30, 40]
        }))
        .unwrap();
        assert!(photo.enabled);
        assert_eq!(photo.border_radius, 0);
        assert!(photo.match_keys.is_none());
    }
}
