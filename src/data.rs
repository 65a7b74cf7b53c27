//! # Data Records
//!
//! One [`DataRow`] per person/document instance. Rows are created once from
//! the tabular source and then only read; derived values (such as MRZ lines)
//! are added by building a new row with [`DataRow::with_values`].

use std::path::Path;

use indexmap::IndexMap;

use crate::error::IdforgeError;

/// Ordered mapping from column name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
    values: IndexMap<String, String>,
}

impl DataRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(key, value)` pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw lookup. Returns `Some("")` for present-but-empty columns.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Lookup that treats empty values as missing.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Identifier used in reports and log lines.
    pub fn record_id(&self, id_column: &str) -> String {
        self.value(id_column).unwrap_or("unknown").to_string()
    }

    /// A copy of this row with additional (or overriding) values.
    pub fn with_values<K, V>(&self, extra: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = self.values.clone();
        for (k, v) in extra {
            values.insert(k.into(), v.into());
        }
        Self { values }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Load every record of a CSV file with a header row.
///
/// Rows shorter than the header simply lack the trailing columns; fields
/// depending on them become no-ops at render time.
pub fn load_csv(path: &Path) -> Result<Vec<DataRow>, IdforgeError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| IdforgeError::Data(format!("failed to open {}: {}", path.display(), e)))?;
    read_rows(reader)
        .map_err(|e| IdforgeError::Data(format!("failed to read {}: {}", path.display(), e)))
}

/// Parse CSV records from any reader (used by tests and `load_csv`).
pub fn parse_csv<R: std::io::Read>(input: R) -> Result<Vec<DataRow>, IdforgeError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    read_rows(reader).map_err(|e| IdforgeError::Data(e.to_string()))
}

fn read_rows<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<DataRow>, csv::Error> {
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(DataRow::from_pairs(
            headers.iter().zip(record.iter()).map(|(h, v)| (h.trim(), v)),
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_treats_empty_as_missing() {
        let row = DataRow::from_pairs([("a", "1"), ("b", "")]);
        assert_eq!(row.get("b"), Some(""));
        assert_eq!(row.value("b"), None);
        assert_eq!(row.value("a"), Some("1"));
        assert_eq!(row.value("c"), None);
    }

    #[test]
    fn test_record_id_defaults_to_unknown() {
        let row = DataRow::from_pairs([("id_number", "A1")]);
        assert_eq!(row.record_id("id_number"), "A1");
        assert_eq!(row.record_id("passport"), "unknown");
    }

    #[test]
    fn test_with_values_leaves_source_row_untouched() {
        let row = DataRow::from_pairs([("a", "1")]);
        let derived = row.with_values([("b", "2"), ("a", "3")]);
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(row.get("b"), None);
        assert_eq!(derived.get("a"), Some("3"));
        assert_eq!(derived.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_csv_keeps_column_order() {
        let csv = "name,id_number,birth_date\nLin,A100000003,1990/01/01\nWu,B200000004,\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["name", "id_number", "birth_date"]
        );
        assert_eq!(rows[0].get("birth_date"), Some("1990/01/01"));
        assert_eq!(rows[1].value("birth_date"), None);
    }

    #[test]
    fn test_parse_csv_short_rows() {
        let csv = "a,b,c\n1,2\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].get("b"), Some("2"));
        assert_eq!(rows[0].get("c"), None);
    }
}
