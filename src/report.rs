//! Batch results.

use std::fmt;
use std::path::PathBuf;

/// Outcome of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub id: String,
    pub success: bool,
    /// Empty on success.
    pub message: String,
    /// Saved document, when there is one.
    pub output: Option<PathBuf>,
}

impl RecordOutcome {
    pub fn succeeded(id: impl Into<String>, output: PathBuf) -> Self {
        Self {
            id: id.into(),
            success: true,
            message: String::new(),
            output: Some(output),
        }
    }

    pub fn failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            message: message.into(),
            output: None,
        }
    }

    pub fn as_tuple(&self) -> (&str, bool, &str) {
        (&self.id, self.success, &self.message)
    }
}

/// Per-record outcomes in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<RecordOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    pub fn tuples(&self) -> Vec<(&str, bool, &str)> {
        self.outcomes.iter().map(RecordOutcome::as_tuple).collect()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .outcomes
            .iter()
            .map(|o| o.id.chars().count())
            .max()
            .unwrap_or(0)
            .max(2);
        writeln!(f, "{:<width$}  STATUS  DETAIL", "ID")?;
        for outcome in &self.outcomes {
            let (status, detail) = if outcome.success {
                let path = outcome
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                ("ok", path)
            } else {
                ("FAILED", outcome.message.clone())
            };
            writeln!(f, "{:<width$}  {:<6}  {}", outcome.id, status, detail)?;
        }
        write!(f, "{}/{} succeeded", self.succeeded(), self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_and_tuples() {
        let report = BatchReport::new(vec![
            RecordOutcome::succeeded("A1", PathBuf::from("out/A1.png")),
            RecordOutcome::failed("B2", "photo could not be decoded"),
        ]);
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(
            report.tuples(),
            vec![("A1", true, ""), ("B2", false, "photo could not be decoded")]
        );
    }

    #[test]
    fn test_table_display() {
        let report = BatchReport::new(vec![
            RecordOutcome::succeeded("A1", PathBuf::from("out/A1.png")),
            RecordOutcome::failed("unknown", "cancelled"),
        ]);
        assert_eq!(
            report.to_string(),
            "ID       STATUS  DETAIL\nA1       ok      out/A1.png\nunknown  FAILED  cancelled\n1/2 succeeded"
        );
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::default();
        assert!(report.all_succeeded());
        assert_eq!(report.to_string(), "ID  STATUS  DETAIL\n0/0 succeeded");
    }
}
