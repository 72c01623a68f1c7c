use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Number of leading rows examined by column-type inference and returned
/// by dataset previews.
pub const SAMPLE_ROWS: usize = 5;

/// A single scalar cell value: either a number or a piece of text.
///
/// Serializes untagged, so a row round-trips through JSON as a plain
/// `{"column": value}` object where each value is a bare number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric view of the value. Text parses if it holds a number,
    /// otherwise `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        }
    }

    /// Numeric coercion used when building chart series: anything that is
    /// not a number becomes 0.
    pub fn coerce_number(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One row record: a mapping from column name to scalar value. The schema is
/// whatever keys the first parsed row happened to contain; later rows are not
/// forced to match it.
pub type Row = HashMap<String, CellValue>;

/// A named table of rows uploaded by a user.
///
/// Created on successful file parse, never mutated afterwards, destroyed on
/// explicit removal. A re-upload creates a fresh `Dataset` with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique identifier (UUID v4, as a string)
    pub id: String,

    /// Display name shown in dataset listings
    pub name: String,

    /// Ordered column names, taken from the first parsed row
    pub columns: Vec<String>,

    /// Ordered row records
    pub rows: Vec<Row>,

    /// Creation timestamp; serialized as RFC 3339 text
    pub created_at: DateTime<Utc>,

    /// Username of the uploader, or "unknown" for anonymous uploads
    pub created_by: String,
}

impl Dataset {
    pub fn new(name: &str, columns: Vec<String>, rows: Vec<Row>, created_by: &str) -> Self {
        Dataset {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            columns,
            rows,
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First `n` rows, for table previews.
    pub fn preview(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Text content of one cell; a missing cell degrades to an empty string.
    pub fn cell_text(&self, row: &Row, column: &str) -> String {
        row.get(column).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Heuristic numeric-column classification.
    ///
    /// Samples up to [`SAMPLE_ROWS`] leading rows; the column counts as
    /// numeric when strictly more than half of the sampled values are a
    /// number or a numeric-parseable string. First rows that are atypical
    /// can misclassify the column; there is no correction mechanism.
    ///
    /// # Arguments
    /// * `column` - Name of the column to classify
    ///
    /// # Returns
    /// * `bool` - Whether the column should be offered as a value axis
    pub fn is_numeric_column(&self, column: &str) -> bool {
        let sample_size = SAMPLE_ROWS.min(self.rows.len());
        if sample_size == 0 {
            return false;
        }

        let numeric_count = self.rows[..sample_size]
            .iter()
            .filter(|row| row.get(column).and_then(CellValue::as_number).is_some())
            .count();

        numeric_count as f64 / sample_size as f64 > 0.5
    }

    /// Columns eligible for the value axis, in dataset column order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.is_numeric_column(c))
            .cloned()
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_dataset(rows: Vec<Row>) -> Dataset {
        Dataset::new(
            "sales",
            vec!["region".to_string(), "amount".to_string()],
            rows,
            "tester",
        )
    }

    #[test]
    fn numeric_value_parsing() {
        assert_eq!(num(3.5).as_number(), Some(3.5));
        assert_eq!(text("42").as_number(), Some(42.0));
        assert_eq!(text(" 42.5 ").as_number(), Some(42.5));
        assert_eq!(text("n/a").as_number(), None);
        assert_eq!(text("").as_number(), None);
        assert_eq!(text("oops").coerce_number(), 0.0);
    }

    #[test]
    fn display_formats_whole_numbers_without_fraction() {
        assert_eq!(num(3.0).to_string(), "3");
        assert_eq!(num(3.25).to_string(), "3.25");
        assert_eq!(text("east").to_string(), "east");
    }

    #[test]
    fn column_with_three_of_five_numeric_samples_is_numeric() {
        let rows = vec![
            row(&[("amount", num(1.0))]),
            row(&[("amount", text("2"))]),
            row(&[("amount", text("n/a"))]),
            row(&[("amount", num(4.0))]),
            row(&[("amount", text("-"))]),
        ];
        let ds = sample_dataset(rows);
        assert!(ds.is_numeric_column("amount"));
    }

    #[test]
    fn column_with_two_of_five_numeric_samples_is_not_numeric() {
        let rows = vec![
            row(&[("amount", num(1.0))]),
            row(&[("amount", text("2"))]),
            row(&[("amount", text("n/a"))]),
            row(&[("amount", text("x"))]),
            row(&[("amount", text("-"))]),
        ];
        let ds = sample_dataset(rows);
        assert!(!ds.is_numeric_column("amount"));
    }

    #[test]
    fn inference_only_samples_leading_rows() {
        // First five rows are text; the numeric tail never gets sampled.
        let mut rows: Vec<Row> = (0..5).map(|_| row(&[("amount", text("n/a"))])).collect();
        rows.extend((0..20).map(|i| row(&[("amount", num(i as f64))])));
        let ds = sample_dataset(rows);
        assert!(!ds.is_numeric_column("amount"));
    }

    #[test]
    fn missing_cells_count_as_non_numeric() {
        let rows = vec![
            row(&[("amount", num(1.0))]),
            row(&[("region", text("east"))]),
            row(&[("region", text("west"))]),
        ];
        let ds = sample_dataset(rows);
        assert!(!ds.is_numeric_column("amount"));
        assert!(!ds.is_numeric_column("absent"));
    }

    #[test]
    fn numeric_columns_keep_dataset_order() {
        let rows = vec![row(&[("region", text("east")), ("amount", num(10.0))])];
        let ds = sample_dataset(rows);
        assert_eq!(ds.numeric_columns(), vec!["amount".to_string()]);
    }

    #[test]
    fn empty_dataset_has_no_numeric_columns() {
        let ds = sample_dataset(Vec::new());
        assert!(ds.numeric_columns().is_empty());
        assert!(ds.preview(SAMPLE_ROWS).is_empty());
    }

    #[test]
    fn preview_is_clamped_to_row_count() {
        let rows = vec![
            row(&[("region", text("east"))]),
            row(&[("region", text("west"))]),
        ];
        let ds = sample_dataset(rows);
        assert_eq!(ds.preview(5).len(), 2);
        assert_eq!(ds.preview(1).len(), 1);
    }

    #[test]
    fn missing_cell_text_is_empty() {
        let rows = vec![row(&[("region", text("east"))])];
        let ds = sample_dataset(rows);
        let first = &ds.rows[0];
        assert_eq!(ds.cell_text(first, "region"), "east");
        assert_eq!(ds.cell_text(first, "amount"), "");
    }

    #[test]
    fn timestamps_round_trip_as_text() {
        let ds = sample_dataset(Vec::new());
        let json = serde_json::to_string(&ds).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        // Stored as text, not an epoch number
        assert!(value["created_at"].is_string());
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.created_at, ds.created_at);
    }
}
