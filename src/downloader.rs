#![cfg(not(tarpaulin_include))]

use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error;

use crate::dataset::Dataset;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Download filename for a rendered chart: the display title with runs of
/// whitespace collapsed to underscores, plus the `.png` suffix.
pub fn chart_filename(title: &str) -> String {
    let base = WHITESPACE.replace_all(title.trim(), "_").to_string();
    if base.is_empty() {
        "chart.png".to_string()
    } else {
        format!("{}.png", base)
    }
}

/// Convert a dataset to CSV format
///
/// The first line holds the column names; each row record follows in column
/// order, with a missing cell rendered as an empty field. Commas, quotes,
/// and newlines are escaped.
///
/// # Arguments
/// * `dataset` - Reference to the dataset to convert
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
pub fn to_csv(dataset: &Dataset) -> Result<String, Box<dyn Error>> {
    let mut csv_content = String::new();

    for (i, column) in dataset.columns.iter().enumerate() {
        if i > 0 {
            csv_content.push(',');
        }
        csv_content.push_str(&escape_field(column));
    }
    csv_content.push('\n');

    for row in &dataset.rows {
        for (i, column) in dataset.columns.iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            csv_content.push_str(&escape_field(&dataset.cell_text(row, column)));
        }
        csv_content.push('\n');
    }

    Ok(csv_content)
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

/// Convert a dataset to XLSX format
///
/// Exports the dataset to an Excel workbook using the rust_xlsxwriter
/// library: one header row followed by the records, numbers written as
/// numbers and text as text.
///
/// # Arguments
/// * `dataset` - Reference to the dataset to convert
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(dataset: &Dataset) -> Result<Vec<u8>, Box<dyn Error>> {
    use crate::dataset::CellValue;
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, column) in dataset.columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, column)?;
    }

    for (r, row) in dataset.rows.iter().enumerate() {
        for (c, column) in dataset.columns.iter().enumerate() {
            match row.get(column) {
                Some(CellValue::Number(n)) => {
                    worksheet.write_number((r + 1) as u32, c as u16, *n)?;
                }
                Some(CellValue::Text(s)) => {
                    worksheet.write_string((r + 1) as u32, c as u16, s)?;
                }
                None => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, Row};

    fn sample_dataset() -> Dataset {
        let mut first = Row::new();
        first.insert("region".to_string(), CellValue::Text("east".to_string()));
        first.insert("amount".to_string(), CellValue::Number(10.0));
        let mut second = Row::new();
        second.insert(
            "region".to_string(),
            CellValue::Text("west, \"far\"".to_string()),
        );
        Dataset::new(
            "sales",
            vec!["region".to_string(), "amount".to_string()],
            vec![first, second],
            "tester",
        )
    }

    #[test]
    fn csv_has_header_and_escaped_fields() {
        let csv = to_csv(&sample_dataset()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("region,amount"));
        assert_eq!(lines.next(), Some("east,10"));
        // missing amount renders as an empty trailing field
        assert_eq!(lines.next(), Some("\"west, \"\"far\"\"\","));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn chart_filenames_replace_whitespace_runs() {
        assert_eq!(chart_filename("Data Visualization"), "Data_Visualization.png");
        assert_eq!(chart_filename("  sales   by  region "), "sales_by_region.png");
        assert_eq!(chart_filename(""), "chart.png");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_produces_a_workbook() {
        let bytes = to_xlsx(&sample_dataset()).unwrap();
        // XLSX files are zip containers
        assert_eq!(&bytes[..2], b"PK");
    }
}
