#![cfg(not(tarpaulin_include))]

use crate::dataset::{CellValue, Row};
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// File extensions accepted by the upload flow (lowercase, without dot).
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// Message surfaced when a file with any other extension is offered.
pub const UNSUPPORTED_MESSAGE: &str =
    "Invalid file type. Only Excel and CSV files are supported.";

/// Message surfaced when a parse yields no data rows.
pub const EMPTY_MESSAGE: &str = "No data found in the file.";

/// Result of parsing an uploaded file: ordered column names plus row records.
///
/// The column list equals the keys of the first parsed row (header row);
/// individual records may still miss some of those keys.
#[derive(Debug)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Whether a filename carries a supported spreadsheet extension.
/// The check is case-insensitive; a file without an extension is rejected.
pub fn is_supported(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Default dataset name for an uploaded file: the filename without its
/// final extension.
pub fn default_name(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string())
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Detect file type and load the appropriate format
///
/// Examines the file extension and dispatches to the CSV or Excel parser.
/// Anything other than `.csv`, `.xls`, or `.xlsx` is rejected with a
/// user-visible message.
///
/// # Arguments
/// * `filepath` - Path to the file to load
///
/// # Returns
/// * `Result<ParsedTable, Box<dyn Error>>` - Parsed columns and rows, or an error
///
/// # Examples
/// ```no_run
/// use vizboard::loader::load_table;
///
/// match load_table("data.csv") {
///     Ok(table) => println!("Loaded {} rows", table.rows.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_table(filepath: impl AsRef<Path>) -> Result<ParsedTable, Box<dyn Error>> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        #[cfg(feature = "web")]
        Some("xlsx") | Some("xls") => from_excel(path),
        #[cfg(not(feature = "web"))]
        Some("xlsx") | Some("xls") => Err("Excel support requires the 'web' feature".into()),
        _ => Err(UNSUPPORTED_MESSAGE.into()),
    }
}

/// Load a table from a CSV file
///
/// The first line is the header; every later non-empty line becomes a row
/// record keyed by the header cells. Quoted fields, embedded commas, doubled
/// quotes, and CRLF endings are handled. Cell text that parses as a number
/// is stored as a number.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<ParsedTable, Box<dyn Error>>` - Parsed columns and rows, or an error
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<ParsedTable, Box<dyn Error>> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();

    let mut iter = lines.into_iter().filter(|line| !line.trim().is_empty());
    let header = match iter.next() {
        Some(line) => line,
        None => return Err(EMPTY_MESSAGE.into()),
    };

    let names = header_names(&parse_csv_row(&header));
    let mut rows = Vec::new();

    for line in iter {
        let cells = parse_csv_row(&line);
        let mut record = Row::new();
        for (i, cell) in cells.iter().enumerate() {
            if i >= names.len() {
                break; // extra cells beyond the header are dropped
            }
            if cell.is_empty() {
                continue; // empty cells are absent from the record
            }
            record.insert(names[i].clone(), coerce_value(cell));
        }
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(EMPTY_MESSAGE.into());
    }

    Ok(ParsedTable {
        columns: dedupe_keep_first(&names),
        rows,
    })
}

/// Load a table from an Excel file
///
/// Reads the first worksheet of an `.xlsx`/`.xls` workbook. The first row is
/// the header; Int and Float cells become numbers, everything else text, and
/// empty cells are absent from the record.
///
/// # Arguments
/// * `filepath` - Path to the Excel file to load
///
/// # Returns
/// * `Result<ParsedTable, Box<dyn Error>>` - Parsed columns and rows, or an error
#[cfg(feature = "web")]
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<ParsedTable, Box<dyn Error>> {
    use calamine::{Data, Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(filepath)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or("No sheets found in the workbook")?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut row_iter = range.rows();
    let header = match row_iter.next() {
        Some(cells) => cells,
        None => return Err(EMPTY_MESSAGE.into()),
    };

    let header_cells: Vec<String> = header
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();
    let names = header_names(&header_cells);

    let mut rows = Vec::new();
    for cells in row_iter {
        let mut record = Row::new();
        for (i, cell) in cells.iter().enumerate() {
            if i >= names.len() {
                break;
            }
            let value = match cell {
                Data::Empty => continue,
                Data::Int(n) => CellValue::Number(*n as f64),
                Data::Float(f) => CellValue::Number(*f),
                Data::String(s) => {
                    if s.trim().is_empty() {
                        continue;
                    }
                    CellValue::Text(s.clone())
                }
                Data::Bool(b) => CellValue::Text(b.to_string()),
                other => {
                    let text = other.to_string();
                    if text.trim().is_empty() {
                        continue;
                    }
                    CellValue::Text(text)
                }
            };
            record.insert(names[i].clone(), value);
        }
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(EMPTY_MESSAGE.into());
    }

    Ok(ParsedTable {
        columns: dedupe_keep_first(&names),
        rows,
    })
}

// Parse a CSV row into a vector of strings, honoring quoted fields and
// doubled quotes.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        // Doubled quote inside a quoted field
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

// Positional header names: blank cells get a fallback like "Column3".
fn header_names(cells: &[String]) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                format!("Column{}", i + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

fn dedupe_keep_first(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

fn coerce_value(cell: &str) -> CellValue {
    match cell.trim().parse::<f64>() {
        Ok(n) => CellValue::Number(n),
        Err(_) => CellValue::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn columns_equal_header_of_first_row() {
        let file = write_csv("region,amount\neast,10\nwest,20\n");
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.columns, vec!["region", "amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0].get("region"),
            Some(&CellValue::Text("east".to_string()))
        );
        assert_eq!(table.rows[0].get("amount"), Some(&CellValue::Number(10.0)));
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let file = write_csv("name,note\nwidget,\"a, \"\"big\"\" one\"\n");
        let table = from_csv(file.path()).unwrap();
        assert_eq!(
            table.rows[0].get("note"),
            Some(&CellValue::Text("a, \"big\" one".to_string()))
        );
    }

    #[test]
    fn crlf_lines_are_handled() {
        let file = write_csv("region,amount\r\neast,10\r\n");
        let table = from_csv(file.path()).unwrap();
        assert_eq!(table.columns, vec!["region", "amount"]);
        assert_eq!(table.rows[0].get("amount"), Some(&CellValue::Number(10.0)));
    }

    #[test]
    fn header_only_file_is_an_error() {
        let file = write_csv("region,amount\n");
        let err = from_csv(file.path()).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_MESSAGE);
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = write_csv("");
        let err = from_csv(file.path()).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_MESSAGE);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"region,amount\neast,10\n").unwrap();
        let err = load_table(file.path()).unwrap_err();
        assert_eq!(err.to_string(), UNSUPPORTED_MESSAGE);
    }

    #[test]
    fn blank_header_cells_get_positional_names() {
        let file = write_csv("region,,amount\neast,x,10\n");
        let table = from_csv(file.path()).unwrap();
        assert_eq!(table.columns, vec!["region", "Column2", "amount"]);
        assert_eq!(
            table.rows[0].get("Column2"),
            Some(&CellValue::Text("x".to_string()))
        );
    }

    #[test]
    fn short_rows_leave_cells_absent() {
        let file = write_csv("region,amount\neast\n");
        let table = from_csv(file.path()).unwrap();
        assert_eq!(table.rows[0].get("amount"), None);
    }

    #[test]
    fn empty_cells_are_absent_from_the_record() {
        let file = write_csv("region,amount\neast,\n");
        let table = from_csv(file.path()).unwrap();
        assert_eq!(table.rows[0].get("amount"), None);
    }

    #[cfg(feature = "web")]
    #[test]
    fn excel_files_load_with_typed_cells() {
        use crate::dataset::Dataset;

        let mut row = Row::new();
        row.insert("region".to_string(), CellValue::Text("east".to_string()));
        row.insert("amount".to_string(), CellValue::Number(10.0));
        let dataset = Dataset::new(
            "workbook",
            vec!["region".to_string(), "amount".to_string()],
            vec![row],
            "tester",
        );

        let bytes = crate::downloader::to_xlsx(&dataset).unwrap();
        let mut file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(&bytes).unwrap();

        let table = load_table(file.path()).unwrap();
        assert_eq!(table.columns, vec!["region", "amount"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("amount"), Some(&CellValue::Number(10.0)));
        assert_eq!(
            table.rows[0].get("region"),
            Some(&CellValue::Text("east".to_string()))
        );
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported("report.CSV"));
        assert!(is_supported("report.XlSx"));
        assert!(is_supported("report.xls"));
        assert!(!is_supported("report.txt"));
        assert!(!is_supported("report"));
    }

    #[test]
    fn default_name_strips_the_extension() {
        assert_eq!(default_name("sales report.xlsx"), "sales report");
        assert_eq!(default_name("data.csv"), "data");
        assert_eq!(default_name("noext"), "noext");
    }
}
