use vizboard::chart::{ChartConfig, ChartKind, ChartSeries, derive_series};
use vizboard::dataset::{CellValue, Dataset, Row, SAMPLE_ROWS};
use vizboard::registry::DataRegistry;
use vizboard::store::DatasetStore;

// Helper to build a row record from (column, value) pairs
fn make_row(pairs: &[(&str, CellValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sample_dataset() -> Dataset {
    let rows = vec![
        make_row(&[
            ("region", CellValue::Text("east".to_string())),
            ("amount", CellValue::Number(10.0)),
        ]),
        make_row(&[
            ("region", CellValue::Text("west".to_string())),
            ("amount", CellValue::Text("20".to_string())),
        ]),
        make_row(&[
            ("region", CellValue::Text("north".to_string())),
            ("amount", CellValue::Number(15.0)),
        ]),
    ];
    Dataset::new(
        "regional sales",
        vec!["region".to_string(), "amount".to_string()],
        rows,
        "check",
    )
}

// Test numeric-column inference on the sample dataset
fn test_numeric_inference() {
    println!("\n====== Testing numeric-column inference ======");
    let ds = sample_dataset();

    assert!(ds.is_numeric_column("amount"));
    println!("✓ 'amount' classified as numeric");

    assert!(!ds.is_numeric_column("region"));
    println!("✓ 'region' classified as non-numeric");

    assert_eq!(ds.numeric_columns(), vec!["amount".to_string()]);
    println!("✓ Value-axis candidates are exactly ['amount']");
}

// Test series derivation for every chart kind
fn test_series_derivation() {
    println!("\n====== Testing chart series derivation ======");
    let ds = sample_dataset();

    for kind in ChartKind::ALL {
        let config = ChartConfig::new(kind, "region", "amount", "Check");
        let series = derive_series(&ds, &config).expect("series should derive");

        match (kind, &series) {
            (ChartKind::Scatter, ChartSeries::Points(points)) => {
                assert_eq!(points.len(), ds.row_count());
                println!("✓ scatter derives {} point pairs", points.len());
            }
            (_, ChartSeries::Categorical { labels, values }) => {
                assert_eq!(labels.len(), ds.row_count());
                assert_eq!(values[1], 20.0);
                println!("✓ {} derives {} labelled values", kind.as_str(), labels.len());
            }
            _ => panic!("unexpected series shape for {}", kind.as_str()),
        }
    }
}

// Test registry selection behavior against a throwaway store
fn test_registry_selection() -> Result<(), String> {
    println!("\n====== Testing registry selection ======");
    let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
    let store = DatasetStore::open(dir.path()).map_err(|e| e.to_string())?;
    let mut registry = DataRegistry::open(store)?;

    let first = registry.add_dataset(sample_dataset())?.id;
    let second = registry.add_dataset(sample_dataset())?.id;
    println!("✓ Added two datasets");

    registry.set_current(&second)?;
    assert_eq!(registry.current_dataset().unwrap().id, second);
    println!("✓ Selection follows set_current");

    registry.remove_dataset(&second)?;
    assert_eq!(registry.selected_id(), None);
    assert_eq!(registry.current_dataset().unwrap().id, first);
    println!("✓ Removing the selected dataset clears the selection");

    Ok(())
}

fn test_preview() {
    println!("\n====== Testing preview ======");
    let ds = sample_dataset();
    assert_eq!(ds.preview(SAMPLE_ROWS).len(), 3);
    println!("✓ Preview clamps to the row count");
}

fn main() {
    test_numeric_inference();
    test_series_derivation();
    test_preview();

    if let Err(e) = test_registry_selection() {
        eprintln!("Registry check failed: {}", e);
        std::process::exit(1);
    }

    println!("\nAll checks passed!");
}
