use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::dataset::Dataset;

/// Title used until the user types their own.
pub const DEFAULT_TITLE: &str = "Data Visualization";

/// Available chart kinds supported by the application
///
/// This enum defines the different visualization formats that can be built
/// from a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Bar chart - Compares values across categories with rectangular bars
    Bar,

    /// Line chart - Shows trends with lines connecting data points
    Line,

    /// Pie chart - Shows each category's share of the total
    Pie,

    /// Doughnut chart - A pie chart with a hollow centre
    Doughnut,

    /// Scatter plot - Shows the relationship between two numeric columns
    Scatter,

    /// Area chart - A line chart with the area below the line filled in
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Doughnut,
        ChartKind::Scatter,
        ChartKind::Area,
    ];

    pub fn parse(name: &str) -> Option<ChartKind> {
        match name.to_lowercase().as_str() {
            "bar" => Some(ChartKind::Bar),
            "line" => Some(ChartKind::Line),
            "pie" => Some(ChartKind::Pie),
            "doughnut" => Some(ChartKind::Doughnut),
            "scatter" => Some(ChartKind::Scatter),
            "area" => Some(ChartKind::Area),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
        }
    }
}

/// User-chosen chart parameters: kind, the two axis columns, and the title.
///
/// Derived entirely from the current dataset and the user's selections, and
/// recomputed from scratch whenever any of them changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart kind to draw
    pub kind: ChartKind,

    /// Category-axis column (x)
    pub category: String,

    /// Value-axis column (y); expected to be numeric
    pub value: String,

    /// Display title
    pub title: String,
}

impl ChartConfig {
    pub fn new(kind: ChartKind, category: &str, value: &str, title: &str) -> Self {
        ChartConfig {
            kind,
            category: category.to_string(),
            value: value.to_string(),
            title: title.to_string(),
        }
    }

    /// Default configuration when a dataset becomes current: first column on
    /// the category axis, second column on the value axis, bar kind. A
    /// dataset with fewer than two columns has no usable default.
    pub fn defaults_for(dataset: &Dataset) -> Option<ChartConfig> {
        if dataset.columns.len() < 2 {
            return None;
        }
        Some(ChartConfig::new(
            ChartKind::Bar,
            &dataset.columns[0],
            &dataset.columns[1],
            DEFAULT_TITLE,
        ))
    }
}

/// Renderable data derived from a dataset and a [`ChartConfig`].
///
/// Cartesian and circular kinds share the label/value form; scatter uses
/// numeric point pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSeries {
    Categorical {
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Points(Vec<(f64, f64)>),
}

/// Build the series for a chart from the dataset and the axis selections.
///
/// A single pass over the row array. Category cells are stringified (a
/// missing cell becomes an empty label); value cells are coerced to numbers
/// with anything non-numeric counting as 0. For scatter both columns are
/// coerced. The previous series is always discarded and this one rebuilt
/// from scratch; nothing is updated incrementally.
///
/// # Arguments
/// * `dataset` - The dataset to chart
/// * `config` - Chart kind, axis columns, and title
///
/// # Returns
/// * `Result<ChartSeries, Box<dyn Error>>` - The derived series, or a
///   user-facing message when a selection is empty or unknown
pub fn derive_series(dataset: &Dataset, config: &ChartConfig) -> Result<ChartSeries, Box<dyn Error>> {
    if config.category.is_empty() || config.value.is_empty() {
        return Err("Select both axes before rendering a chart".into());
    }
    if !dataset.has_column(&config.category) {
        return Err(format!("Unknown column: {}", config.category).into());
    }
    if !dataset.has_column(&config.value) {
        return Err(format!("Unknown column: {}", config.value).into());
    }

    match config.kind {
        ChartKind::Scatter => {
            let points = dataset
                .rows
                .iter()
                .map(|row| {
                    let x = row.get(&config.category).map(|v| v.coerce_number()).unwrap_or(0.0);
                    let y = row.get(&config.value).map(|v| v.coerce_number()).unwrap_or(0.0);
                    (x, y)
                })
                .collect();
            Ok(ChartSeries::Points(points))
        }
        _ => {
            let labels = dataset
                .rows
                .iter()
                .map(|row| dataset.cell_text(row, &config.category))
                .collect();
            let values = dataset
                .rows
                .iter()
                .map(|row| row.get(&config.value).map(|v| v.coerce_number()).unwrap_or(0.0))
                .collect();
            Ok(ChartSeries::Categorical { labels, values })
        }
    }
}

#[cfg(feature = "web")]
pub use render::{RenderOptions, create_example_charts, render_chart};

#[cfg(feature = "web")]
mod render {
    use super::{ChartConfig, ChartKind, ChartSeries, derive_series};
    use crate::dataset::Dataset;
    use plotters::prelude::*;
    use plotters::style::RGBAColor;
    use std::error::Error;
    use std::path::Path;

    /// Pixel dimensions for a rendered chart.
    #[derive(Clone, Debug)]
    pub struct RenderOptions {
        /// Width of the chart in pixels
        pub width: u32,

        /// Height of the chart in pixels
        pub height: u32,
    }

    impl Default for RenderOptions {
        fn default() -> Self {
            Self {
                width: 800,
                height: 600,
            }
        }
    }

    // Series palette, cycled per slice for pie and doughnut charts.
    const PALETTE: [RGBColor; 5] = [
        RGBColor(59, 130, 246),  // blue
        RGBColor(16, 185, 129),  // green
        RGBColor(245, 158, 11),  // amber
        RGBColor(239, 68, 68),   // red
        RGBColor(139, 92, 246),  // purple
    ];

    fn series_color() -> RGBColor {
        PALETTE[0]
    }

    fn fill_color() -> RGBAColor {
        PALETTE[0].mix(0.7)
    }

    /// Render a chart for a dataset as PNG bytes
    ///
    /// This is the main entry point for chart generation. It derives the
    /// series from the dataset and the configuration, then draws the chart
    /// kind the configuration names through a temporary bitmap file.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to chart
    /// * `config` - Chart kind, axis columns, and title
    /// * `options` - Pixel dimensions
    ///
    /// # Returns
    /// * A Result containing the PNG image data as bytes or an error
    ///
    /// # Examples
    /// ```no_run
    /// use vizboard::chart::{ChartConfig, ChartKind, RenderOptions, render_chart};
    /// use vizboard::dataset::Dataset;
    ///
    /// # let dataset = Dataset::new("empty", vec!["a".into(), "b".into()], vec![], "demo");
    /// let config = ChartConfig::new(ChartKind::Bar, "a", "b", "Sample");
    ///
    /// match render_chart(&dataset, &config, RenderOptions::default()) {
    ///     Ok(png) => println!("Chart rendered: {} bytes", png.len()),
    ///     Err(e) => eprintln!("Failed to render chart: {}", e),
    /// }
    /// ```
    pub fn render_chart(
        dataset: &Dataset,
        config: &ChartConfig,
        options: RenderOptions,
    ) -> Result<Vec<u8>, Box<dyn Error>> {
        let series = derive_series(dataset, config)?;

        // Draw into a per-render temporary file, then read the bytes back.
        let file = tempfile::Builder::new().suffix(".png").tempfile()?;
        let path = file.path().to_path_buf();

        match (&series, config.kind) {
            (ChartSeries::Points(points), _) => {
                draw_scatter(points, config, &options, &path)?;
            }
            (ChartSeries::Categorical { labels, values }, ChartKind::Bar) => {
                draw_bar(labels, values, config, &options, &path)?;
            }
            (ChartSeries::Categorical { labels, values }, ChartKind::Line) => {
                draw_line(labels, values, config, &options, &path, false)?;
            }
            (ChartSeries::Categorical { labels, values }, ChartKind::Area) => {
                draw_line(labels, values, config, &options, &path, true)?;
            }
            (ChartSeries::Categorical { labels, values }, ChartKind::Pie) => {
                draw_pie(labels, values, config, &options, &path, false)?;
            }
            (ChartSeries::Categorical { labels, values }, ChartKind::Doughnut) => {
                draw_pie(labels, values, config, &options, &path, true)?;
            }
            (ChartSeries::Categorical { .. }, ChartKind::Scatter) => {
                unreachable!("scatter always derives point pairs")
            }
        }

        let png_data = std::fs::read(&path)?;
        Ok(png_data)
    }

    fn label_at(labels: &[String], x: f64) -> String {
        let i = x.round();
        if i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }

    // Vertical extent for categorical charts. The y axis starts at zero
    // unless the data dips below it.
    fn value_range(values: &[f64]) -> (f64, f64) {
        let min = values.iter().cloned().fold(0.0_f64, f64::min);
        let mut max = values.iter().cloned().fold(f64::MIN, f64::max);
        if values.is_empty() || max <= min {
            max = min + 1.0;
        }
        (min, max)
    }

    fn draw_bar(
        labels: &[String],
        values: &[f64],
        config: &ChartConfig,
        options: &RenderOptions,
        path: &Path,
    ) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = values.len().max(1);
        let (min_y, max_y) = value_range(values);

        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(-0.5..n as f64 - 0.5, min_y..max_y + (max_y - min_y) * 0.05)?;

        chart
            .configure_mesh()
            .x_labels(n.min(12))
            .x_label_formatter(&|x| label_at(labels, *x))
            .x_desc(&config.category)
            .y_desc(&config.value)
            .draw()?;

        chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
            Rectangle::new(
                [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, v)],
                fill_color().filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    }

    fn draw_line(
        labels: &[String],
        values: &[f64],
        config: &ChartConfig,
        options: &RenderOptions,
        path: &Path,
        filled: bool,
    ) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = values.len().max(2);
        let (min_y, max_y) = value_range(values);

        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0.0..n as f64 - 1.0, min_y..max_y + (max_y - min_y) * 0.05)?;

        chart
            .configure_mesh()
            .x_labels(n.min(12))
            .x_label_formatter(&|x| label_at(labels, *x))
            .x_desc(&config.category)
            .y_desc(&config.value)
            .draw()?;

        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect::<Vec<_>>();

        if filled {
            chart.draw_series(
                AreaSeries::new(points, 0.0, series_color().mix(0.35))
                    .border_style(series_color()),
            )?;
        } else {
            chart.draw_series(LineSeries::new(points, &series_color()))?;
        }

        root.present()?;
        Ok(())
    }

    fn draw_scatter(
        points: &[(f64, f64)],
        config: &ChartConfig,
        options: &RenderOptions,
        path: &Path,
    ) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let min_x = points.iter().map(|(x, _)| *x).fold(f64::MAX, f64::min);
        let max_x = points.iter().map(|(x, _)| *x).fold(f64::MIN, f64::max);
        let min_y = points.iter().map(|(_, y)| *y).fold(f64::MAX, f64::min);
        let max_y = points.iter().map(|(_, y)| *y).fold(f64::MIN, f64::max);

        let (min_x, max_x) = if points.is_empty() || max_x <= min_x {
            (0.0, 100.0)
        } else {
            (min_x, max_x)
        };
        let (min_y, max_y) = if points.is_empty() || max_y <= min_y {
            (0.0, 100.0)
        } else {
            (min_y, max_y)
        };

        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(min_x..max_x + 1.0, min_y..max_y + 1.0)?;

        chart
            .configure_mesh()
            .x_desc(&config.category)
            .y_desc(&config.value)
            .draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 5, series_color().filled())),
        )?;

        root.present()?;
        Ok(())
    }

    fn draw_pie(
        labels: &[String],
        values: &[f64],
        config: &ChartConfig,
        options: &RenderOptions,
        path: &Path,
        doughnut: bool,
    ) -> Result<(), Box<dyn Error>> {
        // Slices must be positive; anything else is dropped up front.
        let mut sizes = Vec::new();
        let mut slice_labels = Vec::new();
        let mut colors = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if v > 0.0 {
                sizes.push(v);
                slice_labels.push(labels.get(i).cloned().unwrap_or_default());
                colors.push(PALETTE[(sizes.len() - 1) % PALETTE.len()]);
            }
        }
        if sizes.is_empty() {
            return Err("no positive values to chart".into());
        }

        let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(&config.title, ("sans-serif", 30))?;

        let (w, h) = root.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = w.min(h) as f64 * 0.35;

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &slice_labels);
        pie.label_style(("sans-serif", 18).into_font());
        if doughnut {
            pie.donut_hole(radius * 0.5);
        }

        root.draw(&pie)?;
        root.present()?;
        Ok(())
    }

    /// Creates example charts for demonstration purposes
    ///
    /// Renders one chart of every kind from a small sample dataset and saves
    /// them to disk in the "chart_output" directory.
    ///
    /// # Returns
    /// * A vector of tuples containing chart kind name and file path
    pub fn create_example_charts() -> Vec<(String, String)> {
        use crate::dataset::{CellValue, Row};

        let mut result = Vec::new();

        let output_dir = "chart_output";
        std::fs::create_dir_all(output_dir).unwrap_or_else(|_| {
            eprintln!("Output directory already exists or couldn't be created");
        });

        let rows: Vec<Row> = [
            ("Mon", 10.0),
            ("Tue", 25.0),
            ("Wed", 15.0),
            ("Thu", 30.0),
            ("Fri", 22.0),
            ("Sat", 40.0),
            ("Sun", 35.0),
        ]
        .iter()
        .map(|(day, total)| {
            let mut row = Row::new();
            row.insert("day".to_string(), CellValue::Text(day.to_string()));
            row.insert("total".to_string(), CellValue::Number(*total));
            row
        })
        .collect();

        let dataset = Dataset::new(
            "weekly totals",
            vec!["day".to_string(), "total".to_string()],
            rows,
            "demo",
        );

        for kind in ChartKind::ALL {
            let config = ChartConfig::new(
                kind,
                "day",
                "total",
                &format!("Example {} Chart", kind.as_str()),
            );
            let path = format!("{}/{}_chart.png", output_dir, kind.as_str());
            match render_chart(&dataset, &config, RenderOptions {
                width: 600,
                height: 400,
            }) {
                Ok(png) => {
                    if std::fs::write(&path, png).is_ok() {
                        result.push((kind.as_str().to_string(), path));
                    }
                }
                Err(e) => eprintln!("Failed to render {} example: {}", kind.as_str(), e),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, Row};

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample_dataset() -> Dataset {
        let rows = vec![
            row(&[
                ("region", CellValue::Text("east".to_string())),
                ("amount", CellValue::Number(10.0)),
            ]),
            row(&[
                ("region", CellValue::Text("west".to_string())),
                ("amount", CellValue::Text("20".to_string())),
            ]),
            row(&[
                ("region", CellValue::Number(3.0)),
                ("amount", CellValue::Text("n/a".to_string())),
            ]),
        ];
        Dataset::new(
            "sales",
            vec!["region".to_string(), "amount".to_string()],
            rows,
            "tester",
        )
    }

    fn config(kind: ChartKind) -> ChartConfig {
        ChartConfig::new(kind, "region", "amount", DEFAULT_TITLE)
    }

    #[test]
    fn bar_series_stringifies_labels_and_coerces_values() {
        let ds = sample_dataset();
        let series = derive_series(&ds, &config(ChartKind::Bar)).unwrap();
        match series {
            ChartSeries::Categorical { labels, values } => {
                assert_eq!(labels, vec!["east", "west", "3"]);
                // numeric text parses, non-numeric text coerces to 0
                assert_eq!(values, vec![10.0, 20.0, 0.0]);
            }
            _ => panic!("expected categorical series"),
        }
    }

    #[test]
    fn scatter_series_coerces_both_axes() {
        let ds = sample_dataset();
        let series = derive_series(&ds, &config(ChartKind::Scatter)).unwrap();
        match series {
            ChartSeries::Points(points) => {
                assert_eq!(points, vec![(0.0, 10.0), (0.0, 20.0), (3.0, 0.0)]);
            }
            _ => panic!("expected point series"),
        }
    }

    #[test]
    fn missing_cells_become_empty_labels_and_zero_values() {
        let rows = vec![row(&[("region", CellValue::Text("east".to_string()))])];
        let ds = Dataset::new(
            "sparse",
            vec!["region".to_string(), "amount".to_string()],
            rows,
            "tester",
        );
        let series = derive_series(&ds, &config(ChartKind::Line)).unwrap();
        match series {
            ChartSeries::Categorical { labels, values } => {
                assert_eq!(labels, vec!["east"]);
                assert_eq!(values, vec![0.0]);
            }
            _ => panic!("expected categorical series"),
        }
    }

    #[test]
    fn switching_kind_rebuilds_without_touching_the_dataset() {
        let ds = sample_dataset();
        let before = ds.clone();

        for kind in ChartKind::ALL {
            derive_series(&ds, &config(kind)).unwrap();
        }

        assert_eq!(ds, before);
    }

    #[test]
    fn line_pie_doughnut_and_area_share_the_categorical_form() {
        let ds = sample_dataset();
        let expected = derive_series(&ds, &config(ChartKind::Bar)).unwrap();
        for kind in [ChartKind::Line, ChartKind::Pie, ChartKind::Doughnut, ChartKind::Area] {
            assert_eq!(derive_series(&ds, &config(kind)).unwrap(), expected);
        }
    }

    #[test]
    fn unknown_columns_are_an_error_message() {
        let ds = sample_dataset();
        let cfg = ChartConfig::new(ChartKind::Bar, "region", "profit", DEFAULT_TITLE);
        let err = derive_series(&ds, &cfg).unwrap_err();
        assert_eq!(err.to_string(), "Unknown column: profit");
    }

    #[test]
    fn empty_axis_selection_is_an_error_message() {
        let ds = sample_dataset();
        let cfg = ChartConfig::new(ChartKind::Bar, "", "amount", DEFAULT_TITLE);
        assert!(derive_series(&ds, &cfg).is_err());
    }

    #[test]
    fn defaults_pick_the_first_two_columns() {
        let ds = sample_dataset();
        let cfg = ChartConfig::defaults_for(&ds).unwrap();
        assert_eq!(cfg.kind, ChartKind::Bar);
        assert_eq!(cfg.category, "region");
        assert_eq!(cfg.value, "amount");
        assert_eq!(cfg.title, DEFAULT_TITLE);
    }

    #[test]
    fn defaults_need_at_least_two_columns() {
        let ds = Dataset::new("one", vec!["only".to_string()], Vec::new(), "tester");
        assert!(ChartConfig::defaults_for(&ds).is_none());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChartKind::parse("Doughnut"), Some(ChartKind::Doughnut));
        assert_eq!(ChartKind::parse("histogram"), None);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChartKind::Doughnut).unwrap(),
            "\"doughnut\""
        );
        let kind: ChartKind = serde_json::from_str("\"area\"").unwrap();
        assert_eq!(kind, ChartKind::Area);
    }
}
