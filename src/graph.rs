use crate::aggregate::Aggregation;
use crate::error::EdaError;
use crate::palette::series_colors;
use crate::parser::ChartKind;
use crate::report::{ChartData, Report, Reporter};
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Largest accepted chart side in pixels
pub const MAX_DIMENSION: u32 = 16_384;

/// Y-axis range for bars: always includes zero, padded 5% above the extremes
pub fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(0.0, f64::min);
    let max = values.iter().cloned().fold(0.0, f64::max);
    if min == max {
        return (0.0, 1.0);
    }
    let padding = (max - min) * 0.05;
    (
        if min < 0.0 { min - padding } else { 0.0 },
        if max > 0.0 { max + padding } else { 0.0 },
    )
}

/// Render one report's chart to PNG or SVG bytes
pub fn render_chart(data: &ChartData, options: &RenderOptions) -> Result<Vec<u8>> {
    if options.width == 0 || options.height == 0 {
        return Err(EdaError::Render(format!(
            "chart size {}x{} must be non-zero",
            options.width, options.height
        ))
        .into());
    }
    if options.width > MAX_DIMENSION || options.height > MAX_DIMENSION {
        return Err(EdaError::Render(format!(
            "chart size {}x{} exceeds {} pixels per side",
            options.width, options.height, MAX_DIMENSION
        ))
        .into());
    }

    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; rgb_buffer_len(options.width, options.height)?];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
                    .into_drawing_area();
                draw(&root, data)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, options.width, options.height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
                    .into_drawing_area();
                draw(&root, data)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

/// Bytes needed for an RGB bitmap of the given size
pub fn rgb_buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or_else(|| {
            EdaError::Render(format!("chart size {}x{} is too large", width, height)).into()
        })
}

/// Encode an RGB buffer as PNG
pub fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn draw<DB>(root: &DrawingArea<DB, Shift>, data: &ChartData) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;
    match &data.chart {
        ChartKind::Pie(pie) => draw_pie(root, data, &pie.colors),
        ChartKind::Bar(bar) => draw_bar(root, data, &bar.colors, bar.palette.as_deref()),
        ChartKind::Table => Ok(()),
    }
}

fn draw_pie<DB>(root: &DrawingArea<DB, Shift>, data: &ChartData, colors: &[String]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root
        .titled(&data.title, ("sans-serif", 20))
        .context("Failed to draw title")?;

    let points = data.defined_points();
    let sizes: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    if sizes.iter().any(|v| *v < 0.0) || sizes.iter().sum::<f64>() <= 0.0 {
        return Err(EdaError::Render(format!(
            "pie '{}' needs non-negative values with a positive total",
            data.name
        ))
        .into());
    }
    let labels: Vec<&str> = points.iter().map(|(k, _)| *k).collect();
    let palette = series_colors(colors, Some("viridis"), sizes.len());

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.38;

    let mut pie = Pie::new(&center, &radius, &sizes, &palette, &labels);
    pie.label_style(("sans-serif", 16).into_font());
    pie.percentages(("sans-serif", 14).into_font().color(&BLACK));
    area.draw(&pie).context("Failed to draw pie")?;

    Ok(())
}

fn draw_bar<DB>(
    root: &DrawingArea<DB, Shift>,
    data: &ChartData,
    colors: &[String],
    palette: Option<&str>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let categories: Vec<String> = data.points.iter().map(|(k, _)| k.clone()).collect();
    let values: Vec<f64> = data.points.iter().filter_map(|(_, v)| *v).collect();
    let (y_min, y_max) = value_range(&values);
    let num_categories = categories.len() as i32;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&data.title, ("sans-serif", 20))
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..num_categories).into_segmented(), y_min..y_max)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len() + 1)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(idx) => categories
                .get(*idx as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .draw()
        .context("Failed to draw mesh")?;

    let palette = series_colors(colors, palette, categories.len());

    for (cat_idx, ((_, value), color)) in data.points.iter().zip(&palette).enumerate() {
        // Undefined means keep their category slot but get no bar
        let Some(y_val) = value else { continue };
        let idx = cat_idx as i32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(idx), 0.0),
                (SegmentValue::Exact(idx + 1), *y_val),
            ],
            color.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        chart
            .draw_series(std::iter::once(bar))
            .context("Failed to draw bar")?;
    }

    Ok(())
}

/// Writes one chart file per drawn report into an output directory
pub struct ChartReporter {
    out_dir: PathBuf,
    options: RenderOptions,
    written: Vec<PathBuf>,
}

impl ChartReporter {
    pub fn new(out_dir: impl Into<PathBuf>, options: RenderOptions) -> Self {
        Self {
            out_dir: out_dir.into(),
            options,
            written: Vec::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Files written so far, in report order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn path_for(&self, report: &Report) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", report.file_stem(), self.options.format.extension()))
    }
}

impl Reporter for ChartReporter {
    fn report(&mut self, report: &Report, result: &Aggregation) -> Result<()> {
        if !report.chart().is_drawn() {
            return Ok(());
        }

        let data = ChartData::new(report, result);
        if data.defined_points().is_empty() {
            warn!("Report '{}' has no values to draw; skipping chart", report.name);
            return Ok(());
        }

        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("Failed to create output directory {}", self.out_dir.display())
        })?;

        let bytes = render_chart(&data, &self.options)
            .with_context(|| format!("Failed to render chart for '{}'", report.name))?;
        let path = self.path_for(report);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write chart {}", path.display()))?;

        info!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOp};
    use crate::data::{ColumnKind, ColumnSpec, RecordSet, Schema};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn chart_data(dsl: &str) -> ChartData {
        let schema = Schema::new(vec![
            ColumnSpec::new("sexo", ColumnKind::Categorical),
            ColumnSpec::new("valor", ColumnKind::Decimal),
        ]);
        let records = RecordSet::from_rows(
            schema,
            vec![vec!["M", "1144.90"], vec!["F", "1291.45"], vec!["M", "1887.72"]],
        )
        .unwrap();
        let report = Report::parse(1, dsl).unwrap();
        let query = &report.spec.query;
        let result = aggregate(&records, &query.group_by, query.metric.as_deref(), query.op).unwrap();
        ChartData::new(&report, &result)
    }

    fn small(format: OutputFormat) -> RenderOptions {
        RenderOptions { width: 400, height: 300, format }
    }

    const PIE: &str = r#"group(by: sexo) | pie(colors: ["dodgerblue", "hotpink"]) | labs(title: "Gender")"#;
    const BAR: &str = r#"group(by: sexo, metric: valor) | bar(palette: "viridis") | labs(title: "Spending")"#;

    #[test]
    fn test_value_range() {
        assert_eq!(value_range(&[]), (0.0, 1.0));
        let (lo, hi) = value_range(&[10.0, 20.0]);
        assert_eq!(lo, 0.0);
        assert!(close(hi, 21.0));
        let (lo, hi) = value_range(&[-10.0, 10.0]);
        assert!(close(lo, -11.0));
        assert!(close(hi, 11.0));
    }

    #[test]
    fn test_encode_png_magic() {
        let buffer = vec![255u8; 4 * 3 * 3];
        let png = encode_png(&buffer, 4, 3).unwrap();
        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_render_chart_rejects_zero_size() {
        let schema = Schema::new(vec![ColumnSpec::new("sexo", ColumnKind::Categorical)]);
        let records = RecordSet::from_rows(schema, vec![vec!["M"]]).unwrap();
        let result = aggregate(&records, "sexo", None, AggregateOp::Count).unwrap();
        let report = Report::parse(1, "group(by: sexo) | bar()").unwrap();
        let options = RenderOptions { width: 0, ..RenderOptions::default() };
        let err = render_chart(&ChartData::new(&report, &result), &options).unwrap_err();
        assert!(err.to_string().contains("must be non-zero"));
    }

    #[test]
    fn test_render_chart_rejects_oversized() {
        let data = chart_data(BAR);
        let options = RenderOptions { width: 70_000, height: 70_000, ..RenderOptions::default() };
        let err = render_chart(&data, &options).unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        let options = RenderOptions { width: u32::MAX, height: 10, ..RenderOptions::default() };
        assert!(render_chart(&data, &options).is_err());
    }

    #[test]
    fn test_rgb_buffer_len() {
        assert_eq!(rgb_buffer_len(4, 3).unwrap(), 36);
        assert_eq!(
            rgb_buffer_len(MAX_DIMENSION, MAX_DIMENSION).unwrap(),
            MAX_DIMENSION as usize * MAX_DIMENSION as usize * 3
        );
    }

    #[test]
    fn test_render_pie_png() {
        let png = render_chart(&chart_data(PIE), &small(OutputFormat::Png)).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_render_bar_png() {
        let png = render_chart(&chart_data(BAR), &small(OutputFormat::Png)).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_render_pie_svg() {
        let svg = render_chart(&chart_data(PIE), &small(OutputFormat::Svg)).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("polygon") || text.contains("path"));
    }

    #[test]
    fn test_render_bar_svg() {
        let svg = render_chart(&chart_data(BAR), &small(OutputFormat::Svg)).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("<rect"));
    }

    #[test]
    fn test_render_pie_rejects_negative_values() {
        let schema = Schema::new(vec![
            ColumnSpec::new("sexo", ColumnKind::Categorical),
            ColumnSpec::new("valor", ColumnKind::Decimal),
        ]);
        let records =
            RecordSet::from_rows(schema, vec![vec!["M", "-5"], vec!["F", "10"]]).unwrap();
        let report = Report::parse(1, "group(by: sexo, metric: valor) | pie()").unwrap();
        let result = aggregate(&records, "sexo", Some("valor"), AggregateOp::Mean).unwrap();
        let err = render_chart(&ChartData::new(&report, &result), &small(OutputFormat::Png))
            .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_chart_reporter_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::new(vec![ColumnSpec::new("sexo", ColumnKind::Categorical)]);
        let records = RecordSet::from_rows(schema, vec![vec!["M"], vec!["F"], vec!["M"]]).unwrap();
        let result = aggregate(&records, "sexo", None, AggregateOp::Count).unwrap();
        let report = Report::parse(2, "distribuicao_sexo: group(by: sexo) | pie()").unwrap();

        let mut reporter = ChartReporter::new(dir.path(), small(OutputFormat::Png));
        reporter.report(&report, &result).unwrap();
        let expected = dir.path().join("02_distribuicao_sexo.png");
        assert_eq!(reporter.written(), &[expected.clone()]);
        assert!(is_valid_png(&fs::read(expected).unwrap()));
    }

    #[test]
    fn test_chart_reporter_skips_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("charts");
        let schema = Schema::new(vec![
            ColumnSpec::new("sexo", ColumnKind::Categorical),
            ColumnSpec::new("idade", ColumnKind::Integer),
        ]);
        let records = RecordSet::from_rows(schema, vec![vec!["M", "40"]]).unwrap();
        let result = aggregate(&records, "sexo", Some("idade"), AggregateOp::Mean).unwrap();
        let report = Report::parse(1, "group(by: sexo, metric: idade) | table()").unwrap();

        let mut reporter = ChartReporter::new(&out, RenderOptions::default());
        reporter.report(&report, &result).unwrap();
        assert!(reporter.written().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_chart_reporter_skips_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::new(vec![ColumnSpec::new("sexo", ColumnKind::Categorical)]);
        let records = RecordSet::from_rows(schema, vec![]).unwrap();
        let result = aggregate(&records, "sexo", None, AggregateOp::Count).unwrap();
        let report = Report::parse(2, "group(by: sexo) | pie()").unwrap();

        let mut reporter = ChartReporter::new(dir.path(), RenderOptions::default());
        reporter.report(&report, &result).unwrap();
        assert!(reporter.written().is_empty());
    }

    #[test]
    fn test_path_for_uses_format_extension() {
        let report = Report::parse(4, "faixa_salarial: group(by: salario_anual) | bar()").unwrap();
        let options = RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        };
        let reporter = ChartReporter::new("out", options);
        assert_eq!(reporter.path_for(&report), PathBuf::from("out/04_faixa_salarial.svg"));
    }
}
