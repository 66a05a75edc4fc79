//! Named reports and the reporter seam
//!
//! The pipeline computes an [`Aggregation`] per report and hands it, with the
//! report definition, to every [`Reporter`]. Reporters never see records.

use crate::aggregate::{Aggregation, AggregationWarning};
use crate::parser::{self, ChartKind, DataSource, ReportSpec};
use crate::profile::Overview;
use anyhow::Result;
use serde::Serialize;

/// A report definition with its position in the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// 1-based position in the report sequence
    pub index: usize,
    pub name: String,
    pub spec: ReportSpec,
}

impl Report {
    pub fn new(index: usize, spec: ReportSpec) -> Self {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("report_{}", index));
        Self { index, name, spec }
    }

    /// Parse a DSL definition into the report at `index`
    pub fn parse(index: usize, input: &str) -> crate::error::Result<Self> {
        Ok(Self::new(index, parser::parse_report(input)?))
    }

    pub fn title(&self) -> &str {
        self.spec.labels.title.as_deref().unwrap_or(&self.name)
    }

    pub fn source(&self) -> DataSource {
        self.spec.source
    }

    pub fn chart(&self) -> &ChartKind {
        &self.spec.chart
    }

    /// Stem used for chart file names, e.g. `03_gasto_por_sexo`
    pub fn file_stem(&self) -> String {
        format!("{:02}_{}", self.index, self.name)
    }
}

/// What a renderer needs: ordered pairs, chart kind and axis labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub name: String,
    pub title: String,
    pub source: DataSource,
    pub chart: ChartKind,
    pub x_label: String,
    pub y_label: String,
    /// (category, rounded value); `None` marks an undefined mean
    pub points: Vec<(String, Option<f64>)>,
    pub warnings: Vec<AggregationWarning>,
}

impl ChartData {
    pub fn new(report: &Report, result: &Aggregation) -> Self {
        let labels = &report.spec.labels;
        let default_y = match &result.metric {
            Some(metric) => format!("{} of {}", result.op, metric),
            None => result.op.to_string(),
        };
        Self {
            name: report.name.clone(),
            title: report.title().to_string(),
            source: report.source(),
            chart: report.spec.chart.clone(),
            x_label: labels.x.clone().unwrap_or_else(|| result.group_by.clone()),
            y_label: labels.y.clone().unwrap_or(default_y),
            points: result.pairs(),
            warnings: result.warnings.clone(),
        }
    }

    /// Points with a defined value
    pub fn defined_points(&self) -> Vec<(&str, f64)> {
        self.points
            .iter()
            .filter_map(|(k, v)| v.map(|v| (k.as_str(), v)))
            .collect()
    }
}

/// Consumer of report results (console, chart files, JSON, ...)
pub trait Reporter {
    /// Called once with the dataset overview before any report
    fn begin(&mut self, _overview: &Overview) -> Result<()> {
        Ok(())
    }

    /// Called once per report, in report order
    fn report(&mut self, report: &Report, result: &Aggregation) -> Result<()>;

    /// Called after the last report
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
