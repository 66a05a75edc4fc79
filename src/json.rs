use crate::aggregate::Aggregation;
use crate::profile::Overview;
use crate::report::{ChartData, Report, Reporter};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    index: usize,
    #[serde(flatten)]
    chart: ChartData,
    result: &'a Aggregation,
}

/// Collects the overview and every report, then writes one JSON document
pub struct JsonReporter<W: Write> {
    out: W,
    overview: Option<serde_json::Value>,
    reports: Vec<serde_json::Value>,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            overview: None,
            reports: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn begin(&mut self, overview: &Overview) -> Result<()> {
        self.overview = Some(serde_json::to_value(overview).context("Failed to serialize overview")?);
        Ok(())
    }

    fn report(&mut self, report: &Report, result: &Aggregation) -> Result<()> {
        let entry = JsonReport {
            index: report.index,
            chart: ChartData::new(report, result),
            result,
        };
        self.reports
            .push(serde_json::to_value(&entry).context("Failed to serialize report")?);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let document = serde_json::json!({
            "overview": self.overview.take(),
            "reports": std::mem::take(&mut self.reports),
        });
        serde_json::to_writer_pretty(&mut self.out, &document)
            .context("Failed to write JSON report")?;
        writeln!(self.out)?;
        self.out.flush().context("Failed to flush JSON report")
    }
}
