use crate::aggregate::{AggregateOp, Aggregation};
use crate::parser::DataSource;
use crate::profile::{DatasetProfile, Overview};
use crate::report::{Report, Reporter};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::warn;

/// Prints the overview and every report as plain-text tables
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_profile(&mut self, profile: &DatasetProfile) -> Result<()> {
        let width = profile
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0);
        writeln!(self.out, "{} rows, {} columns", profile.rows, profile.columns.len())?;
        writeln!(
            self.out,
            "  {:<width$}  {:<11}  {:>8}  {:>8}",
            "column", "kind", "present", "missing"
        )?;
        for col in &profile.columns {
            writeln!(
                self.out,
                "  {:<width$}  {:<11}  {:>8}  {:>8}",
                col.name,
                col.kind.as_str(),
                col.present,
                col.missing
            )?;
        }
        Ok(())
    }
}

/// Format a summary value: counts as integers, means with 2 decimals
pub fn format_value(op: AggregateOp, value: Option<f64>) -> String {
    match (op, value) {
        (_, None) => "undefined".to_string(),
        (AggregateOp::Count, Some(v)) => format!("{}", v as u64),
        (AggregateOp::Mean, Some(v)) => format!("{:.2}", v),
    }
}

fn render_line(template: &str, key: &str, value: &str) -> String {
    template.replace("{key}", key).replace("{value}", value)
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn begin(&mut self, overview: &Overview) -> Result<()> {
        writeln!(self.out, "== Dataset ==")?;
        writeln!(self.out, "First {} rows:", overview.head.len())?;
        writeln!(self.out, "  {}", overview.columns.join(" | "))?;
        for row in &overview.head {
            writeln!(self.out, "  {}", row.join(" | "))?;
        }
        writeln!(self.out)?;

        writeln!(self.out, "Raw data:")?;
        self.write_profile(&overview.raw)?;
        writeln!(self.out)?;

        writeln!(self.out, "Distinct values:")?;
        for d in &overview.distinct {
            writeln!(self.out, "  {}: [{}]", d.column, d.values.join(", "))?;
        }
        writeln!(self.out)?;

        let summary = &overview.clean_summary;
        writeln!(
            self.out,
            "Cleaned data ({} of {} rows dropped):",
            summary.rows_dropped(),
            summary.rows_in
        )?;
        self.write_profile(&overview.clean)?;
        for col in &summary.numeric_hits {
            writeln!(
                self.out,
                "WARNING: numeric column '{}' contained the missing-value sentinel",
                col
            )?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn report(&mut self, report: &Report, result: &Aggregation) -> Result<()> {
        let source = match report.source() {
            DataSource::Raw => "raw",
            DataSource::Clean => "clean",
        };
        writeln!(self.out, "== {} ({}) ==", report.title(), source)?;

        let key_width = result
            .entries
            .iter()
            .map(|e| e.key.chars().count())
            .max()
            .unwrap_or(0)
            .max(result.group_by.chars().count());

        match &report.spec.labels.line {
            Some(template) => {
                for entry in &result.entries {
                    let value = format_value(result.op, entry.rounded());
                    writeln!(self.out, "{}", render_line(template, &entry.key, &value))?;
                }
            }
            None => {
                writeln!(self.out, "{:<key_width$}", result.group_by)?;
                for entry in &result.entries {
                    writeln!(
                        self.out,
                        "{:<key_width$}  {:>12}",
                        entry.key,
                        format_value(result.op, entry.rounded())
                    )?;
                }
            }
        }

        for warning in &result.warnings {
            warn!("{}: {}", report.name, warning);
            writeln!(self.out, "WARNING: {}", warning)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush report output")
    }
}
