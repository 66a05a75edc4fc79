// Pipeline driver: load, clean, aggregate, render

use crate::aggregate::{aggregate_query_with_sentinel, Aggregation};
use crate::catalog;
use crate::clean::Cleaner;
use crate::data::{self, RecordSet, Schema};
use crate::error::{Stage, StageError};
use crate::parser::DataSource;
use crate::profile::{self, Overview};
use crate::report::{Report, Reporter};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Everything one run needs besides its reporters
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub schema: Schema,
    pub cleaner: Cleaner,
    pub reports: Vec<Report>,
}

impl PipelineOptions {
    /// Credit schema and default cleaner over `input`
    pub fn new(input: impl Into<PathBuf>, reports: Vec<Report>) -> Self {
        Self {
            input: input.into(),
            schema: Schema::credit(),
            cleaner: Cleaner::default(),
            reports,
        }
    }
}

/// What a successful run produced
#[derive(Debug)]
pub struct RunSummary {
    pub overview: Overview,
    /// One result per report, in report order
    pub results: Vec<Aggregation>,
}

impl RunSummary {
    pub fn raw_rows(&self) -> usize {
        self.overview.raw.rows
    }

    pub fn clean_rows(&self) -> usize {
        self.overview.clean.rows
    }

    pub fn warning_count(&self) -> usize {
        self.results.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Run every stage, handing results to each reporter in turn
pub fn run(
    options: &PipelineOptions,
    reporters: &mut [Box<dyn Reporter>],
) -> Result<RunSummary, StageError> {
    catalog::validate(&options.reports, &options.schema)
        .map_err(|e| StageError::new(Stage::Aggregate, e))?;

    info!("Loading {}", options.input.display());
    let raw = data::load(&options.input, &options.schema)
        .map_err(|e| StageError::new(Stage::Load, e))?;
    info!("Loaded {} records", raw.len());

    let (clean, summary) = options.cleaner.clean_with_summary(&raw);
    info!(
        "Cleaning kept {} of {} records",
        summary.rows_out, summary.rows_in
    );
    let overview = profile::overview(&raw, &clean, summary, options.cleaner.sentinel())
        .map_err(|e| StageError::new(Stage::Clean, e))?;

    let results = aggregate_all(&options.reports, options.cleaner.sentinel(), &raw, &clean)?;

    for reporter in reporters.iter_mut() {
        render(reporter.as_mut(), &overview, &options.reports, &results)
            .map_err(|e| StageError::new(Stage::Render, e))?;
    }

    Ok(RunSummary { overview, results })
}

fn aggregate_all(
    reports: &[Report],
    sentinel: &str,
    raw: &RecordSet,
    clean: &RecordSet,
) -> Result<Vec<Aggregation>, StageError> {
    let mut results = Vec::with_capacity(reports.len());
    for report in reports {
        let records = match report.source() {
            DataSource::Raw => raw,
            DataSource::Clean => clean,
        };
        let result = aggregate_query_with_sentinel(records, &report.spec.query, sentinel)
            .map_err(|e| {
                StageError::new(
                    Stage::Aggregate,
                    anyhow::Error::new(e).context(format!("report '{}'", report.name)),
                )
            })?;
        debug!(
            "Report '{}': {} groups over {} records",
            report.name,
            result.entries.len(),
            records.len()
        );
        for warning in &result.warnings {
            warn!("{}: {}", report.name, warning);
        }
        results.push(result);
    }
    Ok(results)
}

fn render(
    reporter: &mut dyn Reporter,
    overview: &Overview,
    reports: &[Report],
    results: &[Aggregation],
) -> anyhow::Result<()> {
    reporter.begin(overview)?;
    for (report, result) in reports.iter().zip(results) {
        reporter.report(report, result)?;
    }
    reporter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregationWarning;
    use crate::clean::SentinelScope;
    use crate::error::EdaError;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    const ROWS: &str = "\
45,M,3,ensino medio,casado,$60K - $80K,blue,5,3,1,12691.51,1144.90,42
49,F,5,mestrado,solteiro,menos que $40K,blue,6,2,1,8256.96,1291.45,33
51,M,3,mestrado,casado,$80K - $120K,blue,4,0,1,3418.56,1887.72,20
40,F,4,ensino medio,na,menos que $40K,blue,3,1,4,3313.03,1171.56,20
40,M,3,sem educacao formal,casado,$60K - $80K,silver,5,0,1,4716.22,816.08,28
";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[derive(Default)]
    struct Recorded {
        began: bool,
        names: Vec<String>,
        finished: bool,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl Reporter for Recorder {
        fn begin(&mut self, _overview: &Overview) -> anyhow::Result<()> {
            self.0.borrow_mut().began = true;
            Ok(())
        }

        fn report(&mut self, report: &Report, _result: &Aggregation) -> anyhow::Result<()> {
            self.0.borrow_mut().names.push(report.name.clone());
            Ok(())
        }

        fn finish(&mut self) -> anyhow::Result<()> {
            self.0.borrow_mut().finished = true;
            Ok(())
        }
    }

    struct Failing;

    impl Reporter for Failing {
        fn report(&mut self, _report: &Report, _result: &Aggregation) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_run_builtin_reports() {
        let file = write_csv(ROWS);
        let options = PipelineOptions::new(file.path(), catalog::reports(&[]).unwrap());
        let state = Rc::new(RefCell::new(Recorded::default()));
        let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(Recorder(state.clone()))];

        let summary = run(&options, &mut reporters).unwrap();
        assert_eq!(summary.raw_rows(), 5);
        assert_eq!(summary.clean_rows(), 4);
        assert_eq!(summary.results.len(), 10);

        let state = state.borrow();
        assert!(state.began && state.finished);
        assert_eq!(state.names.len(), 10);
        assert_eq!(state.names[0], "idade_por_sexo");
    }

    #[test]
    fn test_raw_reports_keep_sentinel_rows() {
        let file = write_csv(ROWS);
        let reports = vec![
            Report::parse(1, "source(raw) | group(by: sexo)").unwrap(),
            Report::parse(2, "source(clean) | group(by: sexo)").unwrap(),
        ];
        let summary = run(&PipelineOptions::new(file.path(), reports), &mut []).unwrap();
        assert_eq!(summary.results[0].get("F").unwrap().count, 2);
        assert_eq!(summary.results[1].get("F").unwrap().count, 1);
    }

    #[test]
    fn test_missing_file_is_load_failure() {
        let options = PipelineOptions::new("/nonexistent/credito.csv", Vec::new());
        let err = run(&options, &mut []).unwrap_err();
        assert_eq!(err.stage, Stage::Load);
        assert!(err.to_string().starts_with("load stage failed"));
    }

    #[test]
    fn test_wrong_width_is_load_failure() {
        let file = write_csv("45,M,3\n");
        let options = PipelineOptions::new(file.path(), Vec::new());
        let err = run(&options, &mut []).unwrap_err();
        assert_eq!(err.stage, Stage::Load);
        assert!(err.to_string().contains("expected 13"));
    }

    #[test]
    fn test_unknown_column_is_aggregate_failure() {
        let file = write_csv(ROWS);
        let reports = vec![Report::parse(1, "group(by: renda)").unwrap()];
        let err = run(&PipelineOptions::new(file.path(), reports), &mut []).unwrap_err();
        assert_eq!(err.stage, Stage::Aggregate);
        assert!(matches!(
            err.cause.downcast_ref::<EdaError>(),
            Some(EdaError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_report_columns_checked_before_load() {
        let reports = vec![Report::parse(1, "group(by: renda)").unwrap()];
        let options = PipelineOptions::new("/nonexistent/credito.csv", reports);
        let err = run(&options, &mut []).unwrap_err();
        assert_eq!(err.stage, Stage::Aggregate);
    }

    #[test]
    fn test_cleaner_sentinel_marks_missing_metric() {
        let file = write_csv(&ROWS.replace("12691.51", "?"));
        let reports = vec![Report::parse(
            1,
            "source(raw) | group(by: tipo_cartao, metric: limite_credito)",
        )
        .unwrap()];
        let options = PipelineOptions {
            cleaner: Cleaner::new("?", SentinelScope::AllFields),
            ..PipelineOptions::new(file.path(), reports)
        };
        let summary = run(&options, &mut []).unwrap();
        let blue = summary.results[0].get("blue").unwrap();
        assert_eq!(blue.count, 4);
        assert_eq!(blue.missing, 1);
    }

    #[test]
    fn test_bad_metric_value_names_report() {
        let file = write_csv(&ROWS.replace("12691.51", "abc"));
        let reports = vec![Report::parse(
            1,
            "limites: group(by: tipo_cartao, metric: limite_credito)",
        )
        .unwrap()];
        let err = run(&PipelineOptions::new(file.path(), reports), &mut []).unwrap_err();
        assert_eq!(err.stage, Stage::Aggregate);
        assert!(err.to_string().contains("report 'limites'"));
    }

    #[test]
    fn test_empty_input_warns() {
        let file = write_csv("");
        let reports = vec![Report::parse(1, "group(by: sexo, metric: idade)").unwrap()];
        let summary = run(&PipelineOptions::new(file.path(), reports), &mut []).unwrap();
        assert!(summary.results[0].is_empty());
        assert!(matches!(
            summary.results[0].warnings[0],
            AggregationWarning::EmptyInput { .. }
        ));
        assert_eq!(summary.warning_count(), 1);
    }

    #[test]
    fn test_reporter_failure_is_render_failure() {
        let file = write_csv(ROWS);
        let reports = vec![Report::parse(1, "group(by: sexo)").unwrap()];
        let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(Failing)];
        let err = run(&PipelineOptions::new(file.path(), reports), &mut reporters).unwrap_err();
        assert_eq!(err.stage, Stage::Render);
        assert!(err.to_string().contains("disk full"));
    }
}
