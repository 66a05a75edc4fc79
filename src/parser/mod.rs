// Report DSL Parser Module

pub mod ast;
pub mod geom;
pub mod labels;
pub mod lexer;
pub mod pipeline;
pub mod query;

use crate::aggregate::AggregateOp;
use crate::error::{EdaError, Result};

// Public API re-exports
pub use ast::{BarLayer, ChartKind, DataSource, Labels, PieLayer, ReportSpec};

/// Parse and validate a single report definition
pub fn parse_report(input: &str) -> Result<ReportSpec> {
    let (_, (name, components)) = pipeline::parse_pipeline(input).map_err(|e| {
        let remaining = match &e {
            nom::Err::Error(err) | nom::Err::Failure(err) => err.input.to_string(),
            nom::Err::Incomplete(_) => String::new(),
        };
        EdaError::Parse {
            message: "invalid report definition".to_string(),
            remaining,
        }
    })?;

    let spec = pipeline::assemble(name, components).map_err(|message| EdaError::Parse {
        message,
        remaining: input.trim().to_string(),
    })?;

    match (spec.query.op, &spec.query.metric) {
        (AggregateOp::Count, Some(metric)) => Err(EdaError::Parse {
            message: format!("op: count takes no metric (got '{}')", metric),
            remaining: input.trim().to_string(),
        }),
        (AggregateOp::Mean, None) => Err(EdaError::Parse {
            message: "op: mean needs a metric column".to_string(),
            remaining: input.trim().to_string(),
        }),
        _ => Ok(spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_ok() {
        let spec = parse_report("group(by: sexo, metric: idade) | table()").unwrap();
        assert_eq!(spec.query.metric, Some("idade".to_string()));
    }

    #[test]
    fn test_parse_report_count_with_metric() {
        let err = parse_report("group(by: sexo, metric: idade, op: count)").unwrap_err();
        assert!(err.to_string().contains("takes no metric"));
    }

    #[test]
    fn test_parse_report_mean_without_metric() {
        let err = parse_report("group(by: sexo, op: mean)").unwrap_err();
        assert!(err.to_string().contains("needs a metric"));
    }

    #[test]
    fn test_parse_report_syntax_error_reports_remaining() {
        let err = parse_report("group(by: sexo) | line()").unwrap_err();
        match err {
            EdaError::Parse { remaining, .. } => assert!(remaining.contains("line()")),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }
}
