// Pipeline parser for the report DSL

use super::ast::{ChartKind, DataSource, Labels, ReportSpec};
use super::geom::parse_geom;
use super::labels::parse_labs;
use super::lexer::{identifier, ws};
use super::query::{parse_group, parse_source};
use crate::aggregate::GroupQuery;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, opt},
    multi::separated_list1,
    sequence::terminated,
    IResult,
};

#[derive(Debug)]
pub enum PipelineComponent {
    Source(DataSource),
    Group(GroupQuery),
    Chart(ChartKind),
    Labels(Labels),
}

fn parse_pipeline_component(input: &str) -> IResult<&str, PipelineComponent> {
    alt((
        map(parse_source, PipelineComponent::Source),
        map(parse_group, PipelineComponent::Group),
        map(parse_geom, PipelineComponent::Chart),
        map(parse_labs, PipelineComponent::Labels),
    ))(input)
}

/// Parse a report definition into its name and components
/// Format: [name:] component | component | ...
pub fn parse_pipeline(input: &str) -> IResult<&str, (Option<String>, Vec<PipelineComponent>)> {
    let (input, name) = opt(terminated(ws(identifier), ws(char(':'))))(input)?;

    let (input, components) = separated_list1(
        ws(tag("|")),
        parse_pipeline_component,
    )(input)?;

    let (input, _) = ws(eof)(input)?;

    Ok((input, (name, components)))
}

/// Fold parsed components into a report, rejecting duplicates
pub fn assemble(
    name: Option<String>,
    components: Vec<PipelineComponent>,
) -> Result<ReportSpec, String> {
    let mut source = None;
    let mut query = None;
    let mut chart = None;
    let mut labels = None;

    for comp in components {
        match comp {
            PipelineComponent::Source(s) => {
                if source.replace(s).is_some() {
                    return Err("source() given more than once".to_string());
                }
            }
            PipelineComponent::Group(q) => {
                if query.replace(q).is_some() {
                    return Err("group() given more than once".to_string());
                }
            }
            PipelineComponent::Chart(c) => {
                if chart.replace(c).is_some() {
                    return Err("only one of pie(), bar() or table() is allowed".to_string());
                }
            }
            PipelineComponent::Labels(l) => {
                if labels.replace(l).is_some() {
                    return Err("labs() given more than once".to_string());
                }
            }
        }
    }

    let query = query.ok_or_else(|| "a report needs a group(by: ...) component".to_string())?;

    Ok(ReportSpec {
        name,
        source: source.unwrap_or_default(),
        query,
        chart: chart.unwrap_or(ChartKind::Table),
        labels: labels.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateOp, KeyOrder};

    fn parse(input: &str) -> Result<ReportSpec, String> {
        let (_, (name, components)) = parse_pipeline(input).map_err(|e| format!("{:?}", e))?;
        assemble(name, components)
    }

    #[test]
    fn test_parse_full_report() {
        let spec = parse(
            r#"limite_por_cartao: source(clean) | group(by: tipo_cartao, metric: limite_credito) | bar(palette: "viridis") | labs(title: "Credit Limit by Card Type", x: "Card Type", y: "Credit Limit")"#,
        )
        .unwrap();
        assert_eq!(spec.name, Some("limite_por_cartao".to_string()));
        assert_eq!(spec.source, DataSource::Clean);
        assert_eq!(spec.query.group_by, "tipo_cartao");
        assert_eq!(spec.query.op, AggregateOp::Mean);
        assert!(matches!(spec.chart, ChartKind::Bar(_)));
        assert_eq!(spec.labels.y, Some("Credit Limit".to_string()));
    }

    #[test]
    fn test_parse_minimal_report_defaults() {
        let spec = parse("group(by: sexo)").unwrap();
        assert_eq!(spec.name, None);
        assert_eq!(spec.source, DataSource::Clean);
        assert_eq!(spec.chart, ChartKind::Table);
        assert_eq!(spec.query.order, KeyOrder::FirstSeen);
    }

    #[test]
    fn test_parse_components_any_order() {
        let spec = parse(r#"pie() | labs(title: "T") | group(by: sexo) | source(raw)"#).unwrap();
        assert_eq!(spec.source, DataSource::Raw);
        assert!(matches!(spec.chart, ChartKind::Pie(_)));
    }

    #[test]
    fn test_parse_missing_group() {
        let err = parse("source(raw) | bar()").unwrap_err();
        assert!(err.contains("group(by"));
    }

    #[test]
    fn test_parse_two_charts() {
        assert!(parse("group(by: sexo) | bar() | pie()").is_err());
    }

    #[test]
    fn test_parse_trailing_pipe() {
        assert!(parse("group(by: sexo) | bar() |").is_err());
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").is_err());
    }
}
