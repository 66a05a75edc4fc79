// Data source and group-by parsers for the report DSL

use super::ast::DataSource;
use super::lexer::{identifier, string_literal, ws};
use crate::aggregate::{AggregateOp, GroupQuery, KeyOrder};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, value},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::preceded,
    IResult,
};

/// Parse a data source
/// Format: source(raw) or source(clean)
pub fn parse_source(input: &str) -> IResult<&str, DataSource> {
    let (input, _) = ws(tag("source"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, source) = ws(alt((
        value(DataSource::Raw, tag("raw")),
        value(DataSource::Clean, tag("clean")),
    )))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, source))
}

#[derive(Debug)]
enum GroupArg {
    By(String),
    Metric(String),
    Op(AggregateOp),
    Order(KeyOrder),
}

fn parse_op(input: &str) -> IResult<&str, AggregateOp> {
    alt((
        value(AggregateOp::Mean, tag("mean")),
        value(AggregateOp::Count, tag("count")),
    ))(input)
}

fn parse_order(input: &str) -> IResult<&str, KeyOrder> {
    let (rest, name) = string_literal(input)?;
    match name.as_str() {
        "first_seen" => Ok((rest, KeyOrder::FirstSeen)),
        "sorted" => Ok((rest, KeyOrder::Sorted)),
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    }
}

/// Parse a group-by query
/// Format: group(by: col, metric: col, op: mean, order: "sorted")
///
/// `op` defaults to `mean` when a metric is given and `count` otherwise.
pub fn parse_group(input: &str) -> IResult<&str, GroupQuery> {
    let (input, _) = ws(tag("group"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, args) = separated_list0(
        ws(char(',')),
        alt((
            map(preceded(ws(tag("by:")), ws(identifier)), GroupArg::By),
            map(preceded(ws(tag("metric:")), ws(identifier)), GroupArg::Metric),
            map(preceded(ws(tag("op:")), ws(parse_op)), GroupArg::Op),
            map(preceded(ws(tag("order:")), ws(parse_order)), GroupArg::Order),
        )),
    )(input)?;

    let (rest, _) = ws(char(')'))(input)?;

    let mut group_by = None;
    let mut metric = None;
    let mut op = None;
    let mut order = KeyOrder::default();

    for arg in args {
        match arg {
            GroupArg::By(col) => group_by = Some(col),
            GroupArg::Metric(col) => metric = Some(col),
            GroupArg::Op(o) => op = Some(o),
            GroupArg::Order(o) => order = o,
        }
    }

    let Some(group_by) = group_by else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    };

    let op = op.unwrap_or(if metric.is_some() {
        AggregateOp::Mean
    } else {
        AggregateOp::Count
    });

    Ok((
        rest,
        GroupQuery {
            group_by,
            metric,
            op,
            order,
        },
    ))
}
