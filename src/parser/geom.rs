// Geometry (chart kind) parser for the report DSL

use super::ast::{BarLayer, ChartKind, PieLayer};
use super::lexer::{string_list, string_literal, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::map,
    multi::separated_list0,
    sequence::preceded,
    IResult,
};

/// Parse a pie geometry
/// Format: pie() or pie(colors: ["dodgerblue", "hotpink"])
pub fn parse_pie(input: &str) -> IResult<&str, ChartKind> {
    let (input, _) = ws(tag("pie"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, args) = separated_list0(
        ws(char(',')),
        preceded(ws(tag("colors:")), string_list),
    )(input)?;

    let (input, _) = ws(char(')'))(input)?;

    let mut layer = PieLayer::default();
    for colors in args {
        layer.colors = colors;
    }

    Ok((input, ChartKind::Pie(layer)))
}

/// Parse a bar geometry
/// Format: bar() or bar(colors: ["red"]) or bar(palette: "viridis")
pub fn parse_bar(input: &str) -> IResult<&str, ChartKind> {
    let (input, _) = ws(tag("bar"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, args) = separated_list0(
        ws(char(',')),
        alt((
            map(
                preceded(ws(tag("colors:")), string_list),
                |c| ("colors", c, String::new()),
            ),
            map(
                preceded(ws(tag("palette:")), ws(string_literal)),
                |p| ("palette", Vec::new(), p),
            ),
        )),
    )(input)?;

    let (input, _) = ws(char(')'))(input)?;

    let mut layer = BarLayer::default();

    for (key, list_val, str_val) in args {
        match key {
            "colors" => layer.colors = list_val,
            "palette" => layer.palette = Some(str_val),
            _ => {}
        }
    }

    Ok((input, ChartKind::Bar(layer)))
}

/// Parse a table-only geometry
/// Format: table()
pub fn parse_table(input: &str) -> IResult<&str, ChartKind> {
    let (input, _) = ws(tag("table"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, ChartKind::Table))
}

/// Parse any geometry
pub fn parse_geom(input: &str) -> IResult<&str, ChartKind> {
    alt((parse_pie, parse_bar, parse_table))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pie_colors() {
        let (_, chart) = parse_pie(r#"pie(colors: ["dodgerblue", "hotpink"])"#).unwrap();
        match chart {
            ChartKind::Pie(p) => assert_eq!(p.colors, vec!["dodgerblue", "hotpink"]),
            _ => panic!("Expected Pie"),
        }
    }

    #[test]
    fn test_parse_bar_palette() {
        let (_, chart) = parse_bar(r#"bar(palette: "viridis")"#).unwrap();
        match chart {
            ChartKind::Bar(b) => {
                assert_eq!(b.palette, Some("viridis".to_string()));
                assert!(b.colors.is_empty());
            }
            _ => panic!("Expected Bar"),
        }
    }

    #[test]
    fn test_parse_bar_defaults() {
        let (_, chart) = parse_bar("bar()").unwrap();
        assert_eq!(chart, ChartKind::Bar(BarLayer::default()));
    }

    #[test]
    fn test_parse_geom_table() {
        let (rest, chart) = parse_geom(" table( ) ").unwrap();
        assert_eq!(chart, ChartKind::Table);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_geom_unknown() {
        assert!(parse_geom("line()").is_err());
    }
}
