// Shared lexical parsers for the report DSL

use nom::{
    bytes::complete::take_while,
    character::complete::{char, multispace0, satisfy},
    combinator::{map, recognize},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Column or report name: letter or underscore, then letters, digits, underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string without escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        |s: &str| s.to_string(),
    )(input)
}

/// Bracketed list of string literals: ["a", "b"]
pub fn string_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), ws(string_literal)),
        ws(char(']')),
    )(input)
}
