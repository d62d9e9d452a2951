/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! This module defines a parser for the textual form of slice
//! expressions.
//! ```text
//! expression ::= item ( "," item )* ","?
//! item       ::= ellipsis
//!              | newaxis
//!              | range
//!              | integer
//!              | string
//!              | list
//! ellipsis   ::= "..."
//! newaxis    ::= "None" | "newaxis"
//! range      ::= integer? ":" integer? ( ":" integer? )?
//! integer    ::= "-"? [0-9]+
//! string     ::= '"' [^"]* '"' | "'" [^']* "'"
//! list       ::= "[" ( element ( "," element )* )? "]"
//! element    ::= integer | "True" | "False" | "None" | string | list
//! ```
//!
//! Notes:
//! - A single item without a trailing comma parses to that item; any
//!   comma makes a tuple.
//! - A string is a field name. A list whose elements are all strings
//!   is a list of field names; strings cannot be mixed with other
//!   elements or nested.
//! - Any other list is an array slice: booleans, integers and `None`,
//!   nested to any depth.
//! - Whitespace between tokens is ignored.

use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::bytes::complete::take_while;
use nom::character::complete::char;
use nom::character::complete::digit1;
use nom::character::complete::multispace0;
use nom::combinator::map;
use nom::combinator::map_res;
use nom::combinator::opt;
use nom::combinator::recognize;
use nom::combinator::value;
use nom::multi::separated_list0;
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::sequence::pair;
use nom::sequence::preceded;

use crate::slice::Range;
use crate::slice::Where;
use crate::value::Value;

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse).parse(input)
}

fn string(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        str::to_string,
    )
    .parse(input)
}

fn range(input: &str) -> IResult<&str, Where> {
    let (input, (start, stop, step)) = (
        opt(integer),
        preceded(ws(char(':')), opt(integer)),
        opt(preceded(ws(char(':')), opt(integer))),
    )
        .parse(input)?;

    Ok((
        input,
        Where::Range(Range::new(start, stop, step.flatten().unwrap_or(1))),
    ))
}

/// A list element: either a field name or a host value.
#[derive(Debug, Clone)]
enum Element {
    Name(String),
    Value(Value),
}

fn element(input: &str) -> IResult<&str, Element> {
    alt((
        map_res(list, |elements| match into_where(elements) {
            Ok(Where::Array(v)) => Ok(Element::Value(v)),
            _ => Err("field names cannot be nested"),
        }),
        map(string, Element::Name),
        value(Element::Value(Value::Bool(true)), tag("True")),
        value(Element::Value(Value::Bool(false)), tag("False")),
        value(Element::Value(Value::Null), tag("None")),
        map(integer, |i| Element::Value(Value::Int(i))),
    ))
    .parse(input)
}

fn list(input: &str) -> IResult<&str, Vec<Element>> {
    delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), ws(element)),
        ws(char(']')),
    )
    .parse(input)
}

/// Lists of names are field selections; anything else is an array.
fn into_where(elements: Vec<Element>) -> Result<Where, &'static str> {
    let names = elements
        .iter()
        .filter(|e| matches!(e, Element::Name(_)))
        .count();
    if names == 0 {
        return Ok(Where::Array(Value::List(
            elements
                .into_iter()
                .filter_map(|e| match e {
                    Element::Value(v) => Some(v),
                    Element::Name(_) => None,
                })
                .collect(),
        )));
    }
    if names != elements.len() {
        return Err("field names cannot be mixed with other values");
    }
    Ok(Where::Fields(
        elements
            .into_iter()
            .filter_map(|e| match e {
                Element::Name(n) => Some(n),
                Element::Value(_) => None,
            })
            .collect(),
    ))
}

fn item(input: &str) -> IResult<&str, Where> {
    alt((
        value(Where::Ellipsis, tag("...")),
        value(Where::NewAxis, alt((tag("None"), tag("newaxis")))),
        range,
        map(integer, Where::At),
        map(string, Where::Field),
        map_res(list, into_where),
    ))
    .parse(input)
}

pub fn expression(input: &str) -> IResult<&str, Where> {
    map(
        pair(
            separated_list1(ws(char(',')), ws(item)),
            opt(ws(char(','))),
        ),
        |(mut items, trailing)| {
            if items.len() == 1 && trailing.is_none() {
                items.remove(0)
            } else {
                Where::Tuple(items)
            }
        },
    )
    .parse(input)
}

/// Parses a slice expression from a string.
///
/// # Arguments
///
/// * `input` - A string slice containing the slice expression to
///   parse, e.g. `2, :, "x"` or `[[0, 1], [], [None]]`.
///
/// # Returns
///
/// * `Ok(Where)` if parsing succeeds
/// * `Err(anyhow::Error)` with a detailed error message if parsing
///   fails
pub fn parse(input: &str) -> anyhow::Result<Where> {
    use nom::combinator::all_consuming;

    let (_, expr) = all_consuming(expression)
        .parse(input)
        .map_err(|err| anyhow::anyhow!("Failed to parse slice: {err:?} (input: {input:?})"))?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::slice::Range;
    use crate::slice::SliceItem;
    use crate::slice::normalize;

    // Parse and normalize an input string.
    fn items(input: &str) -> Vec<SliceItem> {
        normalize(&super::parse(input).unwrap()).unwrap()
    }

    macro_rules! assert_parses_to {
        ($input:expr, $expected:expr) => {{
            assert_eq!(items($input), $expected, "input: {:?}", $input);
        }};
    }

    #[test]
    fn test_basic_items() {
        let r = |start, stop, step| SliceItem::Range(Range::new(start, stop, step));

        assert_parses_to!("3", vec![SliceItem::At(3)]);
        assert_parses_to!("-1", vec![SliceItem::At(-1)]);
        assert_parses_to!(":", vec![r(None, None, 1)]);
        assert_parses_to!("1:3", vec![r(Some(1), Some(3), 1)]);
        assert_parses_to!("::-1", vec![r(None, None, -1)]);
        assert_parses_to!("-3:", vec![r(Some(-3), None, 1)]);
        assert_parses_to!("1::", vec![r(Some(1), None, 1)]);
        assert_parses_to!("...", vec![SliceItem::Ellipsis]);
        assert_parses_to!("None", vec![SliceItem::NewAxis]);
        assert_parses_to!("newaxis", vec![SliceItem::NewAxis]);
        assert_parses_to!("3,", vec![SliceItem::At(3)]);
    }

    #[test]
    fn test_tuples() {
        assert_parses_to!(
            r#"2, :, "x""#,
            vec![
                SliceItem::At(2),
                SliceItem::Range(Range::full()),
                SliceItem::Field("x".to_string())
            ]
        );
        assert_parses_to!(
            "..., 0",
            vec![SliceItem::Ellipsis, SliceItem::At(0)]
        );
        assert_parses_to!(
            "'y', 1 : 2",
            vec![
                SliceItem::Field("y".to_string()),
                SliceItem::Range(Range::new(Some(1), Some(2), 1))
            ]
        );
    }

    #[test]
    fn test_lists() {
        assert_parses_to!(
            r#"["x", "y"]"#,
            vec![SliceItem::Fields(vec!["x".to_string(), "y".to_string()])]
        );
        assert_parses_to!(
            "[True, False]",
            vec![SliceItem::Bools(vec![true, false])]
        );
        assert_parses_to!("[]", vec![SliceItem::Indices(vec![])]);
        assert_parses_to!(
            "[[0, 1], [], [None]]",
            normalize(&crate::slice::Where::Array(
                serde_json::from_value(json!([[0, 1], [], [null]])).unwrap()
            ))
            .unwrap()
        );
    }

    #[test]
    fn test_errors() {
        assert!(super::parse("").is_err());
        assert!(super::parse("1 2").is_err());
        assert!(super::parse(r#"["x", 1]"#).is_err());
        assert!(super::parse(r#"[["x"]]"#).is_err());
        assert!(super::parse("[True").is_err());
        assert!(super::parse("(1, 2)").is_err());
    }
}
